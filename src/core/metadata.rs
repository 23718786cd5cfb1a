use super::signature::FunctionSignature;

/// Opaque runtime class pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassHandle(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub class: ClassHandle,
    pub name: String
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub is_static: bool,
    pub signature: FunctionSignature,
    /// Native entry point published by the runtime; may be a forwarding stub.
    pub method_pointer: usize
}

/// Type information needed to locate hook targets.
pub trait Metadata {
    fn type_name(&self, class: ClassHandle) -> String;

    /// Types declared inside `class`, in declaration order.
    fn nested_types(&self, class: ClassHandle) -> Vec<TypeDef>;

    /// Every method declared by `class`, including static and non-public ones.
    fn methods(&self, class: ClassHandle) -> Vec<MethodDef>;
}
