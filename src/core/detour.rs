use std::sync::Arc;

use super::{
    memory::CodeMemory,
    metadata::{ClassHandle, Metadata, MethodDef, TypeDef},
    resolver::{MethodResolver, Resolution, ResolverConfig},
    Error, Interceptor
};

/// One installed hook. The trampoline stays valid until [`DetourHandle::dispose`] is called.
pub struct DetourHandle {
    method: String,
    resolution: Resolution,
    hook_addr: usize,
    trampoline_addr: usize,
    interceptor: Arc<Interceptor>,
    disposed: bool
}

impl DetourHandle {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn target(&self) -> usize {
        self.resolution.address
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn hook_addr(&self) -> usize {
        self.hook_addr
    }

    /// Entry point that runs the original, un-hooked code. Zero once disposed.
    pub fn trampoline_addr(&self) -> usize {
        if self.disposed { 0 } else { self.trampoline_addr }
    }

    /// Trampoline as a function pointer of the target's signature.
    ///
    /// # Safety
    /// `F` must be an `extern "C"` function pointer type matching the hooked method, and the
    /// result must not be called after the handle is disposed.
    pub unsafe fn original<F: Copy>(&self) -> Option<F> {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
        let addr = self.trampoline_addr();
        if addr == 0 {
            return None;
        }
        Some(std::mem::transmute_copy(&addr))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Restores the original code. Returns whether this call removed the hook; once disposed,
    /// later calls do nothing. If the code can't be restored the handle stays live and the
    /// trampoline remains valid, so disposing can be retried.
    pub fn dispose(&mut self) -> Result<bool, Error> {
        if self.disposed {
            return Ok(false);
        }

        let removed = self.interceptor.unhook(self.resolution.address)?.is_some();
        self.disposed = true;
        if removed {
            info!("Removed hook on {} ({:#x})", self.method, self.resolution.address);
        }
        Ok(removed)
    }
}

/// Finds methods through runtime metadata, resolves their real entry point and hooks them.
pub struct NativeDetour<'a, M: Metadata, C: CodeMemory> {
    metadata: &'a M,
    resolver: MethodResolver<'a, C>,
    interceptor: &'a Arc<Interceptor>
}

impl<'a, M: Metadata, C: CodeMemory> NativeDetour<'a, M, C> {
    pub fn new(metadata: &'a M, memory: &'a C, interceptor: &'a Arc<Interceptor>, config: ResolverConfig) -> Self {
        NativeDetour {
            metadata,
            resolver: MethodResolver::with_config(memory, config),
            interceptor
        }
    }

    /// Hooks the method literally named `method_name` on `class`.
    pub fn create(&self, class: ClassHandle, method_name: &str, hook_addr: usize) -> Result<DetourHandle, Error> {
        let method = self.find_method(class, method_name)?;
        self.install(class, &method, hook_addr)
    }

    /// Hooks `method_name` on the first nested type of `class` whose name contains
    /// `nested_name` and which declares such a method.
    pub fn create_nested(&self, class: ClassHandle, nested_name: &str, method_name: &str, hook_addr: usize) -> Result<DetourHandle, Error> {
        let nested = self.find_nested_type(class, nested_name, method_name)?;
        let method = self.find_method(nested.class, method_name)?;
        self.install(nested.class, &method, hook_addr)
    }

    /// Hooks the single method selected by a nested type predicate and a method predicate.
    pub fn create_by_signature(
        &self,
        class: ClassHandle,
        nested_predicate: impl Fn(&TypeDef) -> bool,
        method_predicate: impl Fn(&MethodDef) -> bool,
        hook_addr: usize
    ) -> Result<DetourHandle, Error> {
        let (nested, method) = self.find_by_signature(class, nested_predicate, method_predicate)?;
        self.install(nested.class, &method, hook_addr)
    }

    pub fn find_method(&self, class: ClassHandle, method_name: &str) -> Result<MethodDef, Error> {
        let mut candidates: Vec<MethodDef> = self.metadata.methods(class)
            .into_iter()
            .filter(|m| m.name == method_name)
            .collect();

        match candidates.len() {
            0 => Err(Error::TargetNotFound(self.describe(class, method_name))),
            1 => Ok(candidates.remove(0)),
            n => Err(Error::AmbiguousTarget(self.describe(class, method_name), n))
        }
    }

    pub fn find_nested_type(&self, class: ClassHandle, nested_name: &str, method_name: &str) -> Result<TypeDef, Error> {
        self.metadata.nested_types(class)
            .into_iter()
            .find(|t| {
                t.name.contains(nested_name) &&
                self.metadata.methods(t.class).iter().any(|m| m.name == method_name)
            })
            .ok_or_else(|| Error::TargetNotFound(format!(
                "{}+*{}*::{}", self.metadata.type_name(class), nested_name, method_name
            )))
    }

    /// Every (nested type, method) pair satisfying both predicates is collected; anything
    /// other than exactly one pair is an error.
    pub fn find_by_signature(
        &self,
        class: ClassHandle,
        nested_predicate: impl Fn(&TypeDef) -> bool,
        method_predicate: impl Fn(&MethodDef) -> bool
    ) -> Result<(TypeDef, MethodDef), Error> {
        let nested_types: Vec<TypeDef> = self.metadata.nested_types(class)
            .into_iter()
            .filter(|t| nested_predicate(t))
            .collect();

        let class_name = self.metadata.type_name(class);
        if nested_types.is_empty() {
            return Err(Error::TargetNotFound(format!("{}+<nested type predicate>", class_name)));
        }

        let mut matches = Vec::new();
        for nested in nested_types.iter() {
            for method in self.metadata.methods(nested.class) {
                if method_predicate(&method) {
                    matches.push((nested.clone(), method));
                }
            }
        }

        match matches.len() {
            0 => {
                let searched: Vec<&str> = nested_types.iter().map(|t| t.name.as_str()).collect();
                Err(Error::SignatureMismatch(format!("{}+{{{}}}", class_name, searched.join(", "))))
            }
            1 => Ok(matches.remove(0)),
            n => {
                for (nested, method) in matches.iter() {
                    warn!("Candidate: {}+{}::{}{}", class_name, nested.name, method.name, method.signature);
                }
                Err(Error::AmbiguousTarget(format!("{}+<nested type predicate>", class_name), n))
            }
        }
    }

    fn install(&self, class: ClassHandle, method: &MethodDef, hook_addr: usize) -> Result<DetourHandle, Error> {
        let name = self.describe(class, &method.name);
        let resolution = self.resolver.resolve(method.method_pointer)?;
        let trampoline_addr = self.interceptor.hook(resolution.address, hook_addr)?;

        info!("Hooked {} at {:#x}", name, resolution.address);
        Ok(DetourHandle {
            method: name,
            resolution,
            hook_addr,
            trampoline_addr,
            interceptor: self.interceptor.clone(),
            disposed: false
        })
    }

    fn describe(&self, class: ClassHandle, method_name: &str) -> String {
        format!("{}::{}", self.metadata.type_name(class), method_name)
    }
}

#[cfg(test)]
mod tests {
    use iced_x86::Register;

    use crate::core::{
        signature::{FunctionSignature, ParamType},
        testing::{FakeBackend, FakeMemory, FakeMetadata}
    };

    use super::*;

    const BODY: usize = 0x1000_0000;
    const STUB: usize = 0x1000_0100;
    const OTHER: usize = 0x1000_0200;
    const EXECUTE: usize = 0x1000_0300;

    type AddFn = extern "C" fn(i32) -> i32;

    extern "C" fn add_one(x: i32) -> i32 { x + 1 }
    extern "C" fn add_two(x: i32) -> i32 { x + 2 }
    extern "C" fn times_ten(x: i32) -> i32 { x * 10 }
    extern "C" fn times_hundred(x: i32) -> i32 { x * 100 }

    struct Fixture {
        metadata: FakeMetadata,
        memory: FakeMemory,
        backend: FakeBackend,
        interceptor: Arc<Interceptor>,
        system: ClassHandle
    }

    fn config() -> ResolverConfig {
        ResolverConfig {
            bitness: 64,
            this_register: Register::RCX,
            ..Default::default()
        }
    }

    fn execute_signature() -> FunctionSignature {
        FunctionSignature::new([ParamType::by_ref("CollisionWorld"), ParamType::by_ref("System.Int32")])
    }

    fn fixture() -> Fixture {
        let mut memory = FakeMemory::default();
        memory.insert(BODY, &[0x48, 0x83, 0xEC, 0x28, 0xC3]);
        memory.insert(STUB, &FakeMemory::mov_rax_jmp(BODY as u64));
        memory.insert(OTHER, &[0x55, 0xC3]);
        memory.insert(EXECUTE, &[0x53, 0xC3]);

        let backend = FakeBackend::default();
        backend.define(BODY, add_one as usize);
        backend.define(OTHER, add_two as usize);
        backend.define(EXECUTE, add_one as usize);

        let mut metadata = FakeMetadata::default();
        let system = metadata.add_class("TopdownCameraSystem");
        metadata.add_method(system, "HandleInput", FunctionSignature::new([ParamType::by_ref("InputState")]), STUB);
        metadata.add_method(system, "OnUpdate", FunctionSignature::default(), OTHER);

        let job = metadata.add_nested(system, "<>c__DisplayClass_CameraUpdateJob");
        metadata.add_method(job, "UpdateCamera", FunctionSignature::default(), OTHER);

        let lambda_0 = metadata.add_nested(system, "LambdaJob_0_Job");
        metadata.add_method(lambda_0, "Execute", execute_signature(), EXECUTE);
        metadata.add_method_ex(lambda_0, "Execute", true, FunctionSignature::default(), OTHER);

        let lambda_1 = metadata.add_nested(system, "LambdaJob_1_Job");
        metadata.add_method(lambda_1, "OriginalLambdaBody", FunctionSignature::default(), OTHER);

        Fixture {
            metadata,
            memory,
            backend: backend.clone(),
            interceptor: Arc::new(Interceptor::with_backend(backend)),
            system
        }
    }

    impl Fixture {
        fn detour(&self) -> NativeDetour<'_, FakeMetadata, FakeMemory> {
            NativeDetour::new(&self.metadata, &self.memory, &self.interceptor, config())
        }
    }

    fn is_execute(m: &MethodDef) -> bool {
        !m.is_static &&
        (m.name == "Execute" || m.name.ends_with("_Execute")) &&
        execute_signature().matches(m)
    }

    #[test]
    fn exact_member_hooks_resolved_body() {
        let f = fixture();
        let mut handle = f.detour().create(f.system, "HandleInput", times_ten as usize).expect("hook");

        assert_eq!(handle.target(), BODY);
        assert!(handle.resolution().is_forwarded());
        assert_eq!(handle.method(), "TopdownCameraSystem::HandleInput");

        // Calls through the stub land on the body, which is now the replacement
        assert_eq!(f.backend.call(BODY, 3), 30);
        let original: AddFn = unsafe { handle.original() }.expect("live trampoline");
        assert_eq!(original(3), 4);

        // Unrelated functions keep running their own code
        assert_eq!(f.backend.call(OTHER, 3), 5);

        assert!(handle.dispose().expect("dispose"));
        assert_eq!(f.backend.call(BODY, 3), 4);
    }

    #[test]
    fn dispose_twice_is_noop() {
        let f = fixture();
        let mut handle = f.detour().create(f.system, "HandleInput", times_ten as usize).expect("hook");

        assert!(handle.dispose().expect("dispose"));
        assert!(!handle.dispose().expect("dispose"));
        assert!(handle.is_disposed());
        assert_eq!(handle.trampoline_addr(), 0);
        assert!(unsafe { handle.original::<AddFn>() }.is_none());
        assert_eq!(f.backend.call(BODY, 5), 6);
        assert_eq!(f.interceptor.hook_count(), 0);
    }

    #[test]
    fn failed_dispose_keeps_hook_callable() {
        let f = fixture();
        let mut handle = f.detour().create(f.system, "HandleInput", times_ten as usize).expect("hook");

        f.backend.refuse_unhook(true);
        assert!(matches!(handle.dispose(), Err(Error::HookingError(_))));
        assert!(!handle.is_disposed());
        assert_eq!(f.backend.call(BODY, 3), 30);
        assert_eq!(f.interceptor.get_trampoline_addr(times_ten as usize), handle.trampoline_addr());
        let original: AddFn = unsafe { handle.original() }.expect("live trampoline");
        assert_eq!(original(3), 4);

        f.backend.refuse_unhook(false);
        assert!(handle.dispose().expect("dispose"));
        assert!(handle.is_disposed());
        assert_eq!(f.backend.call(BODY, 3), 4);
    }

    #[test]
    fn missing_member_installs_nothing() {
        let f = fixture();
        let res = f.detour().create(f.system, "HandleGamepadInput", times_ten as usize);

        assert!(matches!(res, Err(Error::TargetNotFound(_))));
        assert_eq!(f.backend.patch_count(), 0);
        assert_eq!(f.backend.call(BODY, 1), 2);
    }

    #[test]
    fn nested_substring_finds_declaring_type() {
        let f = fixture();
        let handle = f.detour()
            .create_nested(f.system, "CameraUpdateJob", "UpdateCamera", times_ten as usize)
            .expect("hook");

        assert_eq!(handle.target(), OTHER);
        assert!(!handle.resolution().is_forwarded());
        assert_eq!(handle.method(), "<>c__DisplayClass_CameraUpdateJob::UpdateCamera");
        assert_eq!(f.backend.call(OTHER, 2), 20);
    }

    #[test]
    fn nested_substring_requires_member() {
        let f = fixture();
        let res = f.detour().create_nested(f.system, "LambdaJob_1", "Execute", times_ten as usize);

        assert!(matches!(res, Err(Error::TargetNotFound(_))));
        assert_eq!(f.backend.patch_count(), 0);
    }

    #[test]
    fn nested_substring_skips_types_without_member() {
        let f = fixture();
        // Both LambdaJob types contain the substring, only LambdaJob_1 declares the method
        let handle = f.detour()
            .create_nested(f.system, "LambdaJob", "OriginalLambdaBody", times_ten as usize)
            .expect("hook");

        assert_eq!(handle.method(), "LambdaJob_1_Job::OriginalLambdaBody");
    }

    #[test]
    fn signature_predicates_select_instance_execute() {
        let f = fixture();
        let handle = f.detour()
            .create_by_signature(f.system, |t| t.name.contains("LambdaJob"), is_execute, times_hundred as usize)
            .expect("hook");

        assert_eq!(handle.target(), EXECUTE);
        assert_eq!(f.backend.call(EXECUTE, 2), 200);
    }

    #[test]
    fn signature_predicates_report_missing_nested_type() {
        let f = fixture();
        let res = f.detour().create_by_signature(f.system, |t| t.name.contains("SystemBase"), is_execute, times_ten as usize);

        assert!(matches!(res, Err(Error::TargetNotFound(_))));
    }

    #[test]
    fn signature_predicates_report_mismatch() {
        let f = fixture();
        let wrong = FunctionSignature::new([ParamType::by_value("System.Single")]);
        let res = f.detour().create_by_signature(
            f.system,
            |t| t.name.contains("LambdaJob"),
            |m| m.name == "Execute" && wrong.matches(m),
            times_ten as usize
        );

        assert!(matches!(res, Err(Error::SignatureMismatch(_))));
        assert_eq!(f.backend.patch_count(), 0);
    }

    #[test]
    fn signature_predicates_refuse_multiple_matches() {
        let f = fixture();
        let res = f.detour().create_by_signature(f.system, |_| true, |_| true, times_ten as usize);

        assert!(matches!(res, Err(Error::AmbiguousTarget(_, n)) if n > 1));
        assert_eq!(f.backend.patch_count(), 0);
    }

    #[test]
    fn overloaded_exact_member_is_ambiguous() {
        let mut f = fixture();
        f.metadata.add_method(f.system, "OnUpdate", FunctionSignature::new([ParamType::by_value("System.Single")]), BODY);

        let res = f.detour().create(f.system, "OnUpdate", times_ten as usize);
        assert!(matches!(res, Err(Error::AmbiguousTarget(_, 2))));
    }

    #[test]
    fn null_method_pointer_is_invalid() {
        let mut f = fixture();
        f.metadata.add_method(f.system, "Abstract", FunctionSignature::default(), 0);

        let res = f.detour().create(f.system, "Abstract", times_ten as usize);
        assert!(matches!(res, Err(Error::InvalidAddress(0))));
    }

    #[test]
    fn backend_refusal_is_reported() {
        let mut f = fixture();
        let unmapped = 0x1000_0400;
        f.memory.insert(unmapped, &[0xC3]);
        f.metadata.add_method(f.system, "NotExecutable", FunctionSignature::default(), unmapped);

        let res = f.detour().create(f.system, "NotExecutable", times_ten as usize);
        assert!(matches!(res, Err(Error::HookingError(_))));
    }

    #[test]
    fn second_hook_on_same_body_is_rejected() {
        let f = fixture();
        let detour = f.detour();

        // OnUpdate and UpdateCamera share one body
        let _first = detour
            .create_nested(f.system, "CameraUpdateJob", "UpdateCamera", times_ten as usize)
            .expect("hook");
        let res = detour.create(f.system, "OnUpdate", times_hundred as usize);

        assert!(matches!(res, Err(Error::AlreadyHooked(OTHER))));
        assert_eq!(f.backend.call(OTHER, 1), 10);
        assert_eq!(f.backend.patch_count(), 1);
    }
}
