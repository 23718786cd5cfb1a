//! Stand-ins for process memory, runtime metadata and the hook primitive.

use std::sync::{Arc, Mutex};

use fnv::FnvHashMap;

use super::{
    interceptor::HookBackend,
    memory::CodeMemory,
    metadata::{ClassHandle, Metadata, MethodDef, TypeDef},
    signature::FunctionSignature,
    Error
};

/// Code bytes placed at arbitrary addresses.
#[derive(Default)]
pub struct FakeMemory {
    regions: Vec<(usize, Vec<u8>)>
}

impl FakeMemory {
    pub fn insert(&mut self, addr: usize, bytes: &[u8]) {
        self.regions.push((addr, bytes.to_vec()));
    }

    /// mov rax, imm64; jmp rax
    pub fn mov_rax_jmp(target: u64) -> Vec<u8> {
        let mut code = vec![0x48, 0xB8];
        code.extend_from_slice(&target.to_le_bytes());
        code.extend_from_slice(&[0xFF, 0xE0]);
        code
    }

    /// push imm32; ret
    pub fn push_ret(target: u32) -> Vec<u8> {
        let mut code = vec![0x68];
        code.extend_from_slice(&target.to_le_bytes());
        code.push(0xC3);
        code
    }

    /// jmp rel32, encoded at `from`
    pub fn jmp_rel32(from: usize, to: usize) -> Vec<u8> {
        let rel = (to as i64 - (from as i64 + 5)) as i32;
        let mut code = vec![0xE9];
        code.extend_from_slice(&rel.to_le_bytes());
        code
    }
}

impl CodeMemory for FakeMemory {
    fn read(&self, addr: usize, max_len: usize) -> Option<&[u8]> {
        self.regions.iter()
            .find(|(base, bytes)| addr >= *base && addr < *base + bytes.len())
            .map(|(base, bytes)| {
                let start = addr - base;
                let end = bytes.len().min(start + max_len);
                &bytes[start..end]
            })
    }
}

#[derive(Default)]
struct FakeClass {
    name: String,
    nested: Vec<ClassHandle>,
    methods: Vec<MethodDef>
}

/// Class tree with methods, addressed by sequential handles.
#[derive(Default)]
pub struct FakeMetadata {
    classes: Vec<FakeClass>
}

impl FakeMetadata {
    pub fn add_class(&mut self, name: &str) -> ClassHandle {
        self.classes.push(FakeClass { name: name.to_owned(), ..Default::default() });
        ClassHandle(self.classes.len())
    }

    pub fn add_nested(&mut self, parent: ClassHandle, name: &str) -> ClassHandle {
        let class = self.add_class(name);
        self.classes[parent.0 - 1].nested.push(class);
        class
    }

    pub fn add_method(&mut self, class: ClassHandle, name: &str, signature: FunctionSignature, method_pointer: usize) {
        self.add_method_ex(class, name, false, signature, method_pointer);
    }

    pub fn add_method_ex(&mut self, class: ClassHandle, name: &str, is_static: bool, signature: FunctionSignature, method_pointer: usize) {
        self.classes[class.0 - 1].methods.push(MethodDef {
            name: name.to_owned(),
            is_static,
            signature,
            method_pointer
        });
    }
}

impl Metadata for FakeMetadata {
    fn type_name(&self, class: ClassHandle) -> String {
        self.classes[class.0 - 1].name.clone()
    }

    fn nested_types(&self, class: ClassHandle) -> Vec<TypeDef> {
        self.classes[class.0 - 1].nested.iter()
            .map(|&nested| TypeDef {
                class: nested,
                name: self.type_name(nested)
            })
            .collect()
    }

    fn methods(&self, class: ClassHandle) -> Vec<MethodDef> {
        self.classes[class.0 - 1].methods.clone()
    }
}

#[derive(Default)]
struct FunctionTable {
    entries: FnvHashMap<usize, usize>,
    saved: FnvHashMap<usize, usize>,
    patches: usize,
    refuse_unhook: bool
}

/// Dispatch table standing in for patched code: "hooking" an address swaps the function the
/// address dispatches to, and the trampoline is the previous function.
#[derive(Default, Clone)]
pub struct FakeBackend {
    table: Arc<Mutex<FunctionTable>>
}

impl FakeBackend {
    pub fn define(&self, addr: usize, function: usize) {
        self.table.lock().unwrap().entries.insert(addr, function);
    }

    pub fn current(&self, addr: usize) -> Option<usize> {
        self.table.lock().unwrap().entries.get(&addr).copied()
    }

    pub fn patch_count(&self) -> usize {
        self.table.lock().unwrap().patches
    }

    /// Makes every following `unhook` fail and leave the table patched.
    pub fn refuse_unhook(&self, refuse: bool) {
        self.table.lock().unwrap().refuse_unhook = refuse;
    }

    /// Calls whatever `addr` currently dispatches to.
    pub fn call(&self, addr: usize, arg: i32) -> i32 {
        let function = self.current(addr).expect("defined address");
        let function: extern "C" fn(i32) -> i32 = unsafe { std::mem::transmute(function) };
        function(arg)
    }
}

impl HookBackend for FakeBackend {
    unsafe fn hook(&self, orig_addr: usize, hook_addr: usize) -> Result<usize, Error> {
        let mut table = self.table.lock().unwrap();
        let Some(original) = table.entries.get(&orig_addr).copied() else {
            return Err(Error::HookingError(format!("{:#x} is not executable", orig_addr)));
        };

        table.entries.insert(orig_addr, hook_addr);
        table.saved.insert(orig_addr, original);
        table.patches += 1;
        Ok(original)
    }

    unsafe fn unhook(&self, orig_addr: usize) -> Result<(), Error> {
        let mut table = self.table.lock().unwrap();
        if table.refuse_unhook {
            return Err(Error::HookingError(format!("{:#x} could not be restored", orig_addr)));
        }
        let Some(original) = table.saved.remove(&orig_addr) else {
            return Err(Error::HookingError(format!("{:#x} is not hooked", orig_addr)));
        };

        table.entries.insert(orig_addr, original);
        Ok(())
    }
}
