//! The assembled compilation unit.

use rustc_hash::FxHashMap;

use super::instr::{FuncId, Function};
use super::types::IrType;

/// Marks a function as a device-executable entry point for the downstream
/// generator, mirroring an `nvvm.annotations` record: (function,
/// human-readable name, entry flag).
#[derive(Debug, Clone, PartialEq)]
pub struct KernelAnnotation {
    pub func: FuncId,
    pub name: String,
    pub flag: i32,
}

/// One compilation unit: target description, functions, and kernel-entry
/// annotations. Lives for the duration of a single compilation request and
/// is handed to the external code generator afterwards.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub target_triple: String,
    pub data_layout: String,
    functions: Vec<Function>,
    by_name: FxHashMap<String, FuncId>,
    pub annotations: Vec<KernelAnnotation>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            target_triple: String::new(),
            data_layout: String::new(),
            functions: Vec::new(),
            by_name: FxHashMap::default(),
            annotations: Vec::new(),
        }
    }

    /// Set the target triple and data layout.
    pub fn set_target(&mut self, triple: impl Into<String>, layout: impl Into<String>) {
        self.target_triple = triple.into();
        self.data_layout = layout.into();
    }

    /// Look up a function by name.
    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.by_name.get(name).copied()
    }

    /// Create a defined function and register it by name.
    pub fn create_function(
        &mut self,
        name: impl Into<String>,
        params: Vec<IrType>,
        ret: IrType,
    ) -> FuncId {
        let name = name.into();
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(Function::new(id, name.clone(), params, ret));
        self.by_name.insert(name, id);
        id
    }

    /// Declare a body-less external function, reusing an existing
    /// declaration of the same name.
    pub fn declare_function(
        &mut self,
        name: impl Into<String>,
        params: Vec<IrType>,
        ret: IrType,
    ) -> FuncId {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(Function::declaration(id, name.clone(), params, ret));
        self.by_name.insert(name, id);
        id
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Attach a kernel-entry annotation for `func`.
    pub fn add_kernel_annotation(&mut self, func: FuncId, name: impl Into<String>, flag: i32) {
        self.annotations.push(KernelAnnotation { func, name: name.into(), flag });
    }
}
