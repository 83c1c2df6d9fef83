//! Top-level engine: assembles a target module from entry methods.
//!
//! Picks the target triple and data layout from the configured pointer
//! width, translates every requested entry method (and, transitively,
//! everything it calls), and attaches a kernel-entry annotation per entry
//! so the downstream generator can tell kernels from helper functions.

use crate::bytecode::{MethodId, Program};
use crate::ir::Module;
use crate::translate::{TranslateError, Translator};

const TRIPLE_64: &str = "nvptx64-nvidia-cuda";
const TRIPLE_32: &str = "nvptx-nvidia-cuda";
const LAYOUT_64: &str = "e-p:64:64:64-i1:8:8-i8:8:8-i16:16:16-i32:32:32-i64:64:64-f32:32:32-f64:64:64-v16:16:16-v32:32:32-v64:64:64-v128:128:128-n16:32:64";
const LAYOUT_32: &str = "e-p:32:32:32-i1:8:8-i8:8:8-i16:16:16-i32:32:32-i64:64:64-f32:32:32-f64:64:64-v16:16:16-v32:32:32-v64:64:64-v128:128:128-n16:32:64";

/// Flag value of a kernel-entry annotation.
const KERNEL_FLAG: i32 = 1;

/// Pointer width of the device target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerWidth {
    Bits32,
    #[default]
    Bits64,
}

/// Configuration for the translation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Device pointer width; selects target triple and data layout
    pub pointer_width: PointerWidth,
    /// Name of the assembled module
    pub module_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { pointer_width: PointerWidth::Bits64, module_name: "kernels".to_string() }
    }
}

/// The translation engine. One call to [`Engine::translate`] processes one
/// compilation request to completion, synchronously, and returns the
/// finished module.
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Engine::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Translate the given entry methods of `program` into a module.
    ///
    /// Every entry becomes a kernel-annotated function; callees are pulled
    /// in on demand and shared between entries.
    pub fn translate(
        &self,
        program: &Program,
        entries: &[MethodId],
    ) -> Result<Module, TranslateError> {
        let mut module = Module::new(self.config.module_name.clone());
        match self.config.pointer_width {
            PointerWidth::Bits64 => module.set_target(TRIPLE_64, LAYOUT_64),
            PointerWidth::Bits32 => module.set_target(TRIPLE_32, LAYOUT_32),
        }

        let mut kernels = Vec::with_capacity(entries.len());
        {
            let mut translator = Translator::new(program, &mut module);
            for &entry in entries {
                let func = translator.emit_method(entry)?;
                kernels.push((func, program.method(entry).name.clone()));
            }
        }
        for (func, name) in kernels {
            module.add_kernel_annotation(func, name, KERNEL_FLAG);
        }
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Instruction, Method, Opcode, Operand, SourceType};

    fn ret_void_method(name: &str) -> Method {
        let mut m = Method::new(name, vec![], SourceType::Void);
        m.body = vec![Instruction::new(0, Opcode::Ret, Operand::None)];
        m.kernel = true;
        m
    }

    #[test]
    fn test_default_target_is_64_bit() {
        let mut program = Program::new();
        let id = program.add_method(ret_void_method("noop"));
        let module = Engine::new().translate(&program, &[id]).unwrap();
        assert_eq!(module.target_triple, "nvptx64-nvidia-cuda");
        assert!(module.data_layout.starts_with("e-p:64:64:64"));
    }

    #[test]
    fn test_32_bit_target() {
        let mut program = Program::new();
        let id = program.add_method(ret_void_method("noop"));
        let engine = Engine::with_config(EngineConfig {
            pointer_width: PointerWidth::Bits32,
            ..Default::default()
        });
        let module = engine.translate(&program, &[id]).unwrap();
        assert_eq!(module.target_triple, "nvptx-nvidia-cuda");
        assert!(module.data_layout.starts_with("e-p:32:32:32"));
    }

    #[test]
    fn test_entries_are_kernel_annotated() {
        let mut program = Program::new();
        let a = program.add_method(ret_void_method("a"));
        let b = program.add_method(ret_void_method("b"));
        let module = Engine::new().translate(&program, &[a, b]).unwrap();

        assert_eq!(module.annotations.len(), 2);
        assert_eq!(module.annotations[0].name, "a");
        assert_eq!(module.annotations[1].name, "b");
        for ann in &module.annotations {
            assert_eq!(ann.flag, 1);
            assert!(!module.function(ann.func).is_declaration);
        }
    }

    #[test]
    fn test_module_name_from_config() {
        let mut program = Program::new();
        let id = program.add_method(ret_void_method("noop"));
        let engine = Engine::with_config(EngineConfig {
            module_name: "warp".to_string(),
            ..Default::default()
        });
        let module = engine.translate(&program, &[id]).unwrap();
        assert_eq!(module.name, "warp");
    }
}
