//! Source-to-target type mapping.

use super::TranslateError;
use crate::bytecode::SourceType;
use crate::ir::IrType;

/// Map a source value type onto the target IR.
///
/// Total over the closed scalar/array kinds; arrays become pointers to the
/// mapped element type in global memory. Signedness of the sized integers
/// is carried by operations, not types. Managed reference types are
/// unrepresentable and fail.
pub fn map_type(ty: &SourceType) -> Result<IrType, TranslateError> {
    match ty {
        SourceType::Void => Ok(IrType::Void),
        SourceType::Bool => Ok(IrType::bool()),
        SourceType::I8 | SourceType::U8 => Ok(IrType::i8()),
        SourceType::I16 | SourceType::U16 => Ok(IrType::i16()),
        SourceType::I32 | SourceType::U32 => Ok(IrType::i32()),
        SourceType::I64 | SourceType::U64 => Ok(IrType::i64()),
        SourceType::F32 => Ok(IrType::f32()),
        SourceType::F64 => Ok(IrType::f64()),
        SourceType::Array(elem) => Ok(IrType::global_ptr(map_type(elem)?)),
        SourceType::Object(_) => Err(TranslateError::UnsupportedType { ty: ty.clone() }),
    }
}

/// Map an ordered parameter list.
pub fn map_types(types: &[SourceType]) -> Result<Vec<IrType>, TranslateError> {
    types.iter().map(map_type).collect()
}
