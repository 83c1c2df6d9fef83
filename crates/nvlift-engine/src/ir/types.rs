//! Target IR type system.

/// Address space of global/device memory; flat arrays are passed to
/// kernels as pointers into it.
pub const GLOBAL_ADDR_SPACE: u32 = 1;

/// Address space of function-local stack slots.
pub const STACK_ADDR_SPACE: u32 = 0;

/// A target IR type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    /// Integer of the given bit width; signedness is a property of
    /// operations, not of the type
    Int(u32),
    /// Binary float of the given bit width (32 or 64)
    Float(u32),
    Ptr {
        pointee: Box<IrType>,
        address_space: u32,
    },
}

impl IrType {
    pub fn bool() -> Self {
        IrType::Int(1)
    }

    pub fn i8() -> Self {
        IrType::Int(8)
    }

    pub fn i16() -> Self {
        IrType::Int(16)
    }

    pub fn i32() -> Self {
        IrType::Int(32)
    }

    pub fn i64() -> Self {
        IrType::Int(64)
    }

    pub fn f32() -> Self {
        IrType::Float(32)
    }

    pub fn f64() -> Self {
        IrType::Float(64)
    }

    /// Pointer to `pointee` in the given address space.
    pub fn ptr(pointee: IrType, address_space: u32) -> Self {
        IrType::Ptr { pointee: Box::new(pointee), address_space }
    }

    /// Pointer into global/device memory.
    pub fn global_ptr(pointee: IrType) -> Self {
        IrType::ptr(pointee, GLOBAL_ADDR_SPACE)
    }

    /// Pointer to a function-local stack slot.
    pub fn stack_ptr(pointee: IrType) -> Self {
        IrType::ptr(pointee, STACK_ADDR_SPACE)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, IrType::Int(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, IrType::Int(1))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IrType::Float(_))
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, IrType::Ptr { .. })
    }

    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    /// Element type behind a pointer, if this is one.
    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Ptr { pointee, .. } => Some(pointee),
            _ => None,
        }
    }
}

impl std::fmt::Display for IrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(bits) => write!(f, "i{}", bits),
            IrType::Float(32) => write!(f, "float"),
            IrType::Float(64) => write!(f, "double"),
            IrType::Float(bits) => write!(f, "f{}", bits),
            IrType::Ptr { pointee, address_space: 0 } => write!(f, "{}*", pointee),
            IrType::Ptr { pointee, address_space } => {
                write!(f, "{} addrspace({})*", pointee, address_space)
            }
        }
    }
}
