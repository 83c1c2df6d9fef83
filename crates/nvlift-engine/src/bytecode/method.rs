//! Method descriptors and the program-wide method table.

use super::instr::Instruction;
use super::types::SourceType;

/// Identity of a method within a [`Program`].
///
/// Call operands reference methods by this id; it is also the memoization
/// key guaranteeing each callee is translated at most once per module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub u32);

impl std::fmt::Display for MethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// A decompiled method: descriptor plus instruction stream.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    /// Ordered parameter types
    pub params: Vec<SourceType>,
    pub ret: SourceType,
    /// Number of local variable slots in the body
    pub local_count: usize,
    /// Ordered, offset-addressed instruction records
    pub body: Vec<Instruction>,
    /// Intrinsic identifier when the method is builtin-tagged; such a
    /// method has no translatable body and resolves to a declaration
    pub intrinsic: Option<String>,
    /// Whether the method is tagged as a kernel entry point
    pub kernel: bool,
}

impl Method {
    pub fn new(name: impl Into<String>, params: Vec<SourceType>, ret: SourceType) -> Self {
        Method {
            name: name.into(),
            params,
            ret,
            local_count: 0,
            body: Vec::new(),
            intrinsic: None,
            kernel: false,
        }
    }

    /// A builtin-tagged method resolving to the named target intrinsic.
    pub fn builtin(
        name: impl Into<String>,
        intrinsic: impl Into<String>,
        params: Vec<SourceType>,
        ret: SourceType,
    ) -> Self {
        Method {
            name: name.into(),
            params,
            ret,
            local_count: 0,
            body: Vec::new(),
            intrinsic: Some(intrinsic.into()),
            kernel: false,
        }
    }

    /// Intrinsic identifier, when builtin-tagged.
    pub fn intrinsic_name(&self) -> Option<&str> {
        self.intrinsic.as_deref()
    }

    pub fn is_intrinsic(&self) -> bool {
        self.intrinsic.is_some()
    }

    pub fn is_kernel(&self) -> bool {
        self.kernel
    }
}

/// The method table for one compilation request.
#[derive(Debug, Clone, Default)]
pub struct Program {
    methods: Vec<Method>,
}

impl Program {
    pub fn new() -> Self {
        Program { methods: Vec::new() }
    }

    /// Register a method and return its id.
    pub fn add_method(&mut self, method: Method) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(method);
        id
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0 as usize]
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Ids of all kernel-tagged methods, in registration order.
    pub fn kernel_methods(&self) -> Vec<MethodId> {
        self.methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.kernel)
            .map(|(i, _)| MethodId(i as u32))
            .collect()
    }
}
