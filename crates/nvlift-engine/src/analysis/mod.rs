//! Instruction-stream analysis.

pub mod cfg;

pub use cfg::{find_branch_targets, CfgError};
