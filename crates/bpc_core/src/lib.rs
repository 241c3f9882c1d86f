pub mod assemble;
pub mod domain;
pub mod error;
pub mod grounding;
pub mod lint;
pub mod pii;
pub mod policy;
