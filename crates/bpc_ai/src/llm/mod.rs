use bpc_core::error::AppError;

/// Generation collaborator. The gate never depends on a concrete vendor;
/// tests substitute a mock.
pub trait Llm {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError>;
}

pub mod openai;
