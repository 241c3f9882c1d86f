pub mod chain;
pub mod demo;
pub mod llm;
pub mod prompts;
pub mod retrieve;
pub mod telemetry;
