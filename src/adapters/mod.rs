pub mod llm;
pub mod ollama;

pub use ollama::OllamaClient;
