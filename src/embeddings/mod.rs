// Embedding generation module
// Delegates embedding computation to an external Ollama endpoint

pub mod ollama;

pub use ollama::OllamaClient;
