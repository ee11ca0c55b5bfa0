pub mod inference;
pub mod ollama;

pub use inference::{InferenceApi, ModelDescriptor};
pub use ollama::{probe, GenerateAccumulator, OllamaClient};
