use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry of the server's model registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    /// On-disk size in bytes, when the server reports it.
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

impl ModelDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            modified_at: None,
        }
    }

    /// Short line shown under the model name in the picker.
    pub fn summary(&self) -> String {
        match self.size {
            Some(bytes) => format!("Ollama model: {}  ({})", self.name, human_size(bytes)),
            None => format!("Ollama model: {}", self.name),
        }
    }
}

fn human_size(bytes: u64) -> String {
    const GB: f64 = 1_000_000_000.0;
    const MB: f64 = 1_000_000.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else {
        format!("{:.0} MB", b / MB)
    }
}

/// The two calls a chat needs from the inference server.
#[async_trait]
pub trait InferenceApi: Send + Sync {
    /// Models the server currently serves, in server order. An empty list
    /// is a valid answer, not an error.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>>;

    /// Full completion text for `prompt`.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_includes_size_when_known() {
        let mut m = ModelDescriptor::named("llama3");
        assert_eq!(m.summary(), "Ollama model: llama3");
        m.size = Some(4_661_224_676);
        assert_eq!(m.summary(), "Ollama model: llama3  (4.7 GB)");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let m: ModelDescriptor = serde_json::from_str(
            r#"{"name":"mistral","digest":"abc","details":{"family":"llama"}}"#,
        )
        .unwrap();
        assert_eq!(m, ModelDescriptor::named("mistral"));
    }
}
