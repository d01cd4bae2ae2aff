//! Rendered configuration documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One rendered configuration object (a Kubernetes manifest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn api_version(&self) -> Option<&str> {
        self.get("apiVersion").and_then(Value::as_str)
    }

    pub fn kind(&self) -> Option<&str> {
        self.get("kind").and_then(Value::as_str)
    }

    /// `metadata.name`.
    pub fn name(&self) -> Option<&str> {
        self.metadata("name")
    }

    /// `metadata.namespace`.
    pub fn namespace(&self) -> Option<&str> {
        self.metadata("namespace")
    }

    fn metadata(&self, field: &str) -> Option<&str> {
        self.get("metadata")
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
    }
}

/// Decode a multi-document YAML stream.
///
/// Empty documents (e.g. a trailing `---`) are skipped; a document that is
/// not a mapping is an error.
pub fn decode_documents(input: &str) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::new();

    for (index, de) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let value = Value::deserialize(de)?;
        if value.is_null() {
            continue;
        }
        let document = Document::from_json(value)
            .ok_or_else(|| anyhow::anyhow!("Document {} is not a mapping", index + 1))?;
        documents.push(document);
    }

    Ok(documents)
}

/// Encode documents as a YAML stream separated by `---`.
pub fn encode_documents(documents: &[Document]) -> anyhow::Result<String> {
    let mut out = String::new();

    for document in documents {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(document)?);
    }

    Ok(out)
}
