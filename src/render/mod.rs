//! Rendering collaborators.
//!
//! - [`Document`] - one rendered configuration object
//! - [`Renderer`] / [`KustomizeRenderer`] - directory in, documents out
//! - [`ManifestPipeline`] - cache-aware fetch + render

pub mod document;
pub mod kustomize;
pub mod pipeline;

pub use document::{decode_documents, encode_documents, Document};
pub use kustomize::{KustomizeRenderer, Renderer};
pub use pipeline::ManifestPipeline;
