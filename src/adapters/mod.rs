//! Adapter interfaces for external systems.
//!
//! The only external collaborator is the model server, which scores
//! submitted text and serves a library of precomputed predictions.

pub mod model_server;

use async_trait::async_trait;

use crate::domain::PredictionError;
use crate::library::Book;

// Re-export the HTTP adapter
pub use model_server::ModelServerClient;

/// Raw prediction body as returned by a service, not yet parsed
pub type PredictionBody = serde_json::Value;

/// Source of predictions
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Human-readable service name
    fn name(&self) -> &str;

    /// Score a text
    async fn predict(&self, text: &str) -> Result<PredictionBody, PredictionError>;

    /// List the precomputed library
    async fn library_index(&self) -> Result<Vec<Book>, PredictionError>;

    /// Fetch one precomputed prediction by book id
    async fn precomputed(&self, id: &str) -> Result<PredictionBody, PredictionError>;
}
