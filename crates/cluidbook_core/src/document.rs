//! Document field scraper/filler seam.
//!
//! The live document lives outside this crate; the core only collects a flat
//! field map from it and pushes one back. Field values are opaque.

use crate::model::record::FieldMap;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("document unavailable: {0}")]
pub struct DocumentError(pub String);

#[async_trait]
pub trait DocumentFields: Send + Sync {
    /// Collects every named field of the current document.
    async fn collect_fields(&self) -> Result<FieldMap, DocumentError>;
    /// Writes `fields` back into the current document.
    async fn fill_fields(&self, fields: &FieldMap) -> Result<(), DocumentError>;
}
