//! The end-to-end answer pipeline.
//!
//! A query flows through a straight-line sequence: embed the text, encode
//! the vector, search the index, resolve each hit to document text. The
//! service boundary is infallible: every failure is rendered into the
//! returned string because the invoker is an automated tool-calling
//! harness that expects a string result, not a fault.

use std::sync::Arc;

use tracing::{debug, warn};

use mimir_store::{DocumentResolver, VectorIndex, encode_vector};

use crate::embedder::TextEmbedder;
use crate::error::Result;

/// Returned when the index has no items to match against.
pub const NO_RESULTS_MESSAGE: &str = "No information found.";

/// Separator between documents when more than one result is returned.
const RESULT_SEPARATOR: &str = "\n---\n";

/// Answers natural-language queries against the document index.
///
/// Owns its dependencies for the process lifetime: one embedder, one index
/// handle, one resolver, all sharing the single database connection.
pub struct QueryService {
    embedder: Arc<dyn TextEmbedder>,
    index: VectorIndex,
    resolver: DocumentResolver,
    limit: usize,
}

impl QueryService {
    /// Create a service returning the single nearest document per query.
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        index: VectorIndex,
        resolver: DocumentResolver,
    ) -> Self {
        Self {
            embedder,
            index,
            resolver,
            limit: 1,
        }
    }

    /// Set how many nearest documents a query returns (clamped to >= 1).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Answer a query.
    ///
    /// Returns document text, [`NO_RESULTS_MESSAGE`], or an `"Error: ..."`
    /// description. Never panics or returns an error to the caller.
    pub async fn answer(&self, query: &str) -> String {
        match self.lookup(query).await {
            Ok(Some(text)) => text,
            Ok(None) => NO_RESULTS_MESSAGE.to_string(),
            Err(e) => {
                warn!("Query failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    /// The fallible pipeline behind [`answer`](Self::answer).
    ///
    /// `None` means the index matched nothing, which is a valid outcome
    /// rather than an error.
    async fn lookup(&self, query: &str) -> Result<Option<String>> {
        let embedding = self.embedder.embed(query).await?;
        let encoded = encode_vector(&embedding);

        let hits = self.index.search(&encoded, self.limit)?;
        if hits.is_empty() {
            return Ok(None);
        }
        debug!(
            "Query matched {} item(s), nearest at distance {:.4}",
            hits.len(),
            hits[0].distance
        );

        let mut texts = Vec::with_capacity(hits.len());
        for hit in &hits {
            texts.push(self.resolver.resolve(&hit.file_id)?);
        }
        Ok(Some(texts.join(RESULT_SEPARATOR)))
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("limit", &self.limit)
            .finish()
    }
}
