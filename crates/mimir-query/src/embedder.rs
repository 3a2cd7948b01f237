//! Text embedding client.
//!
//! This module provides the `TextEmbedder` abstraction and its OpenAI
//! implementation. The HTTP client is built once at construction and held
//! for the process lifetime; callers share one embedder instance behind an
//! `Arc` rather than reconnecting per call.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;

use crate::error::{QueryError, Result};

/// Default OpenAI API base URL.
const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// Default embedding model.
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Default output dimensionality requested from the model.
const DEFAULT_DIMENSIONS: usize = 512;

/// Default timeout for embedding requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Converts text into fixed-length embedding vectors.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed a text string into a vector of `dimensions()` floats.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality of the vectors this embedder produces.
    fn dimensions(&self) -> usize;
}

/// Configuration for the OpenAI embedding client.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Embedding model identifier.
    pub model: String,

    /// Requested output dimensionality.
    pub dimensions: usize,

    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            QueryError::InvalidRequest("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the output dimensionality.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI embeddings API client.
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiConfig,
}

/// Response shape of the embeddings endpoint.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a new embedder with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| QueryError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create an embedder from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    /// Build the embeddings endpoint URL.
    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.config.base_url)
    }

    /// Add authentication headers to a request.
    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
    }
}

#[async_trait]
impl TextEmbedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Line breaks carry no meaning for the embedding model but can
        // affect request formatting, so they are flattened to spaces.
        let text = text.replace('\n', " ");
        if text.trim().is_empty() {
            return Err(QueryError::InvalidRequest(
                "Cannot embed empty text".to_string(),
            ));
        }

        let body = serde_json::json!({
            "model": self.config.model,
            "input": [text],
            "dimensions": self.config.dimensions,
        });

        let response = self
            .add_headers(self.client.post(self.embeddings_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| QueryError::Embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<no response body>".to_string());
            return Err(QueryError::Embedding(format!(
                "API returned {}: {}",
                status, detail
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| QueryError::Embedding(format!("Failed to parse response: {}", e)))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                QueryError::Embedding("Response contained no embeddings".to_string())
            })?;

        if embedding.len() != self.config.dimensions {
            return Err(QueryError::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.config.dimensions,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}

/// A mock embedder for deterministic testing.
///
/// Returns canned vectors keyed by input text, with an optional fallback
/// vector for unmatched inputs, and logs every request.
#[derive(Debug)]
pub struct MockEmbedder {
    dimensions: usize,
    responses: std::sync::Mutex<HashMap<String, Vec<f32>>>,
    fallback: Option<Vec<f32>>,
    failure: Option<String>,
    request_log: std::sync::Mutex<Vec<String>>,
}

impl MockEmbedder {
    /// Create a mock producing vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            responses: std::sync::Mutex::new(HashMap::new()),
            fallback: None,
            failure: None,
            request_log: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        let mut mock = Self::new(0);
        mock.failure = Some(message.into());
        mock
    }

    /// Set the canned vector for a specific input text.
    pub fn set_response(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.responses.lock().unwrap().insert(text.into(), vector);
    }

    /// Set a fallback vector returned for any unmatched input.
    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    /// Get all texts that were embedded.
    pub fn requests(&self) -> Vec<String> {
        self.request_log.lock().unwrap().clone()
    }

    /// Get the number of embed calls made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().unwrap().len()
    }
}

#[async_trait]
impl TextEmbedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_log.lock().unwrap().push(text.to_string());

        if let Some(ref message) = self.failure {
            return Err(QueryError::Embedding(message.clone()));
        }

        let responses = self.responses.lock().unwrap();
        responses
            .get(text)
            .cloned()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| {
                QueryError::Embedding(format!("No canned embedding for '{}'", text))
            })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
