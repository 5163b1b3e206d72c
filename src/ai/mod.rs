pub mod analyzer;
pub mod cooldown;
pub mod error;
pub mod gemini;
pub mod retry;

pub use analyzer::{AnalysisError, AnalysisRequest, ChartAnalyzer};
pub use cooldown::RequestCooldown;
pub use error::ServiceError;
pub use gemini::GeminiClient;
pub use retry::{RetryExecutor, RetryPolicy};

use async_trait::async_trait;

/// An uploaded chart snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ChartImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// MIME type sniffed from the image bytes, PNG when unrecognised.
    pub fn mime_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or("image/png")
    }
}

/// Multimodal inference: prompt plus images in, free text out.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(&self, prompt: &str, images: &[ChartImage]) -> Result<String, ServiceError>;
}

#[async_trait]
impl<M: VisionModel + ?Sized> VisionModel for std::sync::Arc<M> {
    async fn generate(&self, prompt: &str, images: &[ChartImage]) -> Result<String, ServiceError> {
        (**self).generate(prompt, images).await
    }
}
