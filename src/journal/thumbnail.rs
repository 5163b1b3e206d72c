use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),
}

/// Result of best-effort thumbnail generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    /// `data:image/jpeg;base64,...`
    Encoded(String),
    Unavailable,
}

impl Thumbnail {
    pub fn into_data_url(self) -> String {
        match self {
            Thumbnail::Encoded(url) => url,
            Thumbnail::Unavailable => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thumbnailer {
    pub max_side: u32,
    /// JPEG quality, 1..=100.
    pub quality: u8,
}

impl Default for Thumbnailer {
    fn default() -> Self {
        Self {
            max_side: 200,
            quality: 70,
        }
    }
}

/// Clamp the longer side to `max_side`, keeping the aspect ratio.
/// Images already within bounds keep their size.
pub fn scaled_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let (w, h) = if width >= height && width > max_side {
        let h = (height as f64 * max_side as f64 / width as f64).round() as u32;
        (max_side, h)
    } else if height > width && height > max_side {
        let w = (width as f64 * max_side as f64 / height as f64).round() as u32;
        (w, max_side)
    } else {
        (width, height)
    };
    (w.clamp(1, max_side.max(1)), h.clamp(1, max_side.max(1)))
}

impl Thumbnailer {
    pub fn render(&self, bytes: &[u8]) -> Result<String, ThumbnailError> {
        let img = image::load_from_memory(bytes).map_err(ThumbnailError::Decode)?;
        let (w, h) = scaled_dimensions(img.width(), img.height(), self.max_side);
        let rgb = img.resize_exact(w, h, FilterType::Triangle).to_rgb8();

        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, self.quality.clamp(1, 100));
        encoder.encode_image(&rgb).map_err(ThumbnailError::Encode)?;

        debug!("Thumbnail {}x{} ({} bytes)", w, h, buf.len());
        Ok(format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&buf)
        ))
    }

    pub fn thumbnail(&self, bytes: &[u8]) -> Thumbnail {
        match self.render(bytes) {
            Ok(url) => Thumbnail::Encoded(url),
            Err(e) => {
                warn!("Thumbnail unavailable: {}", e);
                Thumbnail::Unavailable
            }
        }
    }

    /// Same as [`Thumbnailer::thumbnail`], on the blocking pool.
    pub async fn thumbnail_blocking(&self, bytes: Vec<u8>) -> Thumbnail {
        let this = *self;
        match tokio::task::spawn_blocking(move || this.thumbnail(&bytes)).await {
            Ok(thumb) => thumb,
            Err(e) => {
                warn!("Thumbnail task failed: {}", e);
                Thumbnail::Unavailable
            }
        }
    }
}
