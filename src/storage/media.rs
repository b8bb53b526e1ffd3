//! Media upload boundary

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::data::{EntityId, MediaKind};
use crate::error::Result;

/// File extension for an uploaded content type
pub fn media_file_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        _ => "bin",
    }
}

/// Media storage service: accepts a raw file and a declared kind,
/// returns a stable URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload one file; the returned URL is the only thing persisted
    async fn upload(&self, data: Vec<u8>, content_type: &str, kind: MediaKind) -> Result<String>;
}

/// Media store that keeps uploads in memory and hands out local URLs,
/// for the demo binary and tests.
#[derive(Default)]
pub struct InMemoryMediaStore {
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(&self, data: Vec<u8>, content_type: &str, kind: MediaKind) -> Result<String> {
        let key = format!(
            "{}/{}.{}",
            kind.as_str(),
            EntityId::new().0,
            media_file_extension(content_type)
        );
        let url = format!("mem://media/{key}");
        self.uploads.lock().await.push((key, data));

        use crate::metrics::MEDIA_UPLOADS_TOTAL;
        MEDIA_UPLOADS_TOTAL.inc();

        tracing::debug!(url = %url, "Media upload stored");
        Ok(url)
    }
}
