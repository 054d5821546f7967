//! 保存済み応答の再生

use super::{Transport, TransportError};
use crate::device::ImageCapture;
use async_trait::async_trait;
use std::path::PathBuf;

/// 呼び出しごとに同じ応答ファイルを読んで返す
#[derive(Debug, Clone)]
pub struct ReplyFileTransport {
    path: PathBuf,
}

impl ReplyFileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Transport for ReplyFileTransport {
    async fn invoke_model(
        &self,
        image: &ImageCapture,
        expected_label: &str,
    ) -> Result<String, TransportError> {
        tracing::debug!(
            path = %self.path.display(),
            image = image.source(),
            label = expected_label,
            "replaying stored reply"
        );
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_replays_file_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reply.txt");
        std::fs::write(&path, "2, [[x1: 0.1, y1: 0.1, x2: 0.3, y2: 0.3]]").unwrap();

        let transport = ReplyFileTransport::new(&path);
        let image = ImageCapture::new(b"dummy".to_vec(), "frame");
        let reply = transport.invoke_model(&image, "mouse").await.unwrap();
        assert!(reply.starts_with("2, [["));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let transport = ReplyFileTransport::new("/nonexistent/reply.txt");
        let image = ImageCapture::new(b"dummy".to_vec(), "frame");
        let err = transport.invoke_model(&image, "mouse").await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
