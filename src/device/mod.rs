//! 撮影デバイス
//!
//! カメラの開閉とスナップショット取得を抽象化する。
//! セッションは Live に入るとき `open_stream`、撮影時に `snapshot`、
//! Live/Captured を抜けるときに `close_stream` を呼ぶ。

mod folder;

pub use folder::{scan_images, FolderDevice, FolderStream};

use crate::error::Result;
use chrono::{DateTime, Local};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// 撮影デバイス
pub trait Device {
    /// 開いているストリームのハンドル
    type Stream;

    fn open_stream(&mut self) -> Result<Self::Stream>;

    fn snapshot(&mut self, stream: &Self::Stream) -> Result<ImageCapture>;

    fn close_stream(&mut self, stream: Self::Stream);
}

/// 1台のデバイスを複数セッションで順に使うため
impl<D: Device + ?Sized> Device for &mut D {
    type Stream = D::Stream;

    fn open_stream(&mut self) -> Result<Self::Stream> {
        (**self).open_stream()
    }

    fn snapshot(&mut self, stream: &Self::Stream) -> Result<ImageCapture> {
        (**self).snapshot(stream)
    }

    fn close_stream(&mut self, stream: Self::Stream) {
        (**self).close_stream(stream)
    }
}

/// 撮影済み静止画（作成後は不変）
#[derive(Clone)]
pub struct ImageCapture {
    bytes: Arc<[u8]>,
    dimensions: Option<(u32, u32)>,
    source: String,
    captured_at: DateTime<Local>,
}

impl ImageCapture {
    /// エンコード済み画像から作成。サイズはデコードできた場合のみ保持
    pub fn new(bytes: Vec<u8>, source: impl Into<String>) -> Self {
        let dimensions = image::ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok());

        Self {
            bytes: Arc::from(bytes),
            dimensions,
            source: source.into(),
            captured_at: Local::now(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 画像の幅・高さ（不明ならNone）
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    /// MIMEタイプ（判別できなければ image/jpeg）
    pub fn mime_type(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or("image/jpeg")
    }

    /// 一時ファイル用の拡張子
    pub fn file_extension(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("jpg")
    }
}

impl fmt::Debug for ImageCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCapture")
            .field("len", &self.bytes.len())
            .field("dimensions", &self.dimensions)
            .field("source", &self.source)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        image::RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_image_capture_png() {
        let bytes = png_bytes(4, 3);
        let capture = ImageCapture::new(bytes.clone(), "shelf.png");
        assert_eq!(capture.dimensions(), Some((4, 3)));
        assert_eq!(capture.mime_type(), "image/png");
        assert_eq!(capture.file_extension(), "png");
        assert_eq!(capture.source(), "shelf.png");
        assert_eq!(capture.len(), bytes.len());
    }

    #[test]
    fn test_image_capture_unknown_format() {
        let capture = ImageCapture::new(b"dummy".to_vec(), "frame");
        assert_eq!(capture.dimensions(), None);
        assert_eq!(capture.mime_type(), "image/jpeg");
        assert_eq!(capture.file_extension(), "jpg");
    }

    #[test]
    fn test_image_capture_debug_omits_bytes() {
        let capture = ImageCapture::new(vec![0xAB; 4096], "big");
        let debug = format!("{:?}", capture);
        assert!(debug.contains("len: 4096"));
        assert!(debug.len() < 300);
    }
}
