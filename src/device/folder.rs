//! 画像ファイル/フォルダをカメラとして扱うデバイス
//!
//! 撮影のたびにフォルダ内の画像を名前順に1枚ずつ返す（末尾で先頭に戻る）。

use super::{Device, ImageCapture};
use crate::error::{Result, ShelfCountError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

/// 画像ファイルを列挙
///
/// - ファイル指定: そのファイルのみ
/// - フォルダ指定: 直下の画像をファイル名順で
pub fn scan_images(source: &Path) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    if !source.exists() {
        return Err(ShelfCountError::FolderNotFound(source.display().to_string()));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(source)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file() && is_image_path(path))
        .collect();

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(images)
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            IMAGE_EXTENSIONS.iter().any(|&e| e == ext)
        })
        .unwrap_or(false)
}

/// 開いているストリーム（開いた時点の画像一覧）
#[derive(Debug)]
pub struct FolderStream {
    frames: Vec<PathBuf>,
}

impl FolderStream {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// ファイル/フォルダをカメラとして扱う
#[derive(Debug)]
pub struct FolderDevice {
    source: PathBuf,
    cursor: usize,
    open_streams: usize,
}

impl FolderDevice {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            cursor: 0,
            open_streams: 0,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// 現在開いているストリーム数
    pub fn open_streams(&self) -> usize {
        self.open_streams
    }
}

impl Device for FolderDevice {
    type Stream = FolderStream;

    fn open_stream(&mut self) -> Result<FolderStream> {
        let frames = scan_images(&self.source)?;
        if frames.is_empty() {
            return Err(ShelfCountError::NoImagesFound(self.source.display().to_string()));
        }

        self.open_streams += 1;
        tracing::debug!(source = %self.source.display(), frames = frames.len(), "stream opened");
        Ok(FolderStream { frames })
    }

    fn snapshot(&mut self, stream: &FolderStream) -> Result<ImageCapture> {
        if stream.frames.is_empty() {
            return Err(ShelfCountError::Device("撮影できる画像がありません".into()));
        }

        let path = &stream.frames[self.cursor % stream.frames.len()];
        self.cursor += 1;

        let bytes = std::fs::read(path)
            .map_err(|e| ShelfCountError::Device(format!("{}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let capture = ImageCapture::new(bytes, name);
        tracing::debug!(
            source = capture.source(),
            bytes = capture.len(),
            dimensions = ?capture.dimensions(),
            "snapshot taken"
        );
        Ok(capture)
    }

    fn close_stream(&mut self, stream: FolderStream) {
        self.open_streams = self.open_streams.saturating_sub(1);
        tracing::debug!(frames = stream.frames.len(), "stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::png_bytes;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("a.jpg")));
        assert!(is_image_path(Path::new("a.JPG")));
        assert!(is_image_path(Path::new("a.jpeg")));
        assert!(is_image_path(Path::new("a.png")));
        assert!(!is_image_path(Path::new("a.txt")));
        assert!(!is_image_path(Path::new("a.gif")));
        assert!(!is_image_path(Path::new("noext")));
    }

    #[test]
    fn test_scan_not_found() {
        let result = scan_images(Path::new("/nonexistent/folder"));
        assert!(matches!(result, Err(ShelfCountError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_sorted_images_only() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("c.jpg")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("a.png")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("b.JPG")).unwrap().write_all(b"dummy").unwrap();
        File::create(dir.path().join("notes.txt")).unwrap().write_all(b"text").unwrap();

        let images = scan_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "c.jpg"]);
    }

    #[test]
    fn test_scan_single_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shelf.png");
        std::fs::write(&path, png_bytes(2, 2)).unwrap();

        assert_eq!(scan_images(&path).unwrap(), vec![path]);
    }

    #[test]
    fn test_open_empty_folder_fails() {
        let dir = tempdir().unwrap();
        let mut device = FolderDevice::new(dir.path());
        assert!(matches!(device.open_stream(), Err(ShelfCountError::NoImagesFound(_))));
        assert_eq!(device.open_streams(), 0);
    }

    #[test]
    fn test_snapshot_cycles_frames() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("1.png"), png_bytes(8, 6)).unwrap();
        std::fs::write(dir.path().join("2.png"), png_bytes(4, 4)).unwrap();

        let mut device = FolderDevice::new(dir.path());
        let stream = device.open_stream().unwrap();
        assert_eq!(stream.frame_count(), 2);
        assert_eq!(device.open_streams(), 1);

        let first = device.snapshot(&stream).unwrap();
        let second = device.snapshot(&stream).unwrap();
        let third = device.snapshot(&stream).unwrap();
        assert_eq!(first.source(), "1.png");
        assert_eq!(first.dimensions(), Some((8, 6)));
        assert_eq!(second.source(), "2.png");
        assert_eq!(third.source(), "1.png");

        device.close_stream(stream);
        assert_eq!(device.open_streams(), 0);
    }
}
