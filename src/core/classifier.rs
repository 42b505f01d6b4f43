use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::models::record::FileStatus;

use super::signatures::{expected_prefix, normalize_extension};

/// Formats whose content can be fully decoded to confirm integrity.
const DECODE_VERIFIED: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp"];

/// Classify the file at `path` as if it carried `extension`.
///
/// Checks run in order and stop at the first verdict:
/// not a readable regular file is `Corrupted`; a missing or mismatched
/// header is `Damaged`; a failed image decode is `Damaged`; anything else is
/// `Good`. I/O errors along the way map to `Corrupted` and are never returned.
///
/// Holds no shared state, so it can run concurrently on different paths.
pub fn classify(path: &Path, extension: &str) -> FileStatus {
    match try_classify(path, extension) {
        Ok(status) => status,
        Err(e) => {
            debug!("Classification of {} failed: {}", path.display(), e);
            FileStatus::Corrupted
        }
    }
}

pub fn is_decode_verified(extension: &str) -> bool {
    DECODE_VERIFIED.contains(&normalize_extension(extension).as_str())
}

fn try_classify(path: &Path, extension: &str) -> std::io::Result<FileStatus> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Ok(FileStatus::Corrupted);
    }
    let file = File::open(path)?;

    let ext = normalize_extension(extension);
    if let Some(magic) = expected_prefix(&ext) {
        let mut header = Vec::with_capacity(magic.len());
        file.take(magic.len() as u64).read_to_end(&mut header)?;
        if header.as_slice() != magic {
            return Ok(FileStatus::Damaged);
        }
    }

    if is_decode_verified(&ext) {
        if let Err(e) = verify_image(path) {
            debug!("Image decode of {} failed: {}", path.display(), e);
            return Ok(FileStatus::Damaged);
        }
    }

    Ok(FileStatus::Good)
}

fn verify_image(path: &Path) -> image::ImageResult<()> {
    image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("filerescue_classifier_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn matching_header_is_good() {
        let path = temp_file("doc.pdf", b"%PDF-1.4\n%rest of document");
        assert_eq!(classify(&path, ".pdf"), FileStatus::Good);
    }

    #[test]
    fn mismatched_header_is_damaged() {
        let path = temp_file("fake.pdf", b"<html>not a pdf</html>");
        assert_eq!(classify(&path, ".pdf"), FileStatus::Damaged);
    }

    #[test]
    fn short_file_is_damaged() {
        let path = temp_file("short.pdf", b"%PD");
        assert_eq!(classify(&path, ".pdf"), FileStatus::Damaged);
    }

    #[test]
    fn empty_png_is_damaged() {
        let path = temp_file("empty.png", b"");
        assert_eq!(classify(&path, ".png"), FileStatus::Damaged);
    }

    #[test]
    fn png_header_with_garbage_body_is_damaged() {
        let path = temp_file("broken.png", b"\x89PNG\r\n\x1a\nthis is not image data");
        assert_eq!(classify(&path, ".png"), FileStatus::Damaged);
    }

    #[test]
    fn unregistered_extension_is_good() {
        let path = temp_file("notes.txt", b"anything at all");
        assert_eq!(classify(&path, ".txt"), FileStatus::Good);
    }

    #[test]
    fn missing_file_is_corrupted() {
        let path = std::env::temp_dir().join("filerescue_classifier_missing/nothing.pdf");
        assert_eq!(classify(&path, ".pdf"), FileStatus::Corrupted);
    }

    #[test]
    fn directory_is_corrupted() {
        let path = temp_file("dir_check.txt", b"x");
        let dir = path.parent().unwrap();
        assert_eq!(classify(dir, ".txt"), FileStatus::Corrupted);
    }
}
