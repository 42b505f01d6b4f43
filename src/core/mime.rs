use std::fs::File;
use std::io::Read;
use std::path::Path;

use compact_str::CompactString;

use super::signatures::{self, normalize_extension};

pub const UNKNOWN: &str = "unknown";

const SNIFF_LEN: u64 = 512;

static TEXT_TYPES: &[(&str, &str)] = &[
    (".txt", "text/plain"),
    (".log", "text/plain"),
    (".md", "text/markdown"),
    (".csv", "text/csv"),
    (".json", "application/json"),
    (".xml", "text/xml"),
    (".html", "text/html"),
    (".htm", "text/html"),
    (".svg", "image/svg+xml"),
    (".rtf", "text/rtf"),
    (".sql", "application/sql"),
    (".sh", "text/x-shellscript"),
    (".bat", "text/x-msdos-batch"),
];

/// Best-effort MIME type from content, using the extension only to break
/// ties between formats that share a header. Never fails: an unreadable
/// file yields `"unknown"`.
pub fn detect(path: &Path, extension: &str) -> CompactString {
    let head = match read_head(path) {
        Ok(head) => head,
        Err(e) => {
            tracing::debug!("MIME sniff failed for {}: {}", path.display(), e);
            return CompactString::const_new(UNKNOWN);
        }
    };
    CompactString::from(sniff(&head, extension))
}

pub fn sniff(head: &[u8], extension: &str) -> &'static str {
    if head.is_empty() {
        return "application/x-empty";
    }

    let ext = normalize_extension(extension);
    if let Some(sig) = signatures::lookup(&ext) {
        if head.starts_with(sig.magic) {
            return sig.mime;
        }
    }

    // Longest header wins so that e.g. a Jet DB is not mistaken for a shorter match.
    if let Some(sig) = signatures::signatures()
        .iter()
        .filter(|s| head.starts_with(s.magic))
        .max_by_key(|s| s.magic.len())
    {
        return sig.mime;
    }

    if looks_like_text(head) {
        return TEXT_TYPES
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, mime)| *mime)
            .unwrap_or("text/plain");
    }

    "application/octet-stream"
}

fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut head)?;
    Ok(head)
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte sequence cut at the sniff boundary is still text.
        Err(e) => e.error_len().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_by_header() {
        assert_eq!(sniff(b"%PDF-1.7 ...", ".pdf"), "application/pdf");
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n", ".bin"), "image/png");
    }

    #[test]
    fn shared_header_uses_extension() {
        assert_eq!(
            sniff(b"PK\x03\x04rest", ".docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(sniff(b"PK\x03\x04rest", ".zip"), "application/zip");
    }

    #[test]
    fn text_and_binary_fallbacks() {
        assert_eq!(sniff(b"hello world", ".txt"), "text/plain");
        assert_eq!(sniff(b"a,b\n1,2\n", ".csv"), "text/csv");
        assert_eq!(sniff(b"\x00\x01\x02\x03", ""), "application/octet-stream");
        assert_eq!(sniff(b"", ".txt"), "application/x-empty");
    }
}
