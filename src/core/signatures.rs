use std::path::Path;

/// Leading bytes expected for files carrying `extension`.
pub struct Signature {
    pub extension: &'static str,
    pub magic: &'static [u8],
    pub mime: &'static str,
}

static SIGNATURES: &[Signature] = &[
    Signature { extension: ".pdf", magic: b"%PDF-", mime: "application/pdf" },
    Signature { extension: ".jpg", magic: b"\xFF\xD8\xFF", mime: "image/jpeg" },
    Signature { extension: ".jpeg", magic: b"\xFF\xD8\xFF", mime: "image/jpeg" },
    Signature { extension: ".png", magic: b"\x89PNG", mime: "image/png" },
    Signature { extension: ".gif", magic: b"GIF89a", mime: "image/gif" },
    Signature { extension: ".zip", magic: b"PK\x03\x04", mime: "application/zip" },
    Signature { extension: ".exe", magic: b"MZ", mime: "application/x-dosexec" },
    Signature { extension: ".mp3", magic: b"ID3", mime: "audio/mpeg" },
    Signature { extension: ".mp4", magic: b"\x00\x00\x00\x18ftyp", mime: "video/mp4" },
    Signature {
        extension: ".doc",
        magic: b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1",
        mime: "application/msword",
    },
    Signature {
        extension: ".docx",
        magic: b"PK\x03\x04",
        mime: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    },
    Signature {
        extension: ".xlsx",
        magic: b"PK\x03\x04",
        mime: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    },
    Signature {
        extension: ".pptx",
        magic: b"PK\x03\x04",
        mime: "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    },
    Signature { extension: ".rar", magic: b"Rar!\x1A\x07\x00", mime: "application/vnd.rar" },
    Signature { extension: ".7z", magic: b"7z\xBC\xAF\x27\x1C", mime: "application/x-7z-compressed" },
    Signature { extension: ".gz", magic: b"\x1F\x8B\x08", mime: "application/gzip" },
    Signature { extension: ".tar", magic: b"ustar", mime: "application/x-tar" },
    Signature { extension: ".bmp", magic: b"BM", mime: "image/bmp" },
    Signature { extension: ".tiff", magic: b"II*\x00", mime: "image/tiff" },
    Signature { extension: ".wav", magic: b"RIFF", mime: "audio/x-wav" },
    Signature { extension: ".avi", magic: b"RIFF", mime: "video/x-msvideo" },
    Signature {
        extension: ".mdb",
        magic: b"\x00\x01\x00\x00Standard Jet DB",
        mime: "application/x-msaccess",
    },
    Signature { extension: ".sqlite", magic: b"SQLite format 3", mime: "application/vnd.sqlite3" },
];

pub fn signatures() -> &'static [Signature] {
    SIGNATURES
}

pub fn lookup(extension: &str) -> Option<&'static Signature> {
    let key = normalize_extension(extension);
    SIGNATURES.iter().find(|s| s.extension == key)
}

/// Expected leading bytes for `extension`. `None` means no signature check
/// is possible for this type, which is not a failure.
pub fn expected_prefix(extension: &str) -> Option<&'static [u8]> {
    lookup(extension).map(|s| s.magic)
}

/// `"PDF"`, `"pdf"` and `".Pdf"` all become `".pdf"`. Empty stays empty.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

/// The normalized extension of `path`, or an empty string.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|e| normalize_extension(&e.to_string_lossy()))
        .unwrap_or_default()
}
