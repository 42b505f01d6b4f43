use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// File-type groups a scan can be limited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    All,
    Pictures,
    Documents,
    Audio,
    Video,
    Archives,
    Database,
    Executables,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::All,
        Category::Pictures,
        Category::Documents,
        Category::Audio,
        Category::Video,
        Category::Archives,
        Category::Database,
        Category::Executables,
    ];

    /// Dot-prefixed lowercase extensions, or `None` for no filtering.
    pub fn extensions(self) -> Option<&'static [&'static str]> {
        match self {
            Category::All => None,
            Category::Pictures => Some(&[
                ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp", ".svg",
            ]),
            Category::Documents => Some(&[
                ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".rtf", ".odt",
                ".ods",
            ]),
            Category::Audio => Some(&[".mp3", ".wav", ".aac", ".flac", ".ogg", ".wma", ".m4a"]),
            Category::Video => Some(&[
                ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".m4v", ".webm",
            ]),
            Category::Archives => Some(&[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz"]),
            Category::Database => Some(&[".db", ".sqlite", ".mdb", ".accdb", ".sql", ".dbf"]),
            Category::Executables => Some(&[".exe", ".dll", ".msi", ".bat", ".sh", ".app", ".apk"]),
        }
    }

    /// `extension` must already be normalized (dot-prefixed, lowercase).
    pub fn accepts(self, extension: &str) -> bool {
        match self.extensions() {
            None => true,
            Some(set) => set.contains(&extension),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::All => "All Files",
            Category::Pictures => "Pictures",
            Category::Documents => "Documents",
            Category::Audio => "Audio",
            Category::Video => "Video",
            Category::Archives => "Archives",
            Category::Database => "Database",
            Category::Executables => "Executables",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().trim_matches(|c| c == '[' || c == ']').to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.name().to_ascii_lowercase() == key || (key == "all" && *c == Category::All))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_accepts_everything() {
        assert!(Category::All.accepts(".anything"));
        assert!(Category::All.accepts(""));
    }

    #[test]
    fn pictures_filter() {
        assert!(Category::Pictures.accepts(".png"));
        assert!(!Category::Pictures.accepts(".pdf"));
        assert!(!Category::Pictures.accepts(""));
    }

    #[test]
    fn parse_names() {
        assert_eq!("pictures".parse::<Category>(), Ok(Category::Pictures));
        assert_eq!("[All Files]".parse::<Category>(), Ok(Category::All));
        assert_eq!("all".parse::<Category>(), Ok(Category::All));
        assert!("nope".parse::<Category>().is_err());
    }
}
