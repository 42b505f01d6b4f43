//! Serde helpers for paths that may not be valid UTF-8.
//!
//! Binary formats (session files) store the raw OS bytes so any name found on
//! disk survives a save/load round trip. Human-readable formats (JSON export,
//! recovery sidecars) get the display string instead.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserializer, Serializer};

pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(&path.to_string_lossy())
    } else {
        serializer.serialize_bytes(&to_bytes(path))
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
    if deserializer.is_human_readable() {
        deserializer.deserialize_string(PathVisitor)
    } else {
        deserializer.deserialize_byte_buf(PathVisitor)
    }
}

struct PathVisitor;

impl<'de> Visitor<'de> for PathVisitor {
    type Value = PathBuf;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a path as a string or raw bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<PathBuf, E> {
        Ok(PathBuf::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<PathBuf, E> {
        Ok(PathBuf::from(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<PathBuf, E> {
        Ok(from_bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<PathBuf, E> {
        Ok(from_bytes(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PathBuf, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(b) = seq.next_element::<u8>()? {
            bytes.push(b);
        }
        Ok(from_bytes(bytes))
    }
}

#[cfg(unix)]
fn to_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(unix)]
fn from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

// TODO: store UTF-16 units on Windows so unpaired surrogates round-trip too.
#[cfg(not(unix))]
fn to_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(not(unix))]
fn from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super")]
        path: PathBuf,
    }

    #[test]
    fn binary_round_trip_keeps_utf8_path() {
        let holder = Holder {
            path: PathBuf::from("/media/card/DCIM/photo.jpg"),
        };
        let config = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&holder, config).unwrap();
        let (back, _): (Holder, usize) = bincode::serde::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(back, holder);
    }

    #[cfg(unix)]
    #[test]
    fn binary_round_trip_keeps_raw_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let raw = std::ffi::OsStr::from_bytes(b"/media/card/caf\xe9.txt");
        let holder = Holder {
            path: PathBuf::from(raw),
        };
        let config = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&holder, config).unwrap();
        let (back, _): (Holder, usize) = bincode::serde::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(back.path.as_os_str().as_bytes(), raw.as_bytes());
    }

    #[test]
    fn json_uses_display_string() {
        let holder = Holder {
            path: PathBuf::from("/tmp/a b.txt"),
        };
        let json = serde_json::to_string(&holder).unwrap();
        assert_eq!(json, r#"{"path":"/tmp/a b.txt"}"#);
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, holder);
    }
}
