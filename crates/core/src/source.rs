//! Reading source text from disk.
//!
//! Files are decoded as UTF-8 first. Anything that is not valid UTF-8 is
//! decoded as Latin-1, which maps every byte to a character and so never fails.

use std::fs;
use std::io;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Read a file as text, falling back to Latin-1 when it is not UTF-8
pub fn read_source_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(decode_source(bytes))
}

/// Decode raw bytes as UTF-8, or as Latin-1 if that fails
pub fn decode_source(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => match text.strip_prefix(UTF8_BOM) {
            Some(stripped) => stripped.to_string(),
            None => text,
        },
        Err(err) => {
            tracing::debug!("source is not UTF-8, decoding as Latin-1");
            err.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_utf8_passthrough() {
        let text = decode_source("import café\n".as_bytes().to_vec());
        assert_eq!(text, "import café\n");
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"import os\n");
        assert_eq!(decode_source(bytes), "import os\n");
    }

    #[test]
    fn test_latin1_fallback() {
        // "# caf\xe9" is invalid UTF-8
        let bytes = b"# caf\xe9\nimport os\n".to_vec();
        let text = decode_source(bytes);
        assert_eq!(text, "# café\nimport os\n");
    }

    #[test]
    fn test_read_source_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.py");
        fs::write(&path, b"\xff\xfe import os\n").unwrap();

        let text = read_source_text(&path).unwrap();
        assert!(text.ends_with("import os\n"));
        assert_eq!(text.chars().count(), 13);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_source_text(&dir.path().join("nope.py")).is_err());
    }
}
