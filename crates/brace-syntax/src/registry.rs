//! Registry of source readers, looked up by language or file extension.

use crate::traits::Reader;
use std::sync::{OnceLock, RwLock};

static READERS: RwLock<Vec<&'static dyn Reader>> = RwLock::new(Vec::new());
static READERS_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Register a custom reader. Later registrations do not shadow earlier ones.
pub fn register_reader(reader: &'static dyn Reader) {
    READERS
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .push(reader);
}

fn init_readers() {
    READERS_INITIALIZED.get_or_init(|| {
        #[cfg(feature = "read-python")]
        {
            register_reader(&crate::input::python::PYTHON_READER);
        }
    });
}

/// Get a reader by language name.
pub fn reader_for_language(lang: &str) -> Option<&'static dyn Reader> {
    init_readers();
    READERS
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .find(|r| r.language() == lang)
        .copied()
}

/// Get a reader by file extension (without the dot).
pub fn reader_for_extension(ext: &str) -> Option<&'static dyn Reader> {
    init_readers();
    READERS
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .find(|r| r.extensions().contains(&ext))
        .copied()
}

/// All registered readers.
pub fn readers() -> Vec<&'static dyn Reader> {
    init_readers();
    READERS.read().unwrap_or_else(|e| e.into_inner()).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "read-python")]
    fn test_reader_lookup() {
        let reader = reader_for_language("python").expect("python reader");
        assert_eq!(reader.language(), "python");
        assert!(reader.extensions().contains(&"py"));

        let reader = reader_for_extension("pyi").expect("pyi extension");
        assert_eq!(reader.language(), "python");
    }

    #[test]
    fn test_unknown_language() {
        assert!(reader_for_language("cobol").is_none());
        assert!(reader_for_extension("cbl").is_none());
    }
}
