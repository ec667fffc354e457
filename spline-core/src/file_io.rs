//! Document storage
//!
//! A [`DocumentRepository`] is a directory of named documents, each one a
//! pretty-printed JSON file in the format described in [`crate::codec`].
//! Saves are written to a temporary file first and then renamed over the
//! target so an interrupted save never truncates an existing document.

use crate::codec::{self, CodecError};
use crate::document::Document;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name used when a new document is requested without one
pub const UNTITLED: &str = "untitled.json";

/// Extension appended to new document names that have none
pub const EXTENSION: &str = "json";

/// Load or save failure for a named document
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to access document {name:?}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name:?} is not a valid document name")]
    InvalidName { name: String },

    #[error("document {name:?} is not readable: {source}")]
    Codec {
        name: String,
        #[source]
        source: CodecError,
    },
}

impl FileError {
    fn io(name: &str, source: std::io::Error) -> Self {
        FileError::Io {
            name: name.to_string(),
            source,
        }
    }

    fn invalid_name(name: &str) -> Self {
        FileError::InvalidName {
            name: name.to_string(),
        }
    }

    fn codec(name: &str, source: CodecError) -> Self {
        FileError::Codec {
            name: name.to_string(),
            source,
        }
    }
}

/// Display name of a document file: everything before the first `.`
pub fn pretty_name(file_name: &str) -> &str {
    match file_name.find('.') {
        Some(i) => &file_name[..i],
        None => file_name,
    }
}

/// Turn a requested name into a document file name
///
/// Empty requests become [`UNTITLED`]; names without an extension get
/// `.json` appended.
pub fn normalize_name(requested: &str) -> String {
    let requested = requested.trim();
    if requested.is_empty() {
        UNTITLED.to_string()
    } else if pretty_name(requested) == requested {
        format!("{requested}.{EXTENSION}")
    } else {
        requested.to_string()
    }
}

/// Whether `name` names a file directly inside the repository directory
///
/// Rejects path separators, `..` and names that are only dots.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
        && name.chars().any(|c| c != '.')
}

/// Directory of stored documents
#[derive(Clone, Debug)]
pub struct DocumentRepository {
    dir: PathBuf,
}

impl DocumentRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// File names of every stored document, sorted
    pub fn list(&self) -> Result<Vec<String>, FileError> {
        let dir_name = self.dir.display().to_string();
        let entries = std::fs::read_dir(&self.dir).map_err(|e| FileError::io(&dir_name, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FileError::io(&dir_name, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if !name.ends_with(".tmp") => names.push(name),
                Ok(_) => {}
                Err(raw) => log::debug!("skipping non UTF-8 file name {raw:?}"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create an empty document file and return its normalised name
    ///
    /// An existing file of the same name is left untouched.
    pub fn create(&self, requested: &str) -> Result<String, FileError> {
        let name = normalize_name(requested);
        if !is_valid_name(&name) {
            return Err(FileError::invalid_name(&name));
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| FileError::io(&name, e))?;

        let path = self.path(&name);
        if !path.exists() {
            std::fs::write(&path, b"").map_err(|e| FileError::io(&name, e))?;
            log::info!("created document {name:?}");
        }
        Ok(name)
    }

    /// Write a document, replacing any previous contents
    pub fn save(&self, name: &str, document: &Document) -> Result<(), FileError> {
        if !is_valid_name(name) {
            return Err(FileError::invalid_name(name));
        }
        let json = codec::encode(document).map_err(|e| FileError::codec(name, e))?;

        std::fs::create_dir_all(&self.dir).map_err(|e| FileError::io(name, e))?;
        let path = self.path(name);
        let temp_path = self.path(&format!("{name}.tmp"));
        std::fs::write(&temp_path, json).map_err(|e| FileError::io(name, e))?;
        std::fs::rename(&temp_path, &path).map_err(|e| FileError::io(name, e))?;

        log::info!(
            "saved document {name:?} ({} layers)",
            document.tree().descendants(&document.root()).len()
        );
        Ok(())
    }

    /// Read a document
    pub fn load(&self, name: &str) -> Result<Document, FileError> {
        if !is_valid_name(name) {
            return Err(FileError::invalid_name(name));
        }
        let json = std::fs::read_to_string(self.path(name)).map_err(|e| FileError::io(name, e))?;
        let document = codec::decode(&json).map_err(|e| FileError::codec(name, e))?;

        log::info!(
            "loaded document {name:?} ({} layers)",
            document.tree().descendants(&document.root()).len()
        );
        Ok(document)
    }
}
