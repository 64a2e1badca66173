//! Loading rig, operator and config documents from disk.
//!
//! Every loader hashes the raw file content with BLAKE3 so that reports can
//! show which document a run started from.

use rigsnap_pose::{Armature, PoseError};
use rigsnap_spec::{Invocation, ParamsError, SessionConfig};
use std::path::{Path, PathBuf};

/// A parsed document together with the hash of its source bytes.
#[derive(Debug)]
pub struct Loaded<T> {
    pub value: T,
    /// BLAKE3 hash of the file content (hex string).
    pub source_hash: String,
}

/// Errors that can occur while loading documents.
#[derive(Debug)]
pub enum InputError {
    /// File could not be read.
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The rig document is malformed.
    Rig(PoseError),

    /// The operator or config document is malformed.
    Params(ParamsError),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::FileRead { path, source } => {
                write!(f, "failed to read file '{}': {}", path.display(), source)
            }
            InputError::Rig(err) => write!(f, "invalid rig: {}", err),
            InputError::Params(err) => write!(f, "invalid document: {}", err),
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InputError::FileRead { source, .. } => Some(source),
            InputError::Rig(err) => Some(err),
            InputError::Params(err) => Some(err),
        }
    }
}

/// Returns the BLAKE3 hash of `bytes` as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

fn read(path: &Path) -> Result<(String, String), InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let hash = hash_bytes(content.as_bytes());
    Ok((content, hash))
}

/// Loads and evaluates a rig document.
pub fn load_rig(path: &Path) -> Result<Loaded<Armature>, InputError> {
    let (content, source_hash) = read(path)?;
    let value = Armature::from_json(&content).map_err(InputError::Rig)?;
    Ok(Loaded { value, source_hash })
}

/// Loads an operator invocation.
pub fn load_invocation(path: &Path) -> Result<Loaded<Invocation>, InputError> {
    let (content, source_hash) = read(path)?;
    let value = Invocation::from_json(&content).map_err(InputError::Params)?;
    Ok(Loaded { value, source_hash })
}

/// Loads a session config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<SessionConfig, InputError> {
    match path {
        Some(path) => {
            let (content, _) = read(path)?;
            SessionConfig::from_json(&content).map_err(InputError::Params)
        }
        None => Ok(SessionConfig::default()),
    }
}

/// Serializes a rig and returns the JSON text and its hash.
pub fn rig_document(rig: &Armature) -> Result<(String, String), PoseError> {
    let json = rig.to_json_pretty()?;
    let hash = hash_bytes(json.as_bytes());
    Ok((json, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_bytes(b"rig"), hash_bytes(b"rig"));
        assert_ne!(hash_bytes(b"rig"), hash_bytes(b"rig2"));
        assert_eq!(hash_bytes(b"").len(), 64);
    }

    #[test]
    fn test_missing_file() {
        let err = load_rig(Path::new("/nonexistent/rig.json")).unwrap_err();
        assert!(matches!(err, InputError::FileRead { .. }));
        assert!(err.to_string().contains("failed to read file"));
    }

    #[test]
    fn test_config_defaults_without_path() {
        assert_eq!(load_config(None).unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_invocation_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"operator\": {{\"type\": \"unknown\"}}}}").unwrap();
        let err = load_invocation(file.path()).unwrap_err();
        assert!(matches!(err, InputError::Params(ParamsError::Parse(_))));
    }
}
