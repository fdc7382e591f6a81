#![forbid(unsafe_code)]

//! Configuration errors.
//!
//! Form operations themselves never fail; only loading [`FormOptions`]
//! from text or files does.
//!
//! [`FormOptions`]: crate::FormOptions

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors from loading form options.
#[derive(Debug)]
pub enum ConfigError {
    /// The options file could not be read.
    Io { path: PathBuf, source: io::Error },
    /// JSON text did not describe valid options.
    Json(serde_json::Error),
    /// TOML text did not describe valid options.
    #[cfg(feature = "toml-config")]
    Toml(toml::de::Error),
    /// The file extension names no supported format.
    UnsupportedFormat(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read form options '{}': {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid JSON form options: {err}"),
            #[cfg(feature = "toml-config")]
            Self::Toml(err) => write!(f, "invalid TOML form options: {err}"),
            Self::UnsupportedFormat(ext) if ext.is_empty() => {
                write!(f, "form options file has no extension")
            }
            Self::UnsupportedFormat(ext) => {
                write!(f, "unsupported form options format: .{ext}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            #[cfg(feature = "toml-config")]
            Self::Toml(err) => Some(err),
            Self::UnsupportedFormat(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

#[cfg(feature = "toml-config")]
impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Toml(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_error_names_path_and_keeps_source() {
        let err = ConfigError::Io {
            path: PathBuf::from("missing.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("missing.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ConfigError::from(parse);
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("invalid JSON"));
    }

    #[test]
    fn unsupported_format_display() {
        assert_eq!(
            ConfigError::UnsupportedFormat("yaml".into()).to_string(),
            "unsupported form options format: .yaml"
        );
        assert_eq!(
            ConfigError::UnsupportedFormat(String::new()).to_string(),
            "form options file has no extension"
        );
        assert!(ConfigError::UnsupportedFormat("x".into()).source().is_none());
    }
}
