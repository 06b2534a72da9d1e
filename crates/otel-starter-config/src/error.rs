//! Configuration error types.

use crate::multi::MultiError;
use thiserror::Error;

/// Boxed error returned by injected collaborators (detectors, exporters).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`ConfigError`].
///
/// Callers match on the kind rather than on the message, the same way a
/// sentinel error would be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was absent or empty.
    NilParam,
    /// An argument was present but failed a validity check.
    InvalidParam,
    /// Resource detection or merging failed.
    Resource,
}

/// Errors produced while applying configuration options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required argument was absent.
    #[error("{what} is empty: nil value provided")]
    NilParam {
        /// Which argument was missing.
        what: String,
    },

    /// An argument failed validation.
    #[error("invalid value provided for {field}: {reason}")]
    InvalidParam {
        /// The option or field being configured.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Resource detection or merge failure.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Several options failed in one batch.
    #[error(transparent)]
    Multiple(MultiError<ConfigError>),
}

impl ConfigError {
    /// Create a nil parameter error.
    pub fn nil_param(what: impl Into<String>) -> Self {
        Self::NilParam { what: what.into() }
    }

    /// Create an invalid parameter error.
    pub fn invalid_param(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the kind of this error.
    ///
    /// Aggregates report the kind of their first member.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NilParam { .. } => ErrorKind::NilParam,
            Self::InvalidParam { .. } => ErrorKind::InvalidParam,
            Self::Resource(_) => ErrorKind::Resource,
            Self::Multiple(errors) => errors
                .iter()
                .next()
                .map_or(ErrorKind::InvalidParam, ConfigError::kind),
        }
    }

    /// Returns true if this error, or any error it aggregates, has `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        match self {
            Self::Multiple(errors) => errors.iter().any(|e| e.is(kind)),
            other => other.kind() == kind,
        }
    }
}

impl From<MultiError<ConfigError>> for ConfigError {
    fn from(errors: MultiError<ConfigError>) -> Self {
        Self::Multiple(errors)
    }
}

impl MultiError<ConfigError> {
    /// Appends an option result, flattening nested aggregates.
    pub fn append(&mut self, result: Result<(), ConfigError>) {
        match result {
            Ok(()) => {}
            Err(ConfigError::Multiple(nested)) => self.extend(nested),
            Err(err) => self.push(err),
        }
    }

    /// Returns true if any aggregated error has `kind`.
    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.iter().any(|e| e.is(kind))
    }
}

/// Errors raised while detecting or merging resource attributes.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The detector itself failed.
    #[error("resource detection failed: {0}")]
    Detect(#[source] BoxError),

    /// Both sides of a merge declared different schema URLs.
    #[error("cannot merge resources with different schema urls: {left} and {right}")]
    SchemaConflict {
        /// Schema URL of the existing resource.
        left: String,
        /// Schema URL of the incoming resource.
        right: String,
    },
}

impl ResourceError {
    /// Wrap an arbitrary detector failure.
    pub fn detect(err: impl Into<BoxError>) -> Self {
        Self::Detect(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_param_display() {
        let err = ConfigError::nil_param("resource detector");
        assert_eq!(err.to_string(), "resource detector is empty: nil value provided");
        assert_eq!(err.kind(), ErrorKind::NilParam);
    }

    #[test]
    fn test_invalid_param_display() {
        let err = ConfigError::invalid_param("endpoint", "unknown scheme wss");
        assert!(err.to_string().contains("endpoint"));
        assert!(err.to_string().contains("unknown scheme wss"));
        assert_eq!(err.kind(), ErrorKind::InvalidParam);
    }

    #[test]
    fn test_append_flattens_nested() {
        let mut inner = MultiError::new();
        inner.push(ConfigError::nil_param("headers"));
        inner.push(ConfigError::invalid_param("exporter", "empty"));

        let mut outer = MultiError::new();
        outer.append(Ok(()));
        outer.append(Err(ConfigError::Multiple(inner)));
        outer.append(Err(ConfigError::invalid_param("endpoint", "bad")));

        assert_eq!(outer.len(), 3);
        assert!(outer.contains(ErrorKind::NilParam));
        assert!(outer.contains(ErrorKind::InvalidParam));
        assert!(!outer.contains(ErrorKind::Resource));
    }

    #[test]
    fn test_is_searches_aggregate() {
        let mut errors = MultiError::new();
        errors.push(ConfigError::invalid_param("a", "b"));
        errors.push(ResourceError::SchemaConflict {
            left: "https://a".into(),
            right: "https://b".into(),
        }
        .into());
        let err = ConfigError::from(errors);

        assert_eq!(err.kind(), ErrorKind::InvalidParam);
        assert!(err.is(ErrorKind::Resource));
        assert!(!err.is(ErrorKind::NilParam));
    }
}
