//! Error types for model migration.
//!
//! Each variant carries a stable error code (SCREAMING_SNAKE_CASE) that is
//! included in the Display output and accessible via [`MigrateError::code()`].

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// A version string could not be parsed.
    pub const VERSION_INVALID: &str = "VERSION_INVALID";

    /// The models document carries no version tag.
    pub const VERSION_MISSING: &str = "VERSION_MISSING";

    /// The models document could not be read, parsed or written.
    pub const STORE_FAILED: &str = "STORE_FAILED";

    /// A bundled template could not be found or copied.
    pub const TEMPLATE_FAILED: &str = "TEMPLATE_FAILED";

    /// The application config could not be read, parsed or written.
    pub const CONFIG_FAILED: &str = "CONFIG_FAILED";

    /// The migration step table is malformed.
    pub const STEP_TABLE_INVALID: &str = "STEP_TABLE_INVALID";

    /// Underlying I/O failure.
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Errors produced while loading, migrating or persisting model definitions.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A version string could not be parsed.
    #[error("[{}] invalid version '{input}': {reason}", error_codes::VERSION_INVALID)]
    InvalidVersion { input: String, reason: String },

    /// The models document carries no version tag.
    #[error("[{}] {}", error_codes::VERSION_MISSING, .0)]
    MissingVersion(String),

    /// The models document could not be read, parsed or written.
    #[error("[{}] {}", error_codes::STORE_FAILED, .0)]
    Store(String),

    /// A bundled template could not be found or copied.
    #[error("[{}] {}", error_codes::TEMPLATE_FAILED, .0)]
    Template(String),

    /// The application config could not be read, parsed or written.
    #[error("[{}] {}", error_codes::CONFIG_FAILED, .0)]
    Config(String),

    /// The migration step table is malformed.
    #[error("[{}] {}", error_codes::STEP_TABLE_INVALID, .0)]
    InvalidStepTable(String),

    /// Underlying I/O failure.
    #[error("[{}] {}", error_codes::IO_ERROR, .0)]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidVersion { .. } => error_codes::VERSION_INVALID,
            Self::MissingVersion(_) => error_codes::VERSION_MISSING,
            Self::Store(_) => error_codes::STORE_FAILED,
            Self::Template(_) => error_codes::TEMPLATE_FAILED,
            Self::Config(_) => error_codes::CONFIG_FAILED,
            Self::InvalidStepTable(_) => error_codes::STEP_TABLE_INVALID,
            Self::Io(_) => error_codes::IO_ERROR,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_prefix() {
        let err = MigrateError::Store("cannot read models.json".into());
        assert_eq!(err.to_string(), "[STORE_FAILED] cannot read models.json");
    }

    #[test]
    fn invalid_version_display() {
        let err = MigrateError::InvalidVersion {
            input: "2.x".into(),
            reason: "segment 'x' is not a number".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("[VERSION_INVALID]"));
        assert!(msg.contains("'2.x'"));
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            MigrateError::InvalidVersion {
                input: String::new(),
                reason: String::new(),
            },
            MigrateError::MissingVersion(String::new()),
            MigrateError::Store(String::new()),
            MigrateError::Template(String::new()),
            MigrateError::Config(String::new()),
            MigrateError::InvalidStepTable(String::new()),
            MigrateError::Io(std::io::Error::other("x")),
        ];
        let mut codes: Vec<&str> = errors.iter().map(MigrateError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MigrateError = io.into();
        assert_eq!(err.code(), error_codes::IO_ERROR);
    }
}
