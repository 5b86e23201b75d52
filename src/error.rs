//! Error types for `picconf`
//!
//! Exit codes, the top-level error hierarchy, and the structured
//! validation issues reported by the deck loader.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `picconf` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `picconf` operations.
///
/// Aggregates the domain errors and maps each to an exit code.
#[derive(Debug, Error)]
pub enum PicConfError {
    /// Deck loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// One or more decks failed `picconf validate`
    #[error("{failed} of {total} deck(s) failed validation")]
    DecksInvalid {
        /// Number of failing decks
        failed: usize,
        /// Number of decks checked
        total: usize,
    },

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PicConfError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::DecksInvalid { .. } | Self::Json(_) | Self::Yaml(_) => {
                ExitCode::CONFIG_ERROR
            }
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Deck loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {origin}: {message}")]
    ParseError {
        /// File path or other description of where the deck came from
        origin: String,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Deck validation failed
    #[error("validation failed for {origin}: {} issue(s)", .issues.len())]
    Validation {
        /// File path or other description of where the deck came from
        origin: String,
        /// Every issue found in the finalize pass, errors first
        issues: Vec<ValidationIssue>,
    },

    /// Referenced deck file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// A loader-level value is out of range
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the offending value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

impl ConfigError {
    /// Returns the validation issues carried by this error, if any.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Validation { issues, .. } => issues,
            _ => &[],
        }
    }

    /// Returns `true` if any carried issue has the given kind.
    #[must_use]
    pub fn has_kind(&self, kind: IssueKind) -> bool {
        self.issues().iter().any(|issue| issue.kind == kind)
    }
}

// ============================================================================
// Validation Types
// ============================================================================

/// The rule a validation issue violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    /// No `Main` block was declared
    MissingMainConfig,
    /// More than one `Main` block was declared
    DuplicateMainConfig,
    /// A per-dimension sequence does not match the geometry
    DimensionMismatch,
    /// Two species share a name
    DuplicateSpeciesName,
    /// A species name reference points nowhere
    UnknownSpeciesReference,
    /// Density given by both or neither of `nb_density` / `charge_density`
    AmbiguousChargeSpec,
    /// Ionization model without a positive atomic number
    MissingAtomicNumber,
    /// Diagnostic `every` is not a positive integer
    InvalidSamplingPeriod,
    /// Particle binning axis with `min >= max` or no bins
    InvalidAxisSpec,
    /// Declaration name is not a known block kind
    UnknownBlock,
    /// A field is missing, unknown, mistyped or out of range
    InvalidField,
    /// A numeric expression failed to evaluate
    InvalidExpression,
    /// Unknown or disallowed boundary condition keyword
    InvalidBoundaryCondition,
    /// Periodic EM face paired with a non-periodic particle face
    BoundaryMismatch,
    /// Patch counts do not decompose the grid
    InvalidPatchDecomposition,
    /// Laser injected through a face the geometry does not have
    InvalidBoxSide,
    /// A configured size limit was exceeded
    LimitExceeded,
    /// Species names itself as its ionization electron target
    SelfIonizationReference,
    /// Timestep above the Courant limit
    CflViolation,
    /// `sim_length` re-snapped to a whole number of cells
    SimLengthAdjusted,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identifies the declaration block an issue belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRef {
    /// Declaration name as written (`Species`, `DiagFields`, ...)
    pub name: String,
    /// Distinguishing label, e.g. the species name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Zero-based position in the declaration sequence
    pub position: usize,
}

impl BlockRef {
    /// Creates a reference to the block at `position`.
    #[must_use]
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            label: None,
            position,
        }
    }

    /// Attaches a distinguishing label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the block title, e.g. `Species(hydrogen)` or `Main`.
    #[must_use]
    pub fn title(&self) -> String {
        match &self.label {
            Some(label) => format!("{}({label})", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (block #{})", self.title(), self.position)
    }
}

/// A single validation issue found while finalizing a deck.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// Rule that was violated
    pub kind: IssueKind,
    /// Offending block, absent for deck-wide issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockRef>,
    /// Offending field, where applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Description of the issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl ValidationIssue {
    /// Creates an error-level issue.
    #[must_use]
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            block: None,
            field: None,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Creates a warning-level issue.
    #[must_use]
    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(kind, message)
        }
    }

    /// Attaches the offending block.
    #[must_use]
    pub fn in_block(mut self, block: &BlockRef) -> Self {
        self.block = Some(block.clone());
        self
    }

    /// Attaches the offending field.
    #[must_use]
    pub fn at_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{prefix}[{}]: {}", self.kind, self.message)?;
        match (&self.block, &self.field) {
            (Some(block), Some(field)) => write!(f, " at {block}, field '{field}'"),
            (Some(block), None) => write!(f, " at {block}"),
            (None, Some(field)) => write!(f, " at field '{field}'"),
            (None, None) => Ok(()),
        }
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Validation failure that prevents the deck from being used
    Error,
    /// Potential issue that does not prevent loading
    Warning,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `picconf` operations.
pub type Result<T> = std::result::Result<T, PicConfError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: PicConfError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_usage_error_exit_code() {
        let err = PicConfError::Usage("no deck given".to_string());
        assert_eq!(err.exit_code(), ExitCode::USAGE_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: PicConfError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_block_ref_title() {
        let block = BlockRef::new("Species", 2).with_label("hydrogen");
        assert_eq!(block.title(), "Species(hydrogen)");
        assert_eq!(block.to_string(), "Species(hydrogen) (block #2)");
        assert_eq!(BlockRef::new("Main", 0).title(), "Main");
    }

    #[test]
    fn test_validation_issue_display() {
        let block = BlockRef::new("Species", 1).with_label("hydrogen");
        let issue = ValidationIssue::error(
            IssueKind::UnknownSpeciesReference,
            "unknown species 'helium'",
        )
        .in_block(&block)
        .at_field("ionization_electrons");
        assert_eq!(
            issue.to_string(),
            "error[UnknownSpeciesReference]: unknown species 'helium' \
             at Species(hydrogen) (block #1), field 'ionization_electrons'"
        );
    }

    #[test]
    fn test_validation_issue_warning_display() {
        let issue = ValidationIssue::warning(IssueKind::CflViolation, "timestep too large");
        assert_eq!(
            issue.to_string(),
            "warning[CflViolation]: timestep too large"
        );
    }

    #[test]
    fn test_config_error_has_kind() {
        let err = ConfigError::Validation {
            origin: "deck.yaml".to_string(),
            issues: vec![ValidationIssue::error(IssueKind::MissingMainConfig, "no Main")],
        };
        assert!(err.has_kind(IssueKind::MissingMainConfig));
        assert!(!err.has_kind(IssueKind::DuplicateMainConfig));
        assert!(err.to_string().contains("1 issue(s)"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ParseError {
            origin: "deck.yaml".to_string(),
            line: Some(42),
            message: "unexpected token".to_string(),
        };
        assert!(err.to_string().contains("deck.yaml"));
        assert!(err.to_string().contains("unexpected token"));
    }
}
