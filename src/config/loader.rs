//! Deck loader
//!
//! Loading runs in stages:
//! 1. Size check and YAML parsing
//! 2. Constants, evaluated in declaration order
//! 3. `declare`: block kind discovery and per-kind schema deserialization
//! 4. `finalize`: validation and normalization
//! 5. Freeze with `Arc`
//!
//! Stages 2 and 3 record issues instead of failing, so `finalize` reports
//! everything wrong with a deck at once.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::config::declaration::{BlockKind, Declaration, Deck};
use crate::config::expr::{Scalar, Scope};
use crate::config::schema::{
    BinningDiagBlock, FieldsDiagBlock, LaserBlock, MainBlock, ScalarDiagBlock, SimulationConfig,
    SpeciesBlock, TrackDiagBlock,
};
use crate::config::validation::{ValidationResult, Validator};
use crate::error::{BlockRef, ConfigError, IssueKind, Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Options for the deck loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Process rank, visible to expressions as `rank`.
    pub rank: u32,

    /// Limits for deck size.
    pub limits: ConfigLimits,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            rank: env_or("PICCONF_RANK", 0),
            limits: ConfigLimits::default(),
        }
    }
}

/// Limits for deck size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum number of declaration blocks.
    pub max_blocks: usize,

    /// Maximum number of species.
    pub max_species: usize,

    /// Maximum number of diagnostics.
    pub max_diagnostics: usize,

    /// Maximum deck file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_blocks: env_or("PICCONF_MAX_BLOCKS", 256),
            max_species: env_or("PICCONF_MAX_SPECIES", 64),
            max_diagnostics: env_or("PICCONF_MAX_DIAGNOSTICS", 128),
            max_config_size: env_or("PICCONF_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a deck.
#[derive(Debug)]
pub struct LoadResult {
    /// The validated, frozen configuration.
    pub config: Arc<SimulationConfig>,

    /// Warning-level issues found while loading.
    pub warnings: Vec<ValidationIssue>,
}

/// A declared block after schema deserialization.
#[derive(Debug, Clone)]
pub struct DeclaredBlock {
    /// Block kind
    pub kind: BlockKind,
    /// Where the block sits in the deck
    pub block: BlockRef,
    /// Typed fields, absent when the block failed its schema
    pub body: Option<BlockBody>,
}

/// Typed fields of a declared block.
#[derive(Debug, Clone)]
pub enum BlockBody {
    /// `Main`
    Main(MainBlock),
    /// `Species`
    Species(SpeciesBlock),
    /// `LaserPlanar1D/2D/3D`
    Laser(LaserBlock),
    /// `DiagScalar`
    Scalar(ScalarDiagBlock),
    /// `DiagFields`
    Fields(FieldsDiagBlock),
    /// `DiagParticleBinning`
    Binning(BinningDiagBlock),
    /// `DiagTrackParticles`
    Track(TrackDiagBlock),
}

/// Deck loader.
///
/// Collects declarations in arrival order, then validates and freezes them
/// in [`ConfigLoader::finalize`], which consumes the loader.
#[derive(Debug)]
pub struct ConfigLoader {
    options: LoaderOptions,
    origin: String,
    scope: Scope,
    position: usize,
    blocks: Vec<DeclaredBlock>,
    issues: Vec<ValidationIssue>,
}

impl ConfigLoader {
    /// Creates a new loader with the given options.
    #[must_use]
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            scope: Scope::new(options.rank),
            options,
            origin: "<declarations>".to_string(),
            position: 0,
            blocks: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Creates a new loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Sets the deck origin used in error messages.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Defines a named constant usable by later expressions.
    ///
    /// An invalid value is recorded as an `InvalidExpression` issue.
    pub fn define_constant(&mut self, name: &str, value: &Scalar) {
        let field = format!("constants.{name}");
        let defined = value
            .resolve(&self.scope)
            .and_then(|v| self.scope.define(name, v));
        if let Err(e) = defined {
            self.issues.push(
                ValidationIssue::error(
                    IssueKind::InvalidExpression,
                    format!("constant '{name}' = '{value}': {e}"),
                )
                .at_field(field),
            );
        }
    }

    /// Registers one declaration block.
    ///
    /// The block kind comes from the declaration name; the fields are
    /// checked against that kind's schema. Problems are recorded and
    /// reported by [`ConfigLoader::finalize`].
    pub fn declare(&mut self, declaration: Declaration) {
        let position = self.position;
        self.position += 1;

        let mut block = BlockRef::new(&declaration.name, position);
        if let Some(label) = declaration.label() {
            block = block.with_label(label);
        }

        let Some(kind) = BlockKind::from_name(&declaration.name) else {
            let hint = BlockKind::suggest(&declaration.name)
                .map(|s| format!(" (did you mean '{s}'?)"))
                .unwrap_or_default();
            tracing::debug!(name = %declaration.name, position, "unknown declaration");
            self.issues.push(
                ValidationIssue::error(
                    IssueKind::UnknownBlock,
                    format!("unknown declaration '{}'{hint}", declaration.name),
                )
                .in_block(&block),
            );
            return;
        };

        let body = match parse_body(kind, declaration.fields) {
            Ok(body) => Some(body),
            Err((field, message)) => {
                let mut issue = ValidationIssue::error(IssueKind::InvalidField, message)
                    .in_block(&block);
                if let Some(field) = field {
                    issue = issue.at_field(field);
                }
                self.issues.push(issue);
                None
            }
        };

        tracing::debug!(block = %block, valid = body.is_some(), "declared block");
        self.blocks.push(DeclaredBlock { kind, block, body });
    }

    /// Defines a parsed deck's constants and declares its blocks, in order.
    pub fn declare_deck(&mut self, deck: Deck) {
        for (name, value) in &deck.constants {
            self.define_constant(name, value);
        }
        for declaration in deck.declarations {
            self.declare(declaration);
        }
    }

    /// Runs every finalize rule without consuming the loader.
    ///
    /// Issues recorded while declaring come first. The configuration is
    /// present only when no error was found anywhere.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let mut validator = Validator::new(&self.scope);
        let mut result = validator.validate(&self.blocks, &self.options.limits);

        let (mut errors, mut warnings): (Vec<_>, Vec<_>) = self
            .issues
            .iter()
            .cloned()
            .partition(|issue| issue.severity == Severity::Error);
        errors.append(&mut result.errors);
        warnings.append(&mut result.warnings);

        if !errors.is_empty() {
            result.config = None;
        }
        result.errors = errors;
        result.warnings = warnings;
        result
    }

    /// Validates the declared blocks and freezes the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] carrying every issue (errors
    /// first, then warnings) when any error was found.
    pub fn finalize(self) -> Result<LoadResult, ConfigError> {
        let result = self.validate();

        for warning in &result.warnings {
            tracing::warn!(kind = %warning.kind, "{}", warning.message);
        }

        match result.config {
            Some(config) if result.errors.is_empty() => {
                tracing::info!(
                    origin = %self.origin,
                    species = config.species().len(),
                    lasers = config.lasers().len(),
                    diagnostics = config.diagnostics().len(),
                    "deck finalized"
                );
                Ok(LoadResult {
                    config: Arc::new(config),
                    warnings: result.warnings,
                })
            }
            _ => {
                tracing::debug!(
                    origin = %self.origin,
                    errors = result.errors.len(),
                    "deck rejected"
                );
                let mut issues = result.errors;
                issues.extend(result.warnings);
                Err(ConfigError::Validation {
                    origin: self.origin,
                    issues,
                })
            }
        }
    }

    /// Loads, validates and freezes a deck file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - YAML parsing fails or the document is not a deck
    /// - Validation fails
    pub fn load(self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        self.check_size(file_size)?;

        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => ConfigError::ParseError {
                origin: path.display().to_string(),
                line: None,
                message: "deck is not valid UTF-8".to_string(),
            },
            _ => ConfigError::MissingFile {
                path: path.to_path_buf(),
            },
        })?;

        tracing::debug!(file = %path.display(), bytes = raw.len(), "loading deck");
        self.with_origin(path.display().to_string())
            .load_from_str(&raw)
    }

    /// Loads, validates and freezes a deck from YAML text.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::load`].
    pub fn load_from_str(mut self, text: &str) -> Result<LoadResult, ConfigError> {
        self.check_size(text.len())?;

        // Handle UTF-8 BOM
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let root: Value = serde_yaml::from_str(text).map_err(|e| ConfigError::ParseError {
            origin: self.origin.clone(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;
        if root.is_null() {
            return Err(ConfigError::ParseError {
                origin: self.origin,
                line: None,
                message: "deck is empty".to_string(),
            });
        }

        let deck = Deck::from_value(root).map_err(|message| ConfigError::ParseError {
            origin: self.origin.clone(),
            line: None,
            message,
        })?;

        self.declare_deck(deck);
        self.finalize()
    }

    fn check_size(&self, size: usize) -> Result<(), ConfigError> {
        let limit = self.options.limits.max_config_size;
        if size > limit {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{size} bytes"),
                expected: format!("at most {limit} bytes"),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Deserializes a block's fields against its kind's schema.
///
/// On failure returns the offending field (when serde names one) and the
/// message.
fn parse_body(kind: BlockKind, fields: Value) -> Result<BlockBody, (Option<String>, String)> {
    if !fields.is_mapping() {
        return Err((None, format!("{kind} fields must be a mapping")));
    }
    Ok(match kind {
        BlockKind::Main => BlockBody::Main(typed(kind, fields)?),
        BlockKind::Species => BlockBody::Species(typed(kind, fields)?),
        BlockKind::LaserPlanar1D | BlockKind::LaserPlanar2D | BlockKind::LaserPlanar3D => {
            BlockBody::Laser(typed(kind, fields)?)
        }
        BlockKind::DiagScalar => BlockBody::Scalar(typed(kind, fields)?),
        BlockKind::DiagFields => BlockBody::Fields(typed(kind, fields)?),
        BlockKind::DiagParticleBinning => BlockBody::Binning(typed(kind, fields)?),
        BlockKind::DiagTrackParticles => BlockBody::Track(typed(kind, fields)?),
    })
}

fn typed<T: DeserializeOwned>(kind: BlockKind, fields: Value) -> Result<T, (Option<String>, String)> {
    serde_yaml::from_value(fields).map_err(|e| {
        let message = e.to_string();
        (quoted_field(&message), format!("invalid {kind} block: {message}"))
    })
}

/// Extracts the first backtick-quoted name from a serde message such as
/// "missing field `charge`".
fn quoted_field(message: &str) -> Option<String> {
    let start = message.find('`')? + 1;
    let len = message[start..].find('`')?;
    Some(message[start..start + len].to_string())
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DECK: &str = r"
constants:
  l0: 2.0*pi
blocks:
  - Main:
      geometry: 1Dcartesian
      cell_length: [l0/40]
      sim_length: [l0]
      number_of_patches: [4]
      timestep: 0.9*l0/40
      sim_time: 10*l0
      EM_boundary_conditions: [[periodic]]
      random_seed: rank
  - Species:
      name: electron
      position_initialization: regular
      momentum_initialization: cold
      particles_per_cell: 4
      mass: 1.0
      charge: -1.0
      charge_density: -1.0
      boundary_conditions: [[periodic]]
  - DiagScalar:
      every: 10
";

    #[test]
    fn test_load_from_str() {
        let result = ConfigLoader::with_defaults().load_from_str(DECK).unwrap();
        let run = result.config.run();
        assert_eq!(run.n_space, vec![40]);
        assert_eq!(run.n_time, 444);
        assert!((run.cell_length[0] - std::f64::consts::PI / 20.0).abs() < 1e-12);
        assert_eq!(result.config.species()[0].name, "electron");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_rank_constant() {
        let options = LoaderOptions {
            rank: 7,
            ..LoaderOptions::default()
        };
        let result = ConfigLoader::new(options).load_from_str(DECK).unwrap();
        assert_eq!(result.config.run().random_seed, Some(7));
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let deck = format!("\u{feff}{DECK}");
        assert!(ConfigLoader::with_defaults().load_from_str(&deck).is_ok());
    }

    #[test]
    fn test_empty_deck() {
        let err = ConfigLoader::with_defaults().load_from_str("").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_yaml_syntax_error_has_line() {
        let err = ConfigLoader::with_defaults()
            .load_from_str("blocks:\n  - Main: {geometry: [\n")
            .unwrap_err();
        let ConfigError::ParseError { line, .. } = err else {
            panic!("expected parse error, got {err:?}");
        };
        assert!(line.is_some());
    }

    #[test]
    fn test_unknown_block_suggests() {
        let mut loader = ConfigLoader::with_defaults();
        loader.declare(Declaration::from_yaml("Specie", "name: a").unwrap());
        let err = loader.finalize().unwrap_err();
        assert!(err.has_kind(IssueKind::UnknownBlock));
        assert!(err.has_kind(IssueKind::MissingMainConfig));
        let issue = &err.issues()[0];
        assert!(issue.message.contains("did you mean 'Species'"), "{issue}");
    }

    #[test]
    fn test_schema_errors_name_the_field() {
        let mut loader = ConfigLoader::with_defaults();
        loader.declare(Declaration::from_yaml("DiagScalar", "every: 10\nperiod: 3").unwrap());
        loader.declare(Declaration::from_yaml("DiagFields", "fields: [Ex]").unwrap());
        let result = loader.validate();
        let fields: Vec<_> = result
            .errors
            .iter()
            .filter(|i| i.kind == IssueKind::InvalidField)
            .map(|i| i.field.clone())
            .collect();
        assert_eq!(
            fields,
            vec![Some("period".to_string()), Some("every".to_string())]
        );
    }

    #[test]
    fn test_invalid_species_keeps_its_label() {
        let mut loader = ConfigLoader::with_defaults();
        loader.declare(Declaration::from_yaml("Species", "name: ion\nmass: 1").unwrap());
        let result = loader.validate();
        let block = result.errors[0].block.as_ref().unwrap();
        assert_eq!(block.title(), "Species(ion)");
        assert_eq!(block.position, 0);
    }

    #[test]
    fn test_bad_constant() {
        let mut loader = ConfigLoader::with_defaults();
        loader.define_constant("pi", &Scalar::Number(3.0));
        loader.define_constant("l0", &Scalar::Expr("2*tau".to_string()));
        let result = loader.validate();
        let fields: Vec<_> = result
            .errors
            .iter()
            .filter(|i| i.kind == IssueKind::InvalidExpression)
            .filter_map(|i| i.field.as_deref())
            .collect();
        assert_eq!(fields, ["constants.pi", "constants.l0"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigLoader::with_defaults()
            .load(Path::new("/nonexistent/deck.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_load_file_and_size_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DECK.as_bytes()).unwrap();

        let result = ConfigLoader::with_defaults().load(file.path()).unwrap();
        assert_eq!(result.config.species().len(), 1);

        let options = LoaderOptions {
            limits: ConfigLimits {
                max_config_size: 16,
                ..ConfigLimits::default()
            },
            ..LoaderOptions::default()
        };
        let err = ConfigLoader::new(options).load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validation_error_carries_origin() {
        let err = ConfigLoader::with_defaults()
            .with_origin("inline")
            .load_from_str("blocks: []")
            .unwrap_err();
        let ConfigError::Validation { origin, issues } = err else {
            panic!("expected validation error");
        };
        assert_eq!(origin, "inline");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_quoted_field() {
        assert_eq!(
            quoted_field("missing field `charge`"),
            Some("charge".to_string())
        );
        assert_eq!(quoted_field("invalid type: string"), None);
    }
}
