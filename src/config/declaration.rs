//! Declaration blocks
//!
//! A deck is an ordered sequence of named blocks, each a single-key YAML
//! mapping whose key is the declaration name and whose value holds the
//! block's keyword fields:
//!
//! ```yaml
//! constants:
//!   l0: 2.0*pi
//! blocks:
//!   - Main: { geometry: 1Dcartesian, cell_length: [l0/4000], ... }
//!   - Species: { name: hydrogen, ... }
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

use crate::config::expr::Scalar;

// ============================================================================
// Block Kinds
// ============================================================================

/// Every declaration name the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Global run parameters
    Main,
    /// Particle species
    Species,
    /// Planar laser in a 1D geometry
    LaserPlanar1D,
    /// Planar laser in a 2D geometry
    LaserPlanar2D,
    /// Planar laser in a 3D geometry
    LaserPlanar3D,
    /// Scalar diagnostic
    DiagScalar,
    /// Field diagnostic
    DiagFields,
    /// Particle binning diagnostic
    DiagParticleBinning,
    /// Particle tracking diagnostic
    DiagTrackParticles,
}

impl BlockKind {
    /// All kinds, in documentation order.
    pub const ALL: &'static [Self] = &[
        Self::Main,
        Self::Species,
        Self::LaserPlanar1D,
        Self::LaserPlanar2D,
        Self::LaserPlanar3D,
        Self::DiagScalar,
        Self::DiagFields,
        Self::DiagParticleBinning,
        Self::DiagTrackParticles,
    ];

    /// Returns the declaration name as written in decks.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Main => "Main",
            Self::Species => "Species",
            Self::LaserPlanar1D => "LaserPlanar1D",
            Self::LaserPlanar2D => "LaserPlanar2D",
            Self::LaserPlanar3D => "LaserPlanar3D",
            Self::DiagScalar => "DiagScalar",
            Self::DiagFields => "DiagFields",
            Self::DiagParticleBinning => "DiagParticleBinning",
            Self::DiagTrackParticles => "DiagTrackParticles",
        }
    }

    /// Resolves a declaration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Suggests the closest declaration name for a typo.
    ///
    /// Returns the closest match if its Damerau-Levenshtein distance is <= 3.
    #[must_use]
    pub fn suggest(input: &str) -> Option<&'static str> {
        Self::ALL
            .iter()
            .map(|kind| (kind.name(), strsim::damerau_levenshtein(input, kind.name())))
            .filter(|(_, dist)| *dist <= 3)
            .min_by_key(|(_, dist)| *dist)
            .map(|(name, _)| name)
    }

    /// Returns `true` for the diagnostic kinds.
    #[must_use]
    pub const fn is_diagnostic(self) -> bool {
        matches!(
            self,
            Self::DiagScalar | Self::DiagFields | Self::DiagParticleBinning | Self::DiagTrackParticles
        )
    }

    /// Grid dimensions of a planar laser kind.
    #[must_use]
    pub const fn laser_dimensions(self) -> Option<usize> {
        match self {
            Self::LaserPlanar1D => Some(1),
            Self::LaserPlanar2D => Some(2),
            Self::LaserPlanar3D => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// One declaration block: a name plus its keyword fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Declaration name as written (`Main`, `Species`, ...)
    pub name: String,
    /// Keyword fields, in the order written
    pub fields: Value,
}

impl Declaration {
    /// Creates a declaration from a name and a YAML mapping of fields.
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Value) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Parses a declaration from inline YAML, e.g.
    /// `Declaration::from_yaml("DiagScalar", "every: 20")`.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if `fields` does not parse.
    pub fn from_yaml(name: impl Into<String>, fields: &str) -> Result<Self, serde_yaml::Error> {
        Ok(Self::new(name, serde_yaml::from_str(fields)?))
    }

    /// Returns the `name` field when it is a string.
    ///
    /// Used to label blocks (species) even when the rest of the block fails
    /// its schema.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }
}

/// A parsed deck document: constants and the declaration sequence.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    /// Named constants, evaluated in order
    pub constants: IndexMap<String, Scalar>,
    /// Declarations in the order written
    pub declarations: Vec<Declaration>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DeckDocument {
    #[serde(default)]
    constants: IndexMap<String, Scalar>,
    #[serde(default)]
    blocks: Vec<Value>,
}

impl Deck {
    /// Splits a YAML deck document into constants and declarations.
    ///
    /// # Errors
    ///
    /// Returns a message when the document is not a deck: not a mapping,
    /// unknown top-level keys, or a block entry that is not a single-key
    /// mapping with a string key.
    pub fn from_value(root: Value) -> Result<Self, String> {
        let document: DeckDocument =
            serde_yaml::from_value(root).map_err(|e| format!("invalid deck document: {e}"))?;

        let mut declarations = Vec::with_capacity(document.blocks.len());
        for (idx, entry) in document.blocks.into_iter().enumerate() {
            let Value::Mapping(map) = entry else {
                return Err(format!(
                    "blocks[{idx}] must be a mapping like `- Species: {{...}}`"
                ));
            };
            if map.len() != 1 {
                return Err(format!(
                    "blocks[{idx}] must have exactly one key (the declaration name), found {}",
                    map.len()
                ));
            }
            let Some((key, fields)) = map.into_iter().next() else {
                continue;
            };
            let Value::String(name) = key else {
                return Err(format!("blocks[{idx}] declaration name must be a string"));
            };
            // `- DiagScalar:` with nothing after it declares an empty block
            let fields = if fields.is_null() {
                Value::Mapping(serde_yaml::Mapping::new())
            } else {
                fields
            };
            declarations.push(Declaration::new(name, fields));
        }

        Ok(Self {
            constants: document.constants,
            declarations,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
