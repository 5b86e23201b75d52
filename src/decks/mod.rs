//! Built-in benchmark decks
//!
//! Reference decks embedded in the binary at compile time, usable as
//! `picconf show --deck tunnel-ionisation-1d`.

use std::sync::LazyLock;

use crate::config::schema::Geometry;

// ============================================================================
// Types
// ============================================================================

/// A built-in deck embedded in the binary.
#[derive(Debug)]
pub struct BuiltinDeck {
    /// Unique identifier (kebab-case, e.g., "profiles-2d").
    pub name: &'static str,

    /// Short human-readable description.
    pub description: &'static str,

    /// Geometry the deck runs in.
    pub geometry: Geometry,

    /// Raw YAML content (embedded at compile time).
    pub yaml: &'static str,
}

// ============================================================================
// Registry
// ============================================================================

static BUILTIN_DECKS: LazyLock<Vec<BuiltinDeck>> = LazyLock::new(|| {
    vec![
        BuiltinDeck {
            name: "tunnel-ionisation-1d",
            description: "Tunnel ionisation of hydrogen and carbon by a 1D laser",
            geometry: Geometry::Cartesian1D,
            yaml: include_str!("../../decks/tunnel-ionisation-1d.yaml"),
        },
        BuiltinDeck {
            name: "profiles-2d",
            description: "One species per density profile shape, plus a thermal test species",
            geometry: Geometry::Cartesian2D,
            yaml: include_str!("../../decks/profiles-2d.yaml"),
        },
    ]
});

// ============================================================================
// Public API
// ============================================================================

/// Look up a deck by exact name.
#[must_use]
pub fn find_deck(name: &str) -> Option<&'static BuiltinDeck> {
    BUILTIN_DECKS.iter().find(|d| d.name == name)
}

/// List all decks, optionally filtered by geometry.
#[must_use]
pub fn list_decks(geometry: Option<Geometry>) -> Vec<&'static BuiltinDeck> {
    BUILTIN_DECKS
        .iter()
        .filter(|d| geometry.is_none_or(|g| d.geometry == g))
        .collect()
}

/// Suggest a similar deck name for typo correction.
///
/// Returns the closest match if its Damerau-Levenshtein distance is <= 3.
#[must_use]
pub fn suggest_deck(input: &str) -> Option<String> {
    BUILTIN_DECKS
        .iter()
        .map(|d| (d.name, strsim::damerau_levenshtein(input, d.name)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::config::loader::{ConfigLoader, LoaderOptions};

    #[test]
    fn all_builtin_decks_load() {
        for deck in list_decks(None) {
            let loader = ConfigLoader::new(LoaderOptions::default()).with_origin(deck.name);
            let result = loader.load_from_str(deck.yaml);
            assert!(
                result.is_ok(),
                "Built-in deck '{}' failed to load: {:?}",
                deck.name,
                result.err()
            );
            let config = result.unwrap().config;
            assert_eq!(config.run().geometry, deck.geometry, "{}", deck.name);
        }
    }

    #[test]
    fn builtin_decks_load_without_warnings() {
        for deck in list_decks(None) {
            let result = ConfigLoader::with_defaults()
                .load_from_str(deck.yaml)
                .unwrap();
            assert!(
                result.warnings.is_empty(),
                "Built-in deck '{}' has warnings: {:?}",
                deck.name,
                result.warnings
            );
        }
    }

    #[test]
    fn no_duplicate_deck_names() {
        let names: Vec<&str> = list_decks(None).iter().map(|d| d.name).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len(), "Duplicate deck names found");
    }

    #[test]
    fn tunnel_deck_resolves_ionization_targets() {
        let deck = find_deck("tunnel-ionisation-1d").unwrap();
        let config = ConfigLoader::with_defaults()
            .load_from_str(deck.yaml)
            .unwrap()
            .config;

        let names: Vec<&str> = config.species().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["hydrogen", "carbon", "electron"]);

        for ion in &config.species()[..2] {
            let target = config.ionization_target(ion).unwrap();
            assert_eq!(target.name, "electron");
        }
        assert_eq!(config.run().n_space, vec![40]);
        assert_eq!(config.lasers().len(), 1);
        assert_eq!(config.diagnostics().len(), 5);
    }

    #[test]
    fn profiles_deck_keeps_profiles_opaque() {
        let deck = find_deck("profiles-2d").unwrap();
        let config = ConfigLoader::with_defaults()
            .load_from_str(deck.yaml)
            .unwrap()
            .config;
        let gaussian = config.species_named("gaussian").unwrap();
        assert!(matches!(
            gaussian.density,
            crate::config::schema::DensitySpec::Number(crate::config::schema::Profile::Function(_))
        ));
        let eon = config.species_named("eon").unwrap();
        assert!(eon.is_test);
        assert_eq!(eon.temperature, Some([0.01, 0.01, 0.01]));
        assert_eq!(config.diagnostics()[0].every(), 1000);
    }

    #[test]
    fn find_deck_missing() {
        assert!(find_deck("nonexistent").is_none());
    }

    #[test]
    fn suggest_deck_close() {
        assert_eq!(
            suggest_deck("tunnel-ionization-1d"),
            Some("tunnel-ionisation-1d".to_string())
        );
        assert!(suggest_deck("xyzabc123").is_none());
    }

    #[test]
    fn list_filter_by_geometry() {
        let two_d = list_decks(Some(Geometry::Cartesian2D));
        assert_eq!(two_d.len(), 1);
        assert_eq!(two_d[0].name, "profiles-2d");
        assert!(list_decks(Some(Geometry::Cartesian3D)).is_empty());
    }
}
