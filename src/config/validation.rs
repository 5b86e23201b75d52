//! Deck validation
//!
//! Runs every finalize rule over the declared blocks and, when no error is
//! found, assembles the normalized [`SimulationConfig`]. Numeric fields are
//! evaluated here, so validation and normalization share one pass.
//!
//! Validation collects ALL issues (doesn't stop at first). Rules that depend
//! on a value that failed earlier (e.g. patch divisibility on a bad
//! `sim_length`) are skipped rather than reported twice.

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::config::declaration::BlockKind;
use crate::config::expr::{Scalar, Scope};
use crate::config::loader::{BlockBody, ConfigLimits, DeclaredBlock};
use crate::config::schema::{
    AxisSpec, BinningDiagBlock, DensitySpec, DensityValue, DiagnosticDef, EmBoundary, EngineFunction,
    FacePair,
    FieldsDiagBlock, Geometry, Ionization, IonizationModel, LaserBlock, LaserDef, MainBlock,
    ParticleBoundary, PositionInit, Profile, RunConfig, ScalarDiagBlock, SimulationConfig,
    SpeciesBlock, SpeciesDef, SpeciesRef, TrackDiagBlock,
};
use crate::error::{BlockRef, IssueKind, Severity, ValidationIssue};

/// Relative tolerance when checking `sim_length` against whole cells.
const LENGTH_TOLERANCE: f64 = 1e-6;

const FIELD_NAMES: &[&str] = &[
    "Ex", "Ey", "Ez", "Bx", "By", "Bz", "Bx_m", "By_m", "Bz_m", "Jx", "Jy", "Jz", "Rho",
];

const SPECIES_FIELD_PREFIXES: &[&str] = &["Jx_", "Jy_", "Jz_", "Rho_"];

const DEPOSITED_QUANTITIES: &[&str] = &[
    "density",
    "charge_density",
    "jx_density",
    "jy_density",
    "jz_density",
    "ekin_density",
    "p_density",
    "px_density",
    "py_density",
    "pz_density",
    "weight",
    "weight_charge",
    "weight_charge_vx",
    "weight_charge_vy",
    "weight_charge_vz",
    "weight_ekin",
    "weight_p",
    "weight_px",
    "weight_py",
    "weight_pz",
    "weight_chi",
];

const AXIS_QUANTITIES: &[&str] = &[
    "x", "y", "z", "moving_x", "px", "py", "pz", "p", "gamma", "ekin", "vx", "vy", "vz", "v",
    "vperp2", "charge", "chi",
];

const TRACK_ATTRIBUTES: &[&str] = &[
    "id", "x", "y", "z", "px", "py", "pz", "w", "q", "chi", "Ex", "Ey", "Ez", "Bx", "By", "Bz",
];

// ============================================================================
// Public API
// ============================================================================

/// Result of deck validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,

    /// The normalized configuration, present only when there are no errors.
    pub config: Option<SimulationConfig>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Deck validator.
///
/// Evaluates numeric fields in `scope` while checking them.
#[derive(Debug)]
pub struct Validator<'a> {
    scope: &'a Scope,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

/// What later rules need to know about the run.
struct Context {
    geometry: Option<Geometry>,
    em_boundaries: Option<Vec<FacePair<EmBoundary>>>,
    /// First declaration of each species name -> index among species blocks
    species: IndexMap<String, usize>,
}

impl<'a> Validator<'a> {
    /// Creates a validator evaluating expressions in `scope`.
    #[must_use]
    pub const fn new(scope: &'a Scope) -> Self {
        Self {
            scope,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Validates the declared blocks and returns the result.
    ///
    /// This method collects all errors and warnings rather than stopping
    /// at the first issue.
    pub fn validate(&mut self, blocks: &[DeclaredBlock], limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_limits(blocks, limits);

        let (run, geometry, em_boundaries) = self.validate_main_blocks(blocks);
        let species_names = self.collect_species_names(blocks);
        let ctx = Context {
            geometry,
            em_boundaries,
            species: species_names,
        };

        let mut species = Vec::new();
        let mut lasers = Vec::new();
        let mut diagnostics = Vec::new();

        for declared in blocks {
            let Some(body) = &declared.body else {
                continue;
            };
            let block = &declared.block;
            match body {
                BlockBody::Main(_) => {}
                BlockBody::Species(s) => species.extend(self.validate_species(s, block, &ctx)),
                BlockBody::Laser(l) => {
                    lasers.extend(self.validate_laser(l, declared.kind, block, &ctx));
                }
                BlockBody::Scalar(d) => diagnostics.extend(self.validate_scalar_diag(d, block)),
                BlockBody::Fields(d) => {
                    diagnostics.extend(self.validate_fields_diag(d, block, &ctx));
                }
                BlockBody::Binning(d) => {
                    diagnostics.extend(self.validate_binning_diag(d, block, &ctx));
                }
                BlockBody::Track(d) => {
                    diagnostics.extend(self.validate_track_diag(d, block, &ctx));
                }
            }
        }

        let config = match run {
            Some(run) if self.errors.is_empty() => {
                Some(SimulationConfig::new(run, species, lasers, diagnostics))
            }
            _ => None,
        };

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
            config,
        }
    }

    // ========================================================================
    // Limits
    // ========================================================================

    fn validate_limits(&mut self, blocks: &[DeclaredBlock], limits: &ConfigLimits) {
        if blocks.len() > limits.max_blocks {
            self.report(ValidationIssue::error(
                IssueKind::LimitExceeded,
                format!(
                    "deck declares {} blocks (limit: {})",
                    blocks.len(),
                    limits.max_blocks
                ),
            ));
        }

        let species = blocks.iter().filter(|b| b.kind == BlockKind::Species).count();
        if species > limits.max_species {
            self.report(ValidationIssue::error(
                IssueKind::LimitExceeded,
                format!(
                    "deck declares {species} species (limit: {})",
                    limits.max_species
                ),
            ));
        }

        let diagnostics = blocks.iter().filter(|b| b.kind.is_diagnostic()).count();
        if diagnostics > limits.max_diagnostics {
            self.report(ValidationIssue::error(
                IssueKind::LimitExceeded,
                format!(
                    "deck declares {diagnostics} diagnostics (limit: {})",
                    limits.max_diagnostics
                ),
            ));
        }
    }

    // ========================================================================
    // Main
    // ========================================================================

    /// Enforces exactly one `Main` and validates the first one found.
    fn validate_main_blocks(
        &mut self,
        blocks: &[DeclaredBlock],
    ) -> (
        Option<RunConfig>,
        Option<Geometry>,
        Option<Vec<FacePair<EmBoundary>>>,
    ) {
        let mains: Vec<&DeclaredBlock> = blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Main)
            .collect();

        let Some(first) = mains.first() else {
            self.report(ValidationIssue::error(
                IssueKind::MissingMainConfig,
                "deck has no Main block; exactly one is required",
            ));
            return (None, None, None);
        };

        for extra in &mains[1..] {
            self.report(
                ValidationIssue::error(
                    IssueKind::DuplicateMainConfig,
                    format!(
                        "second Main block; the first one is block #{}",
                        first.block.position
                    ),
                )
                .in_block(&extra.block),
            );
        }

        match &first.body {
            Some(BlockBody::Main(main)) => self.validate_main(main, &first.block),
            _ => (None, None, None),
        }
    }

    fn validate_main(
        &mut self,
        main: &MainBlock,
        block: &BlockRef,
    ) -> (
        Option<RunConfig>,
        Option<Geometry>,
        Option<Vec<FacePair<EmBoundary>>>,
    ) {
        let geometry = main.geometry;
        let errors_before = self.errors.len();

        let interpolation_order = match &main.interpolation_order {
            None => Some(2),
            Some(value) => self.count(value, block, "interpolation_order").and_then(|order| {
                if matches!(order, 2 | 4) {
                    u32::try_from(order).ok()
                } else {
                    self.error(
                        IssueKind::InvalidField,
                        block,
                        "interpolation_order",
                        format!("interpolation_order must be 2 or 4, got {order}"),
                    );
                    None
                }
            }),
        };

        let cell_length = self.per_dimension(&main.cell_length, geometry, block, "cell_length");
        let cell_length = cell_length.and_then(|v| self.all_positive(v, block, "cell_length"));
        let sim_length = self.per_dimension(&main.sim_length, geometry, block, "sim_length");
        let sim_length = sim_length.and_then(|v| self.all_positive(v, block, "sim_length"));
        let patches = self.patch_counts(&main.number_of_patches, geometry, block);
        let em_boundaries = self.em_boundaries(&main.em_boundary_conditions, geometry, block);

        let timestep = self.positive(&main.timestep, block, "timestep");
        let sim_time = self.positive(&main.sim_time, block, "sim_time");

        let grid = match (&cell_length, &sim_length) {
            (Some(cell), Some(sim)) => self.snap_to_cells(cell, sim, block),
            _ => None,
        };

        if let (Some((n_space, _)), Some(patches)) = (&grid, &patches) {
            for (axis, (&cells, &count)) in n_space.iter().zip(patches).enumerate() {
                if cells % count != 0 {
                    self.error(
                        IssueKind::InvalidPatchDecomposition,
                        block,
                        "number_of_patches",
                        format!(
                            "axis {axis} has {cells} cells, not divisible into {count} patches"
                        ),
                    );
                }
            }
        }

        if let (Some(cell), Some(dt)) = (&cell_length, timestep) {
            let limit = 1.0 / cell.iter().map(|dx| 1.0 / (dx * dx)).sum::<f64>().sqrt();
            if dt > limit {
                self.warn(
                    IssueKind::CflViolation,
                    block,
                    "timestep",
                    format!("timestep {dt} exceeds the CFL limit {limit}"),
                );
            }
        }

        let n_time = match (sim_time, timestep) {
            (Some(t), Some(dt)) => {
                let steps = (t / dt).round();
                let n_time = to_count(steps);
                if n_time.is_none() {
                    self.error(
                        IssueKind::InvalidField,
                        block,
                        "sim_time",
                        format!("sim_time {t} / timestep {dt} is {steps:e} steps, too many to count"),
                    );
                }
                n_time
            }
            _ => None,
        };

        let reference_angular_frequency_si =
            self.optional(main.reference_angular_frequency_si.as_ref(), |v, value| {
                v.positive(value, block, "reference_angular_frequency_SI")
            });
        let random_seed = self.optional(main.random_seed.as_ref(), |v, value| {
            v.count(value, block, "random_seed")
        });
        let print_every = self.optional(main.print_every.as_ref(), |v, value| {
            v.at_least_one(value, block, "print_every")
        });
        let time_fields_frozen = main.time_fields_frozen.as_ref().map_or(Some(0.0), |value| {
            self.non_negative(value, block, "time_fields_frozen")
        });

        let run = grid.and_then(|(n_space, sim_length)| {
            Some(RunConfig {
                geometry,
                interpolation_order: interpolation_order?,
                cell_length: cell_length.clone()?,
                sim_length,
                n_space,
                number_of_patches: patches?,
                timestep: timestep?,
                sim_time: sim_time?,
                n_time: n_time?,
                em_boundary_conditions: em_boundaries.clone()?,
                reference_angular_frequency_si: reference_angular_frequency_si?,
                random_seed: random_seed?,
                print_every: print_every?,
                time_fields_frozen: time_fields_frozen?,
            })
        });

        if run.is_none() && self.errors.len() == errors_before {
            self.report(
                ValidationIssue::error(
                    IssueKind::InvalidField,
                    "Main block could not be normalized into a run configuration",
                )
                .in_block(block),
            );
        }

        (run, Some(geometry), em_boundaries)
    }

    /// Computes cell counts and re-snaps box lengths to whole cells.
    fn snap_to_cells(
        &mut self,
        cell: &[f64],
        sim: &[f64],
        block: &BlockRef,
    ) -> Option<(Vec<u64>, Vec<f64>)> {
        let mut n_space = Vec::with_capacity(cell.len());
        let mut snapped = Vec::with_capacity(cell.len());
        let mut ok = true;

        for (axis, (&dx, &length)) in cell.iter().zip(sim).enumerate() {
            let ratio = (length / dx).round();
            let cells = match to_count(ratio) {
                Some(0) => {
                    self.error(
                        IssueKind::InvalidField,
                        block,
                        "sim_length",
                        format!("axis {axis} is shorter than one cell ({length} < {dx})"),
                    );
                    ok = false;
                    continue;
                }
                Some(cells) => cells,
                None => {
                    self.error(
                        IssueKind::InvalidField,
                        block,
                        "sim_length",
                        format!("axis {axis} needs {ratio:e} cells, too many to count"),
                    );
                    ok = false;
                    continue;
                }
            };
            #[allow(clippy::cast_precision_loss)]
            let exact = cells as f64 * dx;
            if (exact - length).abs() > LENGTH_TOLERANCE * length {
                self.warn(
                    IssueKind::SimLengthAdjusted,
                    block,
                    "sim_length",
                    format!(
                        "axis {axis} length {length} is not a multiple of the cell length; \
                         using {exact} ({cells} cells)"
                    ),
                );
            }
            n_space.push(cells);
            snapped.push(exact);
        }

        ok.then_some((n_space, snapped))
    }

    fn patch_counts(
        &mut self,
        values: &[Scalar],
        geometry: Geometry,
        block: &BlockRef,
    ) -> Option<Vec<u64>> {
        let field = "number_of_patches";
        if !self.check_dimensions(values.len(), geometry, block, field) {
            return None;
        }
        let mut counts = Vec::with_capacity(values.len());
        for value in values {
            let count = self.count(value, block, field)?;
            if !count.is_power_of_two() {
                self.error(
                    IssueKind::InvalidPatchDecomposition,
                    block,
                    field,
                    format!("patch count {count} is not a power of two"),
                );
                return None;
            }
            counts.push(count);
        }
        Some(counts)
    }

    fn em_boundaries(
        &mut self,
        entries: &[Vec<String>],
        geometry: Geometry,
        block: &BlockRef,
    ) -> Option<Vec<FacePair<EmBoundary>>> {
        let field = "EM_boundary_conditions";
        if !self.check_dimensions(entries.len(), geometry, block, field) {
            return None;
        }
        let mut pairs = Vec::with_capacity(entries.len());
        let mut ok = true;
        for (axis, entry) in entries.iter().enumerate() {
            let Some(pair) = self.face_pair::<EmBoundary>(entry, axis, block, field) else {
                ok = false;
                continue;
            };
            if (pair.min == EmBoundary::Periodic) != (pair.max == EmBoundary::Periodic) {
                self.error(
                    IssueKind::InvalidBoundaryCondition,
                    block,
                    field,
                    format!("axis {axis} is periodic on one face only"),
                );
                ok = false;
            }
            pairs.push(pair);
        }
        ok.then_some(pairs)
    }

    // ========================================================================
    // Species
    // ========================================================================

    /// Maps species names to their index, flagging duplicates.
    fn collect_species_names(&mut self, blocks: &[DeclaredBlock]) -> IndexMap<String, usize> {
        let mut names = IndexMap::new();
        let species = blocks.iter().filter(|b| b.kind == BlockKind::Species);
        for (index, declared) in species.enumerate() {
            let Some(name) = &declared.block.label else {
                continue;
            };
            if name.is_empty() {
                self.error(
                    IssueKind::InvalidField,
                    &declared.block,
                    "name",
                    "species name cannot be empty",
                );
                continue;
            }
            if let Some(&first) = names.get(name) {
                self.error(
                    IssueKind::DuplicateSpeciesName,
                    &declared.block,
                    "name",
                    format!("duplicate species name '{name}' (first declared as species #{first})"),
                );
            } else {
                names.insert(name.clone(), index);
            }
        }
        names
    }

    fn validate_species(
        &mut self,
        species: &SpeciesBlock,
        block: &BlockRef,
        ctx: &Context,
    ) -> Option<SpeciesDef> {
        let ionization = self.ionization(species, block, ctx);

        let position_initialization = match PositionInit::parse(&species.position_initialization) {
            PositionInit::Species(other) if other == species.name => {
                self.error(
                    IssueKind::InvalidField,
                    block,
                    "position_initialization",
                    "a species cannot take its positions from itself",
                );
                None
            }
            PositionInit::Species(other) => self
                .resolve_species(&other, ctx, block, "position_initialization")
                .map(|r| PositionInit::Species(r.name)),
            keyword => Some(keyword),
        };

        let particles_per_cell = self.count(&species.particles_per_cell, block, "particles_per_cell");
        let mass = self.non_negative(&species.mass, block, "mass");
        let charge = self.eval(&species.charge, block, "charge");
        let density = self.density(species, block);
        let boundary_conditions = self.particle_boundaries(&species.boundary_conditions, block, ctx);

        let temperature = self.optional(species.temperature.as_ref(), |v, values| {
            let t = v.vector3(values, block, "temperature")?;
            if t.iter().any(|x| *x < 0.0) {
                v.error(
                    IssueKind::InvalidField,
                    block,
                    "temperature",
                    "temperature cannot be negative",
                );
                return None;
            }
            Some(t)
        });
        let mean_velocity = self.optional(species.mean_velocity.as_ref(), |v, values| {
            v.vector3(values, block, "mean_velocity")
        });
        let time_frozen = species.time_frozen.as_ref().map_or(Some(0.0), |value| {
            self.non_negative(value, block, "time_frozen")
        });

        Some(SpeciesDef {
            name: species.name.clone(),
            ionization: ionization?,
            position_initialization: position_initialization?,
            momentum_initialization: species.momentum_initialization,
            particles_per_cell: particles_per_cell?,
            mass: mass?,
            charge: charge?,
            density: density?,
            boundary_conditions: boundary_conditions?,
            temperature: temperature?,
            mean_velocity: mean_velocity?,
            time_frozen: time_frozen?,
            is_test: species.is_test,
        })
    }

    /// Returns `Some(None)` for a species that does not ionize, `None` on error.
    fn ionization(
        &mut self,
        species: &SpeciesBlock,
        block: &BlockRef,
        ctx: &Context,
    ) -> Option<Option<Ionization>> {
        let model = match species.ionization_model {
            None | Some(IonizationModel::None) => {
                if species.ionization_electrons.is_some() {
                    self.warn(
                        IssueKind::InvalidField,
                        block,
                        "ionization_electrons",
                        "ionization_electrons is ignored without an ionization_model",
                    );
                }
                return Some(None);
            }
            Some(model) => model,
        };

        let atomic_number = match &species.atomic_number {
            None => {
                self.error(
                    IssueKind::MissingAtomicNumber,
                    block,
                    "atomic_number",
                    "ionization requires an atomic_number",
                );
                None
            }
            Some(value) => self.eval(value, block, "atomic_number").and_then(|z| {
                match to_count(z).and_then(|z| u32::try_from(z).ok()) {
                    Some(z) if z > 0 => Some(z),
                    _ => {
                        self.error(
                            IssueKind::MissingAtomicNumber,
                            block,
                            "atomic_number",
                            format!("atomic_number must be a positive integer, got {z}"),
                        );
                        None
                    }
                }
            }),
        };

        let electrons = match &species.ionization_electrons {
            None => {
                self.error(
                    IssueKind::InvalidField,
                    block,
                    "ionization_electrons",
                    "ionization requires ionization_electrons naming the electron species",
                );
                None
            }
            Some(target) => {
                if *target == species.name {
                    self.warn(
                        IssueKind::SelfIonizationReference,
                        block,
                        "ionization_electrons",
                        format!("species '{target}' receives its own ionization electrons"),
                    );
                }
                self.resolve_species(target, ctx, block, "ionization_electrons")
            }
        };

        Some(Some(Ionization {
            model,
            atomic_number: atomic_number?,
            electrons: electrons?,
        }))
    }

    fn density(&mut self, species: &SpeciesBlock, block: &BlockRef) -> Option<DensitySpec> {
        match (&species.nb_density, &species.charge_density) {
            (Some(value), None) => {
                let profile = self.profile(value, block, "nb_density")?;
                if matches!(profile, Profile::Uniform(n) if n < 0.0) {
                    self.error(
                        IssueKind::InvalidField,
                        block,
                        "nb_density",
                        "number density cannot be negative",
                    );
                    return None;
                }
                Some(DensitySpec::Number(profile))
            }
            (None, Some(value)) => self
                .profile(value, block, "charge_density")
                .map(DensitySpec::Charge),
            (Some(_), Some(_)) => {
                self.error(
                    IssueKind::AmbiguousChargeSpec,
                    block,
                    "charge_density",
                    "both nb_density and charge_density are set; declare exactly one",
                );
                None
            }
            (None, None) => {
                self.error(
                    IssueKind::AmbiguousChargeSpec,
                    block,
                    "nb_density",
                    "neither nb_density nor charge_density is set; declare exactly one",
                );
                None
            }
        }
    }

    fn profile(&mut self, value: &DensityValue, block: &BlockRef, field: &str) -> Option<Profile> {
        match value {
            DensityValue::Uniform(scalar) => self.eval(scalar, block, field).map(Profile::Uniform),
            DensityValue::Profile(function) => Some(Profile::Function(function.clone())),
        }
    }

    fn particle_boundaries(
        &mut self,
        entries: &[Vec<String>],
        block: &BlockRef,
        ctx: &Context,
    ) -> Option<Vec<FacePair<ParticleBoundary>>> {
        let field = "boundary_conditions";
        let geometry = ctx.geometry?;
        if !self.check_dimensions(entries.len(), geometry, block, field) {
            return None;
        }

        let mut pairs = Vec::with_capacity(entries.len());
        let mut ok = true;
        for (axis, entry) in entries.iter().enumerate() {
            let Some(pair) = self.face_pair::<ParticleBoundary>(entry, axis, block, field) else {
                ok = false;
                continue;
            };

            if geometry == Geometry::Cartesian3D
                && axis == 2
                && (pair.min == ParticleBoundary::Thermalize
                    || pair.max == ParticleBoundary::Thermalize)
            {
                self.error(
                    IssueKind::InvalidBoundaryCondition,
                    block,
                    field,
                    "thermalize is not available on the z axis",
                );
                ok = false;
            }

            if geometry == Geometry::AzimuthalModes
                && axis == 1
                && pair.max != ParticleBoundary::Remove
            {
                self.error(
                    IssueKind::InvalidBoundaryCondition,
                    block,
                    field,
                    "only remove is available on the radial max face in AMcylindrical",
                );
                ok = false;
            }

            if let Some(em) = ctx.em_boundaries.as_ref().and_then(|em| em.get(axis)) {
                let faces = [("min", em.min, pair.min), ("max", em.max, pair.max)];
                for (face, em_face, particle_face) in faces {
                    if em_face == EmBoundary::Periodic && particle_face != ParticleBoundary::Periodic
                    {
                        self.error(
                            IssueKind::BoundaryMismatch,
                            block,
                            field,
                            format!(
                                "axis {axis} {face} face: periodic EM boundary requires \
                                 periodic particle boundary"
                            ),
                        );
                        ok = false;
                    }
                }
            }

            pairs.push(pair);
        }
        ok.then_some(pairs)
    }

    fn resolve_species(
        &mut self,
        name: &str,
        ctx: &Context,
        block: &BlockRef,
        field: &str,
    ) -> Option<SpeciesRef> {
        if let Some(&index) = ctx.species.get(name) {
            return Some(SpeciesRef {
                name: name.to_string(),
                index,
            });
        }
        let hint = suggest(name, ctx.species.keys())
            .map(|s| format!(" (did you mean '{s}'?)"))
            .unwrap_or_default();
        self.error(
            IssueKind::UnknownSpeciesReference,
            block,
            field,
            format!("unknown species '{name}'{hint}"),
        );
        None
    }

    // ========================================================================
    // Lasers
    // ========================================================================

    fn validate_laser(
        &mut self,
        laser: &LaserBlock,
        kind: BlockKind,
        block: &BlockRef,
        ctx: &Context,
    ) -> Option<LaserDef> {
        let dimensions = kind.laser_dimensions()?;
        let mut ok = true;

        if let Some(geometry) = ctx.geometry {
            let compatible = matches!(
                (dimensions, geometry),
                (1, Geometry::Cartesian1D)
                    | (2, Geometry::Cartesian2D | Geometry::AzimuthalModes)
                    | (3, Geometry::Cartesian3D)
            );
            if !compatible {
                self.report(
                    ValidationIssue::error(
                        IssueKind::DimensionMismatch,
                        format!("{kind} cannot be used in a {geometry} geometry"),
                    )
                    .in_block(block),
                );
                ok = false;
            }
            if laser.box_side.axis() >= geometry.dimensions() {
                self.error(
                    IssueKind::InvalidBoxSide,
                    block,
                    "box_side",
                    format!("{geometry} has no {:?} face", laser.box_side),
                );
                ok = false;
            }
        }

        let a0 = self.non_negative(&laser.a0, block, "a0");
        let omega = laser
            .omega
            .as_ref()
            .map_or(Some(1.0), |v| self.positive(v, block, "omega"));
        let polarization_phi = self.or_default(laser.polarization_phi.as_ref(), block, "polarization_phi");
        let phase_offset = self.or_default(laser.phase_offset.as_ref(), block, "phase_offset");
        let ellipticity = self
            .or_default(laser.ellipticity.as_ref(), block, "ellipticity")
            .and_then(|e| {
                if e.abs() <= 1.0 {
                    Some(e)
                } else {
                    self.error(
                        IssueKind::InvalidField,
                        block,
                        "ellipticity",
                        format!("ellipticity must be within [-1, 1], got {e}"),
                    );
                    None
                }
            });

        let (waist, focus, incidence_angle) = if dimensions == 1 {
            let transverse = [
                ("waist", laser.waist.is_some()),
                ("focus", laser.focus.is_some()),
                ("incidence_angle", laser.incidence_angle.is_some()),
            ];
            for (field, present) in transverse {
                if present {
                    self.error(
                        IssueKind::InvalidField,
                        block,
                        field,
                        format!("{field} is not supported by {kind}"),
                    );
                    ok = false;
                }
            }
            (Some(None), Some(None), Some(0.0))
        } else {
            let waist = self.optional(laser.waist.as_ref(), |v, value| {
                v.positive(value, block, "waist")
            });
            let focus = self.optional(laser.focus.as_ref(), |v, values| {
                if values.len() == dimensions {
                    v.eval_all(values, block, "focus")
                } else {
                    v.error(
                        IssueKind::DimensionMismatch,
                        block,
                        "focus",
                        format!(
                            "focus has {} entries but {kind} needs {dimensions}",
                            values.len()
                        ),
                    );
                    None
                }
            });
            let incidence_angle =
                self.or_default(laser.incidence_angle.as_ref(), block, "incidence_angle");
            (waist, focus, incidence_angle)
        };

        if !ok {
            return None;
        }
        Some(LaserDef {
            dimensions,
            box_side: laser.box_side,
            a0: a0?,
            omega: omega?,
            polarization_phi: polarization_phi?,
            ellipticity: ellipticity?,
            phase_offset: phase_offset?,
            time_envelope: laser
                .time_envelope
                .clone()
                .unwrap_or_else(EngineFunction::tconstant),
            waist: waist?,
            focus: focus?,
            incidence_angle: incidence_angle?,
        })
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    fn validate_scalar_diag(
        &mut self,
        diag: &ScalarDiagBlock,
        block: &BlockRef,
    ) -> Option<DiagnosticDef> {
        let every = self.sampling_period(&diag.every, block);
        Some(DiagnosticDef::Scalar {
            every: every?,
            vars: diag.vars.clone(),
        })
    }

    fn validate_fields_diag(
        &mut self,
        diag: &FieldsDiagBlock,
        block: &BlockRef,
        ctx: &Context,
    ) -> Option<DiagnosticDef> {
        let every = self.sampling_period(&diag.every, block);
        let time_average = self.time_average(diag.time_average.as_ref(), block);
        let flush_every = self.optional(diag.flush_every.as_ref(), |v, value| {
            v.at_least_one(value, block, "flush_every")
        });

        let mut ok = true;
        // AM field names depend on the mode decomposition; the engine checks those
        if ctx.geometry.is_some_and(|g| g != Geometry::AzimuthalModes) {
            for name in &diag.fields {
                ok &= self.check_field_name(name, block, ctx);
            }
        }

        if !ok {
            return None;
        }
        Some(DiagnosticDef::Fields {
            every: every?,
            fields: diag.fields.clone(),
            time_average: time_average?,
            flush_every: flush_every?,
        })
    }

    fn check_field_name(&mut self, name: &str, block: &BlockRef, ctx: &Context) -> bool {
        if FIELD_NAMES.contains(&name) {
            return true;
        }
        let species = SPECIES_FIELD_PREFIXES
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix));
        match species {
            Some(species) => self
                .resolve_species(species, ctx, block, "fields")
                .is_some(),
            None => {
                self.error(
                    IssueKind::InvalidField,
                    block,
                    "fields",
                    format!("unknown field '{name}'"),
                );
                false
            }
        }
    }

    fn validate_binning_diag(
        &mut self,
        diag: &BinningDiagBlock,
        block: &BlockRef,
        ctx: &Context,
    ) -> Option<DiagnosticDef> {
        let every = self.sampling_period(&diag.every, block);
        let time_average = self.time_average(diag.time_average.as_ref(), block);
        let mut ok = true;

        if !DEPOSITED_QUANTITIES.contains(&diag.deposited_quantity.as_str()) {
            self.error(
                IssueKind::InvalidField,
                block,
                "deposited_quantity",
                format!("unknown deposited quantity '{}'", diag.deposited_quantity),
            );
            ok = false;
        }

        if diag.species.is_empty() {
            self.error(
                IssueKind::InvalidField,
                block,
                "species",
                "particle binning needs at least one species",
            );
            ok = false;
        }
        let mut species = Vec::with_capacity(diag.species.len());
        for name in &diag.species {
            match self.resolve_species(name, ctx, block, "species") {
                Some(r) => species.push(r),
                None => ok = false,
            }
        }

        let mut axes = Vec::with_capacity(diag.axes.len());
        for (idx, raw) in diag.axes.iter().enumerate() {
            match self.axis(raw, idx, block) {
                Some(axis) => axes.push(axis),
                None => ok = false,
            }
        }

        if !ok {
            return None;
        }
        Some(DiagnosticDef::ParticleBinning {
            every: every?,
            deposited_quantity: diag.deposited_quantity.clone(),
            time_average: time_average?,
            species,
            axes,
        })
    }

    /// Parses `[quantity, min, max, bins, flags...]`.
    fn axis(&mut self, raw: &[Value], idx: usize, block: &BlockRef) -> Option<AxisSpec> {
        let field = format!("axes[{idx}]");
        let [quantity, min, max, bins, flags @ ..] = raw else {
            self.error(
                IssueKind::InvalidAxisSpec,
                block,
                &field,
                format!(
                    "axis needs [quantity, min, max, bins, flags...], got {} entries",
                    raw.len()
                ),
            );
            return None;
        };

        let Some(quantity) = quantity.as_str() else {
            self.error(
                IssueKind::InvalidAxisSpec,
                block,
                &field,
                "axis quantity must be a string",
            );
            return None;
        };
        if !AXIS_QUANTITIES.contains(&quantity) {
            self.error(
                IssueKind::InvalidAxisSpec,
                block,
                &field,
                format!("unknown axis quantity '{quantity}'"),
            );
            return None;
        }

        let min = self.axis_number(min, block, &field)?;
        let max = self.axis_number(max, block, &field)?;
        let bins = self.axis_number(bins, block, &field)?;

        let mut logscale = false;
        let mut edge_inclusive = false;
        for flag in flags {
            match flag.as_str() {
                Some("logscale" | "log_scale") => logscale = true,
                Some("edge_inclusive") => edge_inclusive = true,
                _ => {
                    self.error(
                        IssueKind::InvalidAxisSpec,
                        block,
                        &field,
                        format!("unknown axis flag {flag:?}"),
                    );
                    return None;
                }
            }
        }

        let Some(bins) = to_count(bins).filter(|b| *b >= 1) else {
            self.error(
                IssueKind::InvalidAxisSpec,
                block,
                &field,
                format!("bin count must be a positive integer, got {bins}"),
            );
            return None;
        };
        if min >= max {
            self.error(
                IssueKind::InvalidAxisSpec,
                block,
                &field,
                format!("axis '{quantity}' needs min < max, got min={min} max={max}"),
            );
            return None;
        }
        if logscale && min <= 0.0 {
            self.error(
                IssueKind::InvalidAxisSpec,
                block,
                &field,
                format!("logscale axis '{quantity}' needs min > 0, got {min}"),
            );
            return None;
        }

        Some(AxisSpec {
            quantity: quantity.to_string(),
            min,
            max,
            bins,
            logscale,
            edge_inclusive,
        })
    }

    fn axis_number(&mut self, raw: &Value, block: &BlockRef, field: &str) -> Option<f64> {
        match serde_yaml::from_value::<Scalar>(raw.clone()) {
            Ok(scalar) => self.eval(&scalar, block, field),
            Err(_) => {
                self.error(
                    IssueKind::InvalidAxisSpec,
                    block,
                    field,
                    format!("expected a number or expression, got {raw:?}"),
                );
                None
            }
        }
    }

    fn validate_track_diag(
        &mut self,
        diag: &TrackDiagBlock,
        block: &BlockRef,
        ctx: &Context,
    ) -> Option<DiagnosticDef> {
        let every = self.sampling_period(&diag.every, block);
        let species = self.resolve_species(&diag.species, ctx, block, "species");
        let flush_every = self.optional(diag.flush_every.as_ref(), |v, value| {
            v.at_least_one(value, block, "flush_every")
        });

        let mut ok = true;
        for attribute in &diag.attributes {
            if !TRACK_ATTRIBUTES.contains(&attribute.as_str()) {
                self.error(
                    IssueKind::InvalidField,
                    block,
                    "attributes",
                    format!("unknown particle attribute '{attribute}'"),
                );
                ok = false;
            }
        }

        if !ok {
            return None;
        }
        Some(DiagnosticDef::TrackParticles {
            every: every?,
            species: species?,
            attributes: diag.attributes.clone(),
            flush_every: flush_every?,
        })
    }

    fn sampling_period(&mut self, value: &Scalar, block: &BlockRef) -> Option<u64> {
        let every = self.eval(value, block, "every")?;
        match to_count(every) {
            Some(n) if n >= 1 => Some(n),
            _ => {
                self.error(
                    IssueKind::InvalidSamplingPeriod,
                    block,
                    "every",
                    format!("every must be a positive integer, got {every}"),
                );
                None
            }
        }
    }

    fn time_average(&mut self, value: Option<&Scalar>, block: &BlockRef) -> Option<u64> {
        value.map_or(Some(1), |v| self.at_least_one(v, block, "time_average"))
    }

    // ========================================================================
    // Value Helpers
    // ========================================================================

    fn check_dimensions(
        &mut self,
        len: usize,
        geometry: Geometry,
        block: &BlockRef,
        field: &str,
    ) -> bool {
        let expected = geometry.dimensions();
        if len == expected {
            return true;
        }
        self.error(
            IssueKind::DimensionMismatch,
            block,
            field,
            format!("{field} has {len} entries but {geometry} needs {expected}"),
        );
        false
    }

    fn per_dimension(
        &mut self,
        values: &[Scalar],
        geometry: Geometry,
        block: &BlockRef,
        field: &str,
    ) -> Option<Vec<f64>> {
        if self.check_dimensions(values.len(), geometry, block, field) {
            self.eval_all(values, block, field)
        } else {
            None
        }
    }

    /// Parses `[both]` or `[min, max]` boundary keywords for one axis.
    fn face_pair<T>(
        &mut self,
        entry: &[String],
        axis: usize,
        block: &BlockRef,
        field: &str,
    ) -> Option<FacePair<T>>
    where
        T: std::str::FromStr<Err = String> + Copy,
    {
        let (min, max) = match entry {
            [both] => (both, both),
            [min, max] => (min, max),
            _ => {
                self.error(
                    IssueKind::InvalidBoundaryCondition,
                    block,
                    field,
                    format!("axis {axis} needs 1 or 2 conditions, got {}", entry.len()),
                );
                return None;
            }
        };
        let min = self.keyword::<T>(min, block, field);
        let max = self.keyword::<T>(max, block, field);
        Some(FacePair {
            min: min?,
            max: max?,
        })
    }

    fn keyword<T>(&mut self, value: &str, block: &BlockRef, field: &str) -> Option<T>
    where
        T: std::str::FromStr<Err = String>,
    {
        match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(message) => {
                self.error(IssueKind::InvalidBoundaryCondition, block, field, message);
                None
            }
        }
    }

    fn eval(&mut self, value: &Scalar, block: &BlockRef, field: &str) -> Option<f64> {
        match value.resolve(self.scope) {
            Ok(v) => Some(v),
            Err(e) => {
                self.error(
                    IssueKind::InvalidExpression,
                    block,
                    field,
                    format!("cannot evaluate '{value}': {e}"),
                );
                None
            }
        }
    }

    /// Evaluates every entry, reporting each failure.
    fn eval_all(&mut self, values: &[Scalar], block: &BlockRef, field: &str) -> Option<Vec<f64>> {
        let evaluated: Vec<Option<f64>> = values
            .iter()
            .enumerate()
            .map(|(idx, v)| self.eval(v, block, &format!("{field}[{idx}]")))
            .collect();
        evaluated.into_iter().collect()
    }

    fn all_positive(&mut self, values: Vec<f64>, block: &BlockRef, field: &str) -> Option<Vec<f64>> {
        if let Some(bad) = values.iter().find(|v| **v <= 0.0) {
            self.error(
                IssueKind::InvalidField,
                block,
                field,
                format!("{field} entries must be positive, got {bad}"),
            );
            return None;
        }
        Some(values)
    }

    fn positive(&mut self, value: &Scalar, block: &BlockRef, field: &str) -> Option<f64> {
        let v = self.eval(value, block, field)?;
        if v > 0.0 {
            Some(v)
        } else {
            self.error(
                IssueKind::InvalidField,
                block,
                field,
                format!("{field} must be positive, got {v}"),
            );
            None
        }
    }

    fn non_negative(&mut self, value: &Scalar, block: &BlockRef, field: &str) -> Option<f64> {
        let v = self.eval(value, block, field)?;
        if v >= 0.0 {
            Some(v)
        } else {
            self.error(
                IssueKind::InvalidField,
                block,
                field,
                format!("{field} cannot be negative, got {v}"),
            );
            None
        }
    }

    fn or_default(&mut self, value: Option<&Scalar>, block: &BlockRef, field: &str) -> Option<f64> {
        value.map_or(Some(0.0), |v| self.eval(v, block, field))
    }

    fn count(&mut self, value: &Scalar, block: &BlockRef, field: &str) -> Option<u64> {
        let v = self.eval(value, block, field)?;
        let count = to_count(v);
        if count.is_none() {
            self.error(
                IssueKind::InvalidField,
                block,
                field,
                format!("{field} must be a non-negative integer, got {v}"),
            );
        }
        count
    }

    fn at_least_one(&mut self, value: &Scalar, block: &BlockRef, field: &str) -> Option<u64> {
        let count = self.count(value, block, field)?;
        if count == 0 {
            self.error(
                IssueKind::InvalidField,
                block,
                field,
                format!("{field} must be at least 1"),
            );
            return None;
        }
        Some(count)
    }

    fn vector3(&mut self, values: &[Scalar], block: &BlockRef, field: &str) -> Option<[f64; 3]> {
        let Ok(values) = <&[Scalar; 3]>::try_from(values) else {
            self.error(
                IssueKind::InvalidField,
                block,
                field,
                format!("{field} needs 3 entries, got {}", values.len()),
            );
            return None;
        };
        let [x, y, z] = values;
        let x = self.eval(x, block, field);
        let y = self.eval(y, block, field);
        let z = self.eval(z, block, field);
        Some([x?, y?, z?])
    }

    /// Maps an optional field: `Some(None)` when absent, `None` when invalid.
    fn optional<S: ?Sized, T>(
        &mut self,
        value: Option<&S>,
        check: impl FnOnce(&mut Self, &S) -> Option<T>,
    ) -> Option<Option<T>> {
        match value {
            None => Some(None),
            Some(v) => check(self, v).map(Some),
        }
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    fn report(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    fn error(&mut self, kind: IssueKind, block: &BlockRef, field: &str, message: impl Into<String>) {
        self.report(
            ValidationIssue::error(kind, message)
                .in_block(block)
                .at_field(field),
        );
    }

    fn warn(&mut self, kind: IssueKind, block: &BlockRef, field: &str, message: impl Into<String>) {
        self.report(
            ValidationIssue::warning(kind, message)
                .in_block(block)
                .at_field(field),
        );
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Converts an evaluated value to a count when it is a non-negative integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> Option<u64> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    (value >= 0.0 && value.fract() == 0.0 && value <= MAX_EXACT).then(|| value as u64)
}

/// Suggests the closest declared species name for a typo.
fn suggest<'n>(input: &str, names: impl Iterator<Item = &'n String>) -> Option<&'n str> {
    names
        .map(|name| (name, strsim::damerau_levenshtein(input, name)))
        .filter(|(_, dist)| *dist <= 2)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name.as_str())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::declaration::Declaration;
    use crate::config::loader::{ConfigLoader, LoaderOptions};

    const MAIN_1D: &str = "geometry: 1Dcartesian\ncell_length: [0.1]\nsim_length: [1.6]\n\
        number_of_patches: [4]\ntimestep: 0.05\nsim_time: 1.0\n\
        EM_boundary_conditions: [[periodic]]\n";

    const ELECTRON: &str = "name: electron\nposition_initialization: regular\n\
        momentum_initialization: cold\nparticles_per_cell: 0\nmass: 1.0\ncharge: -1.0\n\
        charge_density: 0.0\nboundary_conditions: [[periodic, periodic]]\n";

    fn run(blocks: &[(&str, &str)]) -> ValidationResult {
        let mut loader = ConfigLoader::new(LoaderOptions::default());
        for (name, yaml) in blocks {
            loader.declare(Declaration::from_yaml(*name, yaml).unwrap());
        }
        loader.validate()
    }

    fn kinds(issues: &[ValidationIssue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    fn species(extra: &str) -> String {
        format!(
            "position_initialization: regular\nmomentum_initialization: cold\n\
             particles_per_cell: 10\nmass: 1836.0\ncharge: 0.0\n\
             boundary_conditions: [[periodic, periodic]]\n{extra}"
        )
    }

    #[test]
    fn test_validate_minimal_deck() {
        let result = run(&[("Main", MAIN_1D), ("Species", ELECTRON)]);
        assert!(result.is_valid(), "{:?}", result.errors);
        let config = result.config.unwrap();
        assert_eq!(config.run().n_space, vec![16]);
        assert_eq!(config.run().n_time, 20);
        assert_eq!(config.run().interpolation_order, 2);
        assert_eq!(config.species().len(), 1);
    }

    #[test]
    fn test_validate_missing_main() {
        let result = run(&[("Species", ELECTRON)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::MissingMainConfig]);
        assert!(result.config.is_none());
    }

    #[test]
    fn test_validate_duplicate_main() {
        let result = run(&[("Main", MAIN_1D), ("Main", MAIN_1D)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::DuplicateMainConfig]);
        assert_eq!(result.errors[0].block.as_ref().unwrap().position, 1);
    }

    #[test]
    fn test_validate_dimension_mismatch() {
        let main = MAIN_1D.replace("cell_length: [0.1]", "cell_length: [0.1, 0.1]");
        let result = run(&[("Main", &main)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::DimensionMismatch]);
        assert_eq!(result.errors[0].field.as_deref(), Some("cell_length"));
    }

    #[test]
    fn test_validate_em_boundary_dimension_mismatch() {
        let main = MAIN_1D.replace("[[periodic]]", "[[periodic], [periodic]]");
        let result = run(&[("Main", &main)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::DimensionMismatch]);
        assert_eq!(
            result.errors[0].field.as_deref(),
            Some("EM_boundary_conditions")
        );
    }

    #[test]
    fn test_validate_interpolation_order() {
        let main = format!("{MAIN_1D}interpolation_order: 3\n");
        let result = run(&[("Main", &main)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidField]);
    }

    #[test]
    fn test_validate_patch_decomposition() {
        let main = MAIN_1D.replace("number_of_patches: [4]", "number_of_patches: [3]");
        let result = run(&[("Main", &main)]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::InvalidPatchDecomposition]
        );

        // 16 cells do not split into 32 patches
        let main = MAIN_1D.replace("number_of_patches: [4]", "number_of_patches: [32]");
        let result = run(&[("Main", &main)]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::InvalidPatchDecomposition]
        );
    }

    #[test]
    fn test_validate_sim_length_snapped() {
        let main = MAIN_1D.replace("sim_length: [1.6]", "sim_length: [1.63]");
        let result = run(&[("Main", &main)]);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert_eq!(kinds(&result.warnings), vec![IssueKind::SimLengthAdjusted]);
        let run = result.config.unwrap().run().clone();
        assert_eq!(run.n_space, vec![16]);
        assert!((run.sim_length[0] - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_validate_cfl_warning() {
        let main = MAIN_1D.replace("timestep: 0.05", "timestep: 0.2");
        let result = run(&[("Main", &main)]);
        assert!(result.is_valid());
        assert_eq!(kinds(&result.warnings), vec![IssueKind::CflViolation]);
    }

    #[test]
    fn test_validate_one_sided_periodic() {
        let main = MAIN_1D.replace("[[periodic]]", "[[periodic, silver-muller]]");
        let result = run(&[("Main", &main)]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::InvalidBoundaryCondition]
        );
    }

    #[test]
    fn test_validate_duplicate_species_names() {
        let result = run(&[("Main", MAIN_1D), ("Species", ELECTRON), ("Species", ELECTRON)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::DuplicateSpeciesName]);
        assert_eq!(result.errors[0].block.as_ref().unwrap().position, 2);
    }

    #[test]
    fn test_validate_unknown_ionization_target() {
        let ion = species(
            "name: hydrogen\nionization_model: tunnel\nionization_electrons: electon\n\
             atomic_number: 1\nnb_density: 0.1\n",
        );
        let result = run(&[("Main", MAIN_1D), ("Species", &ion), ("Species", ELECTRON)]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::UnknownSpeciesReference]
        );
        assert!(result.errors[0].message.contains("did you mean 'electron'"));
    }

    #[test]
    fn test_validate_self_ionization_is_flagged_not_rejected() {
        let ion = species(
            "name: hydrogen\nionization_model: tunnel\nionization_electrons: hydrogen\n\
             atomic_number: 1\nnb_density: 0.1\n",
        );
        let result = run(&[("Main", MAIN_1D), ("Species", &ion)]);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert_eq!(
            kinds(&result.warnings),
            vec![IssueKind::SelfIonizationReference]
        );
    }

    #[test]
    fn test_validate_ambiguous_density() {
        let both = species("name: a\nnb_density: 1.0\ncharge_density: 0.0\n");
        let neither = species("name: b\n");
        let result = run(&[("Main", MAIN_1D), ("Species", &both), ("Species", &neither)]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::AmbiguousChargeSpec, IssueKind::AmbiguousChargeSpec]
        );
    }

    #[test]
    fn test_validate_zero_density_counts_as_set() {
        let zero = species("name: a\nnb_density: 0.0\n");
        let result = run(&[("Main", MAIN_1D), ("Species", &zero)]);
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn test_validate_missing_atomic_number() {
        let missing = species(
            "name: a\nionization_model: tunnel\nionization_electrons: electron\nnb_density: 1\n",
        );
        let zero = species(
            "name: b\nionization_model: tunnel\nionization_electrons: electron\n\
             atomic_number: 0\nnb_density: 1\n",
        );
        let result = run(&[
            ("Main", MAIN_1D),
            ("Species", &missing),
            ("Species", &zero),
            ("Species", ELECTRON),
        ]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::MissingAtomicNumber, IssueKind::MissingAtomicNumber]
        );
    }

    #[test]
    fn test_validate_model_none_needs_no_atomic_number() {
        let plain = species("name: a\nionization_model: none\nnb_density: 1\n");
        let result = run(&[("Main", MAIN_1D), ("Species", &plain)]);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.config.unwrap().species()[0].ionization.is_none());
    }

    #[test]
    fn test_validate_particle_boundary_checks() {
        let unknown = species("name: a\nnb_density: 1\n")
            .replace("[[periodic, periodic]]", "[[periodic, absorbing]]");
        let mismatch = species("name: b\nnb_density: 1\n")
            .replace("[[periodic, periodic]]", "[[remove, remove]]");
        let result = run(&[("Main", MAIN_1D), ("Species", &unknown), ("Species", &mismatch)]);
        assert_eq!(
            kinds(&result.errors),
            vec![
                IssueKind::InvalidBoundaryCondition,
                IssueKind::BoundaryMismatch,
                IssueKind::BoundaryMismatch,
            ]
        );
    }

    #[test]
    fn test_validate_position_initialization_reference() {
        let copy = species("name: ion\nnb_density: 1\n")
            .replace("position_initialization: regular", "position_initialization: electron");
        let dangling = species("name: ion2\nnb_density: 1\n")
            .replace("position_initialization: regular", "position_initialization: positron");
        let result = run(&[
            ("Main", MAIN_1D),
            ("Species", ELECTRON),
            ("Species", &copy),
            ("Species", &dangling),
        ]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::UnknownSpeciesReference]
        );
    }

    #[test]
    fn test_validate_sampling_periods() {
        let result = run(&[
            ("Main", MAIN_1D),
            ("DiagScalar", "every: 0"),
            ("DiagScalar", "every: 20.5"),
            ("DiagScalar", "every: -5"),
            ("DiagScalar", "every: 1000.0"),
        ]);
        assert_eq!(
            kinds(&result.errors),
            vec![
                IssueKind::InvalidSamplingPeriod,
                IssueKind::InvalidSamplingPeriod,
                IssueKind::InvalidSamplingPeriod,
            ]
        );
    }

    #[test]
    fn test_validate_axis_specs() {
        let binning = |axes: &str| {
            format!(
                "output: density\nevery: 20\nspecies: [electron]\naxes: [{axes}]\n"
            )
        };
        let good = binning("[charge, -0.5, 1.5, 2]");
        let reversed = binning("[charge, 1.5, -0.5, 2]");
        let no_bins = binning("[px, -1, 1, 0]");
        let short = binning("[px, -1, 1]");
        let log = binning("[ekin, 0, 10, 5, logscale]");
        let result = run(&[
            ("Main", MAIN_1D),
            ("Species", ELECTRON),
            ("DiagParticleBinning", &good),
            ("DiagParticleBinning", &reversed),
            ("DiagParticleBinning", &no_bins),
            ("DiagParticleBinning", &short),
            ("DiagParticleBinning", &log),
        ]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::InvalidAxisSpec; 4],
            "{:?}",
            result.errors
        );
    }

    #[test]
    fn test_validate_diagnostic_species_references() {
        let binning = "output: density\nevery: 20\nspecies: [carbon]\naxes: []\n";
        let track = "species: positron\nevery: 30\n";
        let result = run(&[
            ("Main", MAIN_1D),
            ("Species", ELECTRON),
            ("DiagParticleBinning", binning),
            ("DiagTrackParticles", track),
        ]);
        assert_eq!(
            kinds(&result.errors),
            vec![
                IssueKind::UnknownSpeciesReference,
                IssueKind::UnknownSpeciesReference
            ]
        );
    }

    #[test]
    fn test_validate_field_names() {
        let result = run(&[
            ("Main", MAIN_1D),
            ("Species", ELECTRON),
            ("DiagFields", "every: 20\nfields: [Ex, Rho_electron, Jx_ion, Ew]\n"),
        ]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::UnknownSpeciesReference, IssueKind::InvalidField]
        );
    }

    #[test]
    fn test_validate_time_average_default() {
        let result = run(&[("Main", MAIN_1D), ("DiagFields", "every: 20")]);
        let config = result.config.unwrap();
        assert!(matches!(
            config.diagnostics()[0],
            DiagnosticDef::Fields {
                time_average: 1,
                ..
            }
        ));

        let result = run(&[("Main", MAIN_1D), ("DiagFields", "every: 20\ntime_average: 0")]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidField]);
    }

    #[test]
    fn test_validate_laser_geometry() {
        let laser = "box_side: xmin\na0: 0.1\n";
        let result = run(&[("Main", MAIN_1D), ("LaserPlanar2D", laser)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::DimensionMismatch]);

        let result = run(&[("Main", MAIN_1D), ("LaserPlanar1D", "box_side: ymin\na0: 0.1\n")]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidBoxSide]);

        let result = run(&[
            ("Main", MAIN_1D),
            ("LaserPlanar1D", "box_side: xmin\na0: 0.1\nwaist: 3.0\n"),
        ]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidField]);
    }

    #[test]
    fn test_validate_laser_defaults() {
        let result = run(&[("Main", MAIN_1D), ("LaserPlanar1D", "box_side: xmax\na0: 0.1\n")]);
        let config = result.config.unwrap();
        let laser = &config.lasers()[0];
        assert!((laser.omega - 1.0).abs() < f64::EPSILON);
        assert_eq!(laser.time_envelope, EngineFunction::tconstant());
    }

    #[test]
    fn test_validate_expression_errors_are_reported() {
        let main = MAIN_1D.replace("timestep: 0.05", "timestep: \"0.05*dtt\"");
        let result = run(&[("Main", &main)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidExpression]);
        assert_eq!(result.errors[0].field.as_deref(), Some("timestep"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let ion = species("name: ion\nionization_model: tunnel\nionization_electrons: helium\n");
        let result = run(&[
            ("Species", &ion),
            ("DiagScalar", "every: 0"),
        ]);
        let found = kinds(&result.errors);
        assert!(found.contains(&IssueKind::MissingMainConfig));
        assert!(found.contains(&IssueKind::MissingAtomicNumber));
        assert!(found.contains(&IssueKind::UnknownSpeciesReference));
        assert!(found.contains(&IssueKind::AmbiguousChargeSpec));
        assert!(found.contains(&IssueKind::InvalidSamplingPeriod));
    }

    #[test]
    fn test_validate_limits() {
        let mut loader = ConfigLoader::new(LoaderOptions {
            limits: ConfigLimits {
                max_diagnostics: 1,
                ..ConfigLimits::default()
            },
            ..LoaderOptions::default()
        });
        loader.declare(Declaration::from_yaml("Main", MAIN_1D).unwrap());
        loader.declare(Declaration::from_yaml("DiagScalar", "every: 1").unwrap());
        loader.declare(Declaration::from_yaml("DiagScalar", "every: 2").unwrap());
        let result = loader.validate();
        assert_eq!(kinds(&result.errors), vec![IssueKind::LimitExceeded]);
    }

    #[test]
    fn test_validate_non_finite_literals() {
        let electron = ELECTRON.replace("mass: 1.0", "mass: .inf");
        let binning = "output: density\nevery: 20\nspecies: [electron]\naxes: [[x, .nan, 1.0, 4]]\n";
        let result = run(&[
            ("Main", MAIN_1D),
            ("Species", &electron),
            ("DiagParticleBinning", binning),
        ]);
        assert_eq!(
            kinds(&result.errors),
            vec![IssueKind::InvalidExpression, IssueKind::InvalidExpression],
            "{:?}",
            result.errors
        );
        assert_eq!(result.errors[0].field.as_deref(), Some("mass"));
        assert_eq!(result.errors[1].field.as_deref(), Some("axes[0]"));
        assert!(result.config.is_none());

        let main = MAIN_1D.replace("cell_length: [0.1]", "cell_length: [.nan]");
        let result = run(&[("Main", &main)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidExpression]);
        assert_eq!(result.errors[0].field.as_deref(), Some("cell_length[0]"));
    }

    #[test]
    fn test_validate_step_count_overflow() {
        let main = MAIN_1D.replace("sim_time: 1.0", "sim_time: 1.0e300");
        let result = run(&[("Main", &main)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidField]);
        assert_eq!(result.errors[0].field.as_deref(), Some("sim_time"));
        assert!(!result.is_valid());
        assert!(result.config.is_none());
    }

    #[test]
    fn test_validate_cell_count_overflow() {
        let main = MAIN_1D.replace("sim_length: [1.6]", "sim_length: [1.0e300]");
        let result = run(&[("Main", &main)]);
        assert_eq!(kinds(&result.errors), vec![IssueKind::InvalidField]);
        assert_eq!(result.errors[0].field.as_deref(), Some("sim_length"));
        assert!(result.errors[0].message.contains("too many"), "{}", result.errors[0]);
    }

    #[test]
    fn test_to_count() {
        assert_eq!(to_count(4.0), Some(4));
        assert_eq!(to_count(0.0), Some(0));
        assert_eq!(to_count(1.5), None);
        assert_eq!(to_count(-1.0), None);
        assert_eq!(to_count(f64::NAN), None);
        assert_eq!(to_count(1.0e300), None);
    }
}
