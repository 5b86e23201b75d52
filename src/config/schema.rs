//! Deck schema types
//!
//! Two layers live here:
//!
//! - **Block schemas** (`MainBlock`, `SpeciesBlock`, ...): one fixed field
//!   set per declaration kind, deserialized from the block's keyword fields
//!   with unknown fields rejected. Numeric fields are still [`Scalar`]s.
//! - **Normalized types** (`RunConfig`, `SpeciesDef`, ...): the validated,
//!   fully evaluated configuration handed to the simulation engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::config::expr::Scalar;

// ============================================================================
// Shared Enums
// ============================================================================

/// Simulation geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Geometry {
    /// 1D cartesian
    #[serde(rename = "1Dcartesian", alias = "1d3v")]
    #[value(name = "1Dcartesian")]
    Cartesian1D,
    /// 2D cartesian
    #[serde(rename = "2Dcartesian", alias = "2d3v")]
    #[value(name = "2Dcartesian")]
    Cartesian2D,
    /// 3D cartesian
    #[serde(rename = "3Dcartesian", alias = "3d3v")]
    #[value(name = "3Dcartesian")]
    Cartesian3D,
    /// Azimuthal-mode cylindrical (x, r grid)
    #[serde(rename = "AMcylindrical")]
    #[value(name = "AMcylindrical")]
    AzimuthalModes,
}

impl Geometry {
    /// Number of grid dimensions every per-dimension sequence must match.
    #[must_use]
    pub const fn dimensions(self) -> usize {
        match self {
            Self::Cartesian1D => 1,
            Self::Cartesian2D | Self::AzimuthalModes => 2,
            Self::Cartesian3D => 3,
        }
    }

    /// Returns the name as written in decks.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cartesian1D => "1Dcartesian",
            Self::Cartesian2D => "2Dcartesian",
            Self::Cartesian3D => "3Dcartesian",
            Self::AzimuthalModes => "AMcylindrical",
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A face of the simulation box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxSide {
    /// Lower x face
    Xmin,
    /// Upper x face
    Xmax,
    /// Lower y face
    Ymin,
    /// Upper y face
    Ymax,
    /// Lower z face
    Zmin,
    /// Upper z face
    Zmax,
}

impl BoxSide {
    /// Index of the axis this face is normal to.
    #[must_use]
    pub const fn axis(self) -> usize {
        match self {
            Self::Xmin | Self::Xmax => 0,
            Self::Ymin | Self::Ymax => 1,
            Self::Zmin | Self::Zmax => 2,
        }
    }
}

/// Field boundary condition on one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmBoundary {
    /// Periodic
    Periodic,
    /// Silver-Muller absorbing/injecting
    SilverMuller,
    /// Perfect conductor
    Reflective,
    /// Buneman absorbing
    Buneman,
}

impl FromStr for EmBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "periodic" => Ok(Self::Periodic),
            "silver-muller" => Ok(Self::SilverMuller),
            "reflective" => Ok(Self::Reflective),
            "buneman" => Ok(Self::Buneman),
            other => Err(format!(
                "unknown EM boundary condition '{other}' \
                 (expected periodic, silver-muller, reflective or buneman)"
            )),
        }
    }
}

/// Particle boundary condition on one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleBoundary {
    /// Specular reflection
    Reflective,
    /// Particle is deleted
    Remove,
    /// Particle is stopped at the boundary
    Stop,
    /// Particle is re-emitted with a thermal momentum
    Thermalize,
    /// Periodic wrap
    Periodic,
}

impl FromStr for ParticleBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reflective" => Ok(Self::Reflective),
            "remove" => Ok(Self::Remove),
            "stop" => Ok(Self::Stop),
            "thermalize" => Ok(Self::Thermalize),
            "periodic" => Ok(Self::Periodic),
            other => Err(format!(
                "unknown particle boundary condition '{other}' \
                 (expected reflective, remove, stop, thermalize or periodic)"
            )),
        }
    }
}

/// Conditions on the lower and upper face of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FacePair<T> {
    /// Lower face
    pub min: T,
    /// Upper face
    pub max: T,
}

/// Ionization model of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IonizationModel {
    /// No ionization
    None,
    /// Field (tunnel) ionization
    Tunnel,
    /// User-supplied rates
    FromRate,
}

/// Momentum initialization of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MomentumInit {
    /// Zero momentum
    Cold,
    /// Relativistic thermal distribution
    #[serde(alias = "mj")]
    MaxwellJuettner,
    /// Flat distribution
    Rectangular,
}

/// Position initialization of a species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionInit {
    /// Evenly spaced in each cell
    Regular,
    /// Uniformly random in each cell
    Random,
    /// At the cell centers
    Centered,
    /// Copy the positions of another species
    Species(String),
}

impl PositionInit {
    /// Parses a keyword, falling back to a species reference.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "regular" => Self::Regular,
            "random" => Self::Random,
            "centered" => Self::Centered,
            other => Self::Species(other.to_string()),
        }
    }
}

// ============================================================================
// Engine Functions
// ============================================================================

/// An engine-evaluated function reference (time envelope, density profile).
///
/// Carried through verbatim; the loader never evaluates or interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineFunction(pub Value);

impl EngineFunction {
    /// The constant envelope used when a laser declares none.
    #[must_use]
    pub fn tconstant() -> Self {
        Self(Value::String("tconstant()".to_string()))
    }
}

/// A density field value as written: a number/expression or a profile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DensityValue {
    /// Uniform density
    Uniform(Scalar),
    /// Engine profile such as `{ profile: "gaussian(1., xfwhm=0.2)" }`
    Profile(EngineFunction),
}

// ============================================================================
// Block Schemas
// ============================================================================

/// Fields of a `Main` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MainBlock {
    /// Simulation geometry
    pub geometry: Geometry,

    /// Particle shape order (2 or 4), defaults to 2
    #[serde(default)]
    pub interpolation_order: Option<Scalar>,

    /// Cell length per dimension
    pub cell_length: Vec<Scalar>,

    /// Box length per dimension
    pub sim_length: Vec<Scalar>,

    /// Patch count per dimension
    #[serde(alias = "patch_number")]
    pub number_of_patches: Vec<Scalar>,

    /// Timestep
    pub timestep: Scalar,

    /// Total simulated time
    pub sim_time: Scalar,

    /// EM boundary conditions per dimension: `[both]` or `[min, max]`
    #[serde(rename = "EM_boundary_conditions", alias = "em_boundary_conditions")]
    pub em_boundary_conditions: Vec<Vec<String>>,

    /// Reference angular frequency in SI units
    #[serde(
        default,
        rename = "reference_angular_frequency_SI",
        alias = "reference_angular_frequency_si"
    )]
    pub reference_angular_frequency_si: Option<Scalar>,

    /// RNG seed, commonly `rank`
    #[serde(default)]
    pub random_seed: Option<Scalar>,

    /// Progress print period in timesteps
    #[serde(default)]
    pub print_every: Option<Scalar>,

    /// Time before which fields are not updated
    #[serde(default)]
    pub time_fields_frozen: Option<Scalar>,
}

/// Fields of a `Species` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesBlock {
    /// Unique species name
    pub name: String,

    /// Ionization model, absent means none
    #[serde(default)]
    pub ionization_model: Option<IonizationModel>,

    /// Species receiving the ionized electrons
    #[serde(default)]
    pub ionization_electrons: Option<String>,

    /// Atomic number, required by ionization
    #[serde(default)]
    pub atomic_number: Option<Scalar>,

    /// `regular`, `random`, `centered` or another species name
    pub position_initialization: String,

    /// Momentum initialization
    pub momentum_initialization: MomentumInit,

    /// Macro-particles per cell
    pub particles_per_cell: Scalar,

    /// Particle mass
    pub mass: Scalar,

    /// Particle charge
    pub charge: Scalar,

    /// Number density
    #[serde(default)]
    pub nb_density: Option<DensityValue>,

    /// Charge density
    #[serde(default)]
    pub charge_density: Option<DensityValue>,

    /// Particle boundary conditions per dimension: `[both]` or `[min, max]`
    pub boundary_conditions: Vec<Vec<String>>,

    /// Temperature per momentum axis
    #[serde(default)]
    pub temperature: Option<Vec<Scalar>>,

    /// Drift velocity per axis
    #[serde(default)]
    pub mean_velocity: Option<Vec<Scalar>>,

    /// Time before which particles do not move
    #[serde(default)]
    pub time_frozen: Option<Scalar>,

    /// Test particles do not deposit current
    #[serde(default)]
    pub is_test: bool,
}

/// Fields of a `LaserPlanar1D/2D/3D` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaserBlock {
    /// Injection face
    pub box_side: BoxSide,

    /// Normalized amplitude
    pub a0: Scalar,

    /// Angular frequency, defaults to 1
    #[serde(default)]
    pub omega: Option<Scalar>,

    /// Polarization angle, defaults to 0
    #[serde(default)]
    pub polarization_phi: Option<Scalar>,

    /// Ellipticity in [-1, 1], defaults to 0 (linear)
    #[serde(default)]
    pub ellipticity: Option<Scalar>,

    /// Phase offset, defaults to 0
    #[serde(default)]
    pub phase_offset: Option<Scalar>,

    /// Temporal envelope, defaults to `tconstant()`
    #[serde(default)]
    pub time_envelope: Option<EngineFunction>,

    /// Focal waist (2D/3D only)
    #[serde(default)]
    pub waist: Option<Scalar>,

    /// Focus position (2D/3D only)
    #[serde(default)]
    pub focus: Option<Vec<Scalar>>,

    /// Incidence angle (2D/3D only)
    #[serde(default)]
    pub incidence_angle: Option<Scalar>,
}

/// Fields of a `DiagScalar` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalarDiagBlock {
    /// Sampling period in timesteps
    pub every: Scalar,

    /// Scalars to output, empty means all
    #[serde(default)]
    pub vars: Vec<String>,
}

/// Fields of a `DiagFields` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldsDiagBlock {
    /// Sampling period in timesteps
    pub every: Scalar,

    /// Fields to output, empty means all
    #[serde(default)]
    pub fields: Vec<String>,

    /// Averaging window in timesteps, absent means no averaging
    #[serde(default)]
    pub time_average: Option<Scalar>,

    /// Output flush period
    #[serde(default)]
    pub flush_every: Option<Scalar>,
}

/// Fields of a `DiagParticleBinning` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinningDiagBlock {
    /// Quantity deposited in the bins
    #[serde(alias = "output")]
    pub deposited_quantity: String,

    /// Sampling period in timesteps
    pub every: Scalar,

    /// Averaging window in timesteps, absent means no averaging
    #[serde(default)]
    pub time_average: Option<Scalar>,

    /// Species binned together
    pub species: Vec<String>,

    /// Axes as `[quantity, min, max, bins, flags...]`
    pub axes: Vec<Vec<Value>>,
}

/// Fields of a `DiagTrackParticles` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackDiagBlock {
    /// Tracked species
    pub species: String,

    /// Sampling period in timesteps
    pub every: Scalar,

    /// Output flush period
    #[serde(default)]
    pub flush_every: Option<Scalar>,

    /// Particle attributes to output, empty means all
    #[serde(default)]
    pub attributes: Vec<String>,
}

// ============================================================================
// Normalized Configuration
// ============================================================================

/// Validated global run parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    /// Simulation geometry
    pub geometry: Geometry,
    /// Particle shape order
    pub interpolation_order: u32,
    /// Cell length per dimension
    pub cell_length: Vec<f64>,
    /// Box length per dimension, snapped to a whole number of cells
    pub sim_length: Vec<f64>,
    /// Cell count per dimension
    pub n_space: Vec<u64>,
    /// Patch count per dimension
    pub number_of_patches: Vec<u64>,
    /// Timestep
    pub timestep: f64,
    /// Total simulated time
    pub sim_time: f64,
    /// Timestep count
    pub n_time: u64,
    /// EM boundary conditions per dimension
    pub em_boundary_conditions: Vec<FacePair<EmBoundary>>,
    /// Reference angular frequency in SI units
    pub reference_angular_frequency_si: Option<f64>,
    /// RNG seed
    pub random_seed: Option<u64>,
    /// Progress print period
    pub print_every: Option<u64>,
    /// Time before which fields are not updated
    pub time_fields_frozen: f64,
}

/// A resolved reference to another species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesRef {
    /// Referenced species name
    pub name: String,
    /// Index into [`SimulationConfig::species`]
    pub index: usize,
}

/// Ionization settings of a species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ionization {
    /// Ionization model (never `None`)
    pub model: IonizationModel,
    /// Atomic number
    pub atomic_number: u32,
    /// Species receiving the electrons
    pub electrons: SpeciesRef,
}

/// A density profile after evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Uniform value
    Uniform(f64),
    /// Engine-evaluated profile
    Function(EngineFunction),
}

/// How a species' density is specified.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DensitySpec {
    /// Number density of particles
    Number(Profile),
    /// Charge density
    Charge(Profile),
}

/// A validated species.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesDef {
    /// Unique name
    pub name: String,
    /// Ionization settings, absent when the species does not ionize
    pub ionization: Option<Ionization>,
    /// Position initialization
    pub position_initialization: PositionInit,
    /// Momentum initialization
    pub momentum_initialization: MomentumInit,
    /// Macro-particles per cell
    pub particles_per_cell: u64,
    /// Particle mass
    pub mass: f64,
    /// Particle charge
    pub charge: f64,
    /// Density specification
    pub density: DensitySpec,
    /// Particle boundary conditions per dimension
    pub boundary_conditions: Vec<FacePair<ParticleBoundary>>,
    /// Temperature per momentum axis
    pub temperature: Option<[f64; 3]>,
    /// Drift velocity
    pub mean_velocity: Option<[f64; 3]>,
    /// Time before which particles do not move
    pub time_frozen: f64,
    /// Test species flag
    pub is_test: bool,
}

/// A validated planar laser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaserDef {
    /// Dimensions of the planar laser kind (1, 2 or 3)
    pub dimensions: usize,
    /// Injection face
    pub box_side: BoxSide,
    /// Normalized amplitude
    pub a0: f64,
    /// Angular frequency
    pub omega: f64,
    /// Polarization angle
    pub polarization_phi: f64,
    /// Ellipticity
    pub ellipticity: f64,
    /// Phase offset
    pub phase_offset: f64,
    /// Temporal envelope, carried verbatim
    pub time_envelope: EngineFunction,
    /// Focal waist
    pub waist: Option<f64>,
    /// Focus position
    pub focus: Option<Vec<f64>>,
    /// Incidence angle
    pub incidence_angle: f64,
}

/// One particle binning axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    /// Binned particle quantity
    pub quantity: String,
    /// Lower edge
    pub min: f64,
    /// Upper edge
    pub max: f64,
    /// Bin count
    pub bins: u64,
    /// Logarithmic bins
    pub logscale: bool,
    /// Out-of-range particles go to the edge bins
    pub edge_inclusive: bool,
}

/// A validated diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticDef {
    /// Scalar diagnostic
    Scalar {
        /// Sampling period
        every: u64,
        /// Scalars to output
        vars: Vec<String>,
    },
    /// Field diagnostic
    Fields {
        /// Sampling period
        every: u64,
        /// Fields to output
        fields: Vec<String>,
        /// Averaging window (1 means no averaging)
        time_average: u64,
        /// Flush period
        flush_every: Option<u64>,
    },
    /// Particle binning diagnostic
    ParticleBinning {
        /// Sampling period
        every: u64,
        /// Deposited quantity
        deposited_quantity: String,
        /// Averaging window (1 means no averaging)
        time_average: u64,
        /// Binned species
        species: Vec<SpeciesRef>,
        /// Binning axes
        axes: Vec<AxisSpec>,
    },
    /// Particle tracking diagnostic
    TrackParticles {
        /// Sampling period
        every: u64,
        /// Tracked species
        species: SpeciesRef,
        /// Output attributes
        attributes: Vec<String>,
        /// Flush period
        flush_every: Option<u64>,
    },
}

impl DiagnosticDef {
    /// Sampling period in timesteps.
    #[must_use]
    pub const fn every(&self) -> u64 {
        match self {
            Self::Scalar { every, .. }
            | Self::Fields { every, .. }
            | Self::ParticleBinning { every, .. }
            | Self::TrackParticles { every, .. } => *every,
        }
    }
}

/// The validated, immutable configuration handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    run: RunConfig,
    species: Vec<SpeciesDef>,
    lasers: Vec<LaserDef>,
    diagnostics: Vec<DiagnosticDef>,
}

impl SimulationConfig {
    /// Assembles a configuration from validated parts.
    #[must_use]
    pub(crate) const fn new(
        run: RunConfig,
        species: Vec<SpeciesDef>,
        lasers: Vec<LaserDef>,
        diagnostics: Vec<DiagnosticDef>,
    ) -> Self {
        Self {
            run,
            species,
            lasers,
            diagnostics,
        }
    }

    /// Global run parameters.
    #[must_use]
    pub const fn run(&self) -> &RunConfig {
        &self.run
    }

    /// Species in declaration order.
    #[must_use]
    pub fn species(&self) -> &[SpeciesDef] {
        &self.species
    }

    /// Lasers in declaration order.
    #[must_use]
    pub fn lasers(&self) -> &[LaserDef] {
        &self.lasers
    }

    /// Diagnostics in declaration order.
    #[must_use]
    pub fn diagnostics(&self) -> &[DiagnosticDef] {
        &self.diagnostics
    }

    /// Looks up a species by name.
    #[must_use]
    pub fn species_named(&self, name: &str) -> Option<&SpeciesDef> {
        self.species.iter().find(|s| s.name == name)
    }

    /// Resolves the species receiving `species`' ionization electrons.
    #[must_use]
    pub fn ionization_target(&self, species: &SpeciesDef) -> Option<&SpeciesDef> {
        species
            .ionization
            .as_ref()
            .and_then(|ion| self.species.get(ion.electrons.index))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_names_and_dimensions() {
        let g: Geometry = serde_yaml::from_str("1Dcartesian").unwrap();
        assert_eq!(g, Geometry::Cartesian1D);
        assert_eq!(g.dimensions(), 1);
        let g: Geometry = serde_yaml::from_str("AMcylindrical").unwrap();
        assert_eq!(g.dimensions(), 2);
        assert_eq!(g.to_string(), "AMcylindrical");
        assert!(serde_yaml::from_str::<Geometry>("4Dcartesian").is_err());
    }

    #[test]
    fn box_side_axes() {
        assert_eq!(BoxSide::Xmax.axis(), 0);
        assert_eq!(BoxSide::Ymin.axis(), 1);
        assert_eq!(BoxSide::Zmax.axis(), 2);
    }

    #[test]
    fn boundary_keywords_parse() {
        assert_eq!(
            "silver-muller".parse::<EmBoundary>(),
            Ok(EmBoundary::SilverMuller)
        );
        assert_eq!(
            "thermalize".parse::<ParticleBoundary>(),
            Ok(ParticleBoundary::Thermalize)
        );
        assert!("absorbing".parse::<ParticleBoundary>().is_err());
    }

    #[test]
    fn momentum_init_accepts_mj_alias() {
        let m: MomentumInit = serde_yaml::from_str("mj").unwrap();
        assert_eq!(m, MomentumInit::MaxwellJuettner);
        let m: MomentumInit = serde_yaml::from_str("maxwell-juettner").unwrap();
        assert_eq!(m, MomentumInit::MaxwellJuettner);
    }

    #[test]
    fn position_init_falls_back_to_species() {
        assert_eq!(PositionInit::parse("regular"), PositionInit::Regular);
        assert_eq!(
            PositionInit::parse("ion"),
            PositionInit::Species("ion".to_string())
        );
    }

    #[test]
    fn density_value_distinguishes_profiles() {
        let d: DensityValue = serde_yaml::from_str("0.1").unwrap();
        assert_eq!(d, DensityValue::Uniform(Scalar::Number(0.1)));
        let d: DensityValue = serde_yaml::from_str("\"n0/2\"").unwrap();
        assert_eq!(d, DensityValue::Uniform(Scalar::Expr("n0/2".to_string())));
        let d: DensityValue = serde_yaml::from_str("{profile: \"constant(1.)\"}").unwrap();
        assert!(matches!(d, DensityValue::Profile(_)));
    }

    #[test]
    fn species_block_rejects_unknown_fields() {
        let yaml = "name: e\nposition_initialization: regular\nmomentum_initialization: cold\n\
                    particles_per_cell: 1\nmass: 1\ncharge: -1\nboundary_conditions: [[periodic]]\n\
                    colour: blue\n";
        let err = serde_yaml::from_str::<SpeciesBlock>(yaml).unwrap_err();
        assert!(err.to_string().contains("colour"), "{err}");
    }

    #[test]
    fn main_block_accepts_patch_number_alias() {
        let yaml = "geometry: 1Dcartesian\ncell_length: [0.1]\nsim_length: [1.0]\n\
                    patch_number: [2]\ntimestep: 0.05\nsim_time: 1.0\n\
                    EM_boundary_conditions: [[periodic]]\n";
        let block: MainBlock = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(block.number_of_patches, vec![Scalar::Number(2.0)]);
    }

    #[test]
    fn diagnostic_every_accessor() {
        let diag = DiagnosticDef::Scalar {
            every: 20,
            vars: Vec::new(),
        };
        assert_eq!(diag.every(), 20);
    }
}
