//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Community composition and run parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Per-participant battery storage parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Grid and peer-to-peer tariffs.
    #[serde(default)]
    pub prices: PriceConfig,
    /// Community structure constants.
    #[serde(default)]
    pub community: CommunityConfig,
    /// Raw data source selection.
    #[serde(default)]
    pub data: DataConfig,
}

/// Community composition and run parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of buildings in the community (5-100).
    pub community_size: usize,
    /// Season to simulate: `"sum"`, `"win"`, `"aut"`, or `"spr"`.
    pub season: Season,
    /// Percentage of buildings with rooftop PV (0-100).
    pub pv_percentage: u32,
    /// Percentage of buildings with shiftable smart devices (0-100).
    pub sd_percentage: u32,
    /// Whether every participant operates a battery.
    pub with_battery: bool,
    /// Master random seed for reproducibility.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            community_size: 10,
            season: Season::Summer,
            pv_percentage: 100,
            sd_percentage: 0,
            with_battery: false,
            seed: 42,
        }
    }
}

/// Per-participant battery storage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Usable capacity per participant (kWh).
    pub capacity_kwh: f64,
    /// Maximum fraction of capacity chargeable or dischargeable per hour.
    pub c_rate: f64,
    /// Fractional energy loss applied to every charge and discharge.
    pub conversion_loss: f64,
    /// Fraction of charge retained per hour (passive loss is `1 - rate`).
    pub retention_rate: f64,
    /// Minimum allowed charge level as a fraction of capacity.
    pub discharge_threshold: f64,
    /// Maximum allowed charge level as a fraction of capacity.
    pub charge_threshold: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 10.0,
            c_rate: 0.5,
            conversion_loss: 0.05,
            retention_rate: 0.999,
            discharge_threshold: 0.15,
            charge_threshold: 0.85,
        }
    }
}

/// Grid and peer-to-peer tariffs, in cents per kWh.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceConfig {
    /// Price paid for energy purchased from the grid.
    pub grid_buy: f64,
    /// Price received for energy fed into the grid.
    pub grid_sell: f64,
    /// Price for energy traded directly between members.
    pub p2p: f64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            grid_buy: 21.12,
            grid_sell: 4.6,
            p2p: 12.86,
        }
    }
}

/// Community structure constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommunityConfig {
    /// Number of raw households aggregated into one building participant.
    pub block_size: usize,
    /// Duration of one simulation timestep as a fraction of an hour.
    pub timestep_hours: f64,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            block_size: 6,
            timestep_hours: 1.0,
        }
    }
}

/// Raw data source selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Data source: `"synthetic"` or `"csv"`.
    pub source: String,
    /// Number of buildings generated by the synthetic source.
    pub synthetic_buildings: usize,
    /// Per-meter production matrix path (csv source only).
    pub production_csv: Option<String>,
    /// Per-household consumption matrix path (csv source only).
    pub consumption_csv: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: "synthetic".to_string(),
            synthetic_buildings: 100,
            production_csv: None,
            consumption_csv: None,
        }
    }
}

/// One of the four simulated seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Season {
    /// June-August.
    #[serde(rename = "sum")]
    Summer,
    /// December-February.
    #[serde(rename = "win")]
    Winter,
    /// September-November.
    #[serde(rename = "aut")]
    Autumn,
    /// March-May.
    #[serde(rename = "spr")]
    Spring,
}

impl Season {
    /// The season's calendar months in simulation order.
    ///
    /// Winter leads with December so the season forms a contiguous block
    /// when months are laid out on the reduced time axis.
    pub fn months(self) -> &'static [u32] {
        match self {
            Season::Winter => &[12, 1, 2],
            Season::Spring => &[3, 4, 5],
            Season::Summer => &[6, 7, 8],
            Season::Autumn => &[9, 10, 11],
        }
    }

    /// Whether the given calendar month belongs to this season.
    pub fn contains_month(self, month: u32) -> bool {
        self.months().contains(&month)
    }

    /// The short code used in config files and on the CLI.
    pub fn code(self) -> &'static str {
        match self {
            Season::Summer => "sum",
            Season::Winter => "win",
            Season::Autumn => "aut",
            Season::Spring => "spr",
        }
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Season::Summer),
            "win" => Ok(Season::Winter),
            "aut" => Ok(Season::Autumn),
            "spr" => Ok(Season::Spring),
            other => Err(format!(
                "unknown season \"{other}\", expected one of: sum, win, aut, spr"
            )),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field} — {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.community_size"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a 10-building summer community with
    /// full PV adoption and no storage or smart devices.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            battery: BatteryConfig::default(),
            prices: PriceConfig::default(),
            community: CommunityConfig::default(),
            data: DataConfig::default(),
        }
    }

    /// Returns the storage preset: winter community where every
    /// participant operates a battery.
    pub fn winter_storage() -> Self {
        Self {
            simulation: SimulationConfig {
                season: Season::Winter,
                with_battery: true,
                ..SimulationConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the flexible-demand preset: half the community owns PV and
    /// every building runs smart devices.
    pub fn flexible_demand() -> Self {
        Self {
            simulation: SimulationConfig {
                pv_percentage: 50,
                sd_percentage: 100,
                ..SimulationConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "winter_storage", "flexible_demand"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "winter_storage" => Ok(Self::winter_storage()),
            "flexible_demand" => Ok(Self::flexible_demand()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new(
                "scenario",
                format!("cannot read \"{}\": {e}", path.display()),
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. The engine
    /// refuses to start while this list is non-empty (fail-fast, no
    /// partial computation).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if !(5..=100).contains(&s.community_size) {
            errors.push(ConfigError::new(
                "simulation.community_size",
                "must be between 5 and 100",
            ));
        }
        if s.pv_percentage > 100 {
            errors.push(ConfigError::new(
                "simulation.pv_percentage",
                "must be between 0 and 100",
            ));
        }
        if s.sd_percentage > 100 {
            errors.push(ConfigError::new(
                "simulation.sd_percentage",
                "must be between 0 and 100",
            ));
        }

        let b = &self.battery;
        if b.capacity_kwh < 0.0 {
            errors.push(ConfigError::new(
                "battery.capacity_kwh",
                "must be non-negative",
            ));
        }
        if b.c_rate <= 0.0 {
            errors.push(ConfigError::new("battery.c_rate", "must be > 0"));
        }
        if !(0.0..1.0).contains(&b.conversion_loss) {
            errors.push(ConfigError::new(
                "battery.conversion_loss",
                "must be in [0, 1)",
            ));
        }
        if !(0.0..=1.0).contains(&b.retention_rate) {
            errors.push(ConfigError::new(
                "battery.retention_rate",
                "must be in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&b.discharge_threshold)
            || !(0.0..=1.0).contains(&b.charge_threshold)
            || b.discharge_threshold >= b.charge_threshold
        {
            errors.push(ConfigError::new(
                "battery.discharge_threshold",
                "thresholds must satisfy 0 <= discharge < charge <= 1",
            ));
        }

        let p = &self.prices;
        if p.grid_buy < 0.0 || p.grid_sell < 0.0 || p.p2p < 0.0 {
            errors.push(ConfigError::new("prices", "tariffs must be non-negative"));
        }

        let c = &self.community;
        if c.block_size == 0 {
            errors.push(ConfigError::new("community.block_size", "must be > 0"));
        }
        if c.timestep_hours <= 0.0 {
            errors.push(ConfigError::new("community.timestep_hours", "must be > 0"));
        }

        let d = &self.data;
        match d.source.as_str() {
            "synthetic" => {
                if d.synthetic_buildings < s.community_size {
                    errors.push(ConfigError::new(
                        "data.synthetic_buildings",
                        "must be >= simulation.community_size",
                    ));
                }
            }
            "csv" => {
                if d.production_csv.is_none() || d.consumption_csv.is_none() {
                    errors.push(ConfigError::new(
                        "data.production_csv",
                        "csv source requires production_csv and consumption_csv paths",
                    ));
                }
            }
            other => {
                errors.push(ConfigError::new(
                    "data.source",
                    format!("must be \"synthetic\" or \"csv\", got \"{other}\""),
                ));
            }
        }

        errors
    }
}
