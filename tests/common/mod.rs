//! Shared test fixtures for integration tests.

use lec_sim::config::{ScenarioConfig, Season};
use lec_sim::data::CommunityData;

/// Default raw dataset: 20 synthetic buildings of 6 households, seed 42.
pub fn default_data() -> CommunityData {
    CommunityData::synthetic(20, 6, 42)
}

/// Scenario with the given knobs over the baseline defaults.
pub fn scenario(
    community_size: usize,
    season: Season,
    pv_percentage: u32,
    sd_percentage: u32,
    with_battery: bool,
) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.community_size = community_size;
    cfg.simulation.season = season;
    cfg.simulation.pv_percentage = pv_percentage;
    cfg.simulation.sd_percentage = sd_percentage;
    cfg.simulation.with_battery = with_battery;
    cfg
}
