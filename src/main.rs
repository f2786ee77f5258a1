//! LEC simulator entry point — CLI wiring and config-driven engine construction.

use std::path::Path;
use std::process;

use lec_sim::config::ScenarioConfig;
use lec_sim::data::CommunityData;
use lec_sim::io::export::{export_profiles_csv, export_result_json};
use lec_sim::sim::SimulationEngine;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    size_override: Option<usize>,
    season_override: Option<String>,
    pv_override: Option<u32>,
    sd_override: Option<u32>,
    with_battery: bool,
    result_out: Option<String>,
    profiles_out: Option<String>,
}

fn print_help() {
    eprintln!("lec-sim — Local Energy Community simulator");
    eprintln!();
    eprintln!("Usage: lec-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>       Load scenario from TOML config file");
    eprintln!("  --preset <name>         Use a built-in preset (baseline)");
    eprintln!("  --seed <u64>            Override random seed");
    eprintln!("  --size <n>              Override community size (5-100)");
    eprintln!("  --season <code>         Override season (sum, win, aut, spr)");
    eprintln!("  --pv <pct>              Override PV adoption percentage");
    eprintln!("  --sd <pct>              Override smart-device percentage");
    eprintln!("  --battery               Enable per-participant batteries");
    eprintln!("  --result-out <path>     Export the full result to JSON");
    eprintln!("  --profiles-out <path>   Export daily profiles to CSV");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {flag} requires an argument");
        process::exit(1);
    }
    args[*i].clone()
}

fn parse_or_exit<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    match value.parse::<T>() {
        Ok(parsed) => parsed,
        Err(_) => {
            eprintln!("error: {flag} value \"{value}\" is invalid");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        size_override: None,
        season_override: None,
        pv_override: None,
        sd_override: None,
        with_battery: false,
        result_out: None,
        profiles_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => cli.scenario_path = Some(take_value(&args, &mut i, "--scenario")),
            "--preset" => cli.preset = Some(take_value(&args, &mut i, "--preset")),
            "--seed" => {
                let v = take_value(&args, &mut i, "--seed");
                cli.seed_override = Some(parse_or_exit(&v, "--seed"));
            }
            "--size" => {
                let v = take_value(&args, &mut i, "--size");
                cli.size_override = Some(parse_or_exit(&v, "--size"));
            }
            "--season" => cli.season_override = Some(take_value(&args, &mut i, "--season")),
            "--pv" => {
                let v = take_value(&args, &mut i, "--pv");
                cli.pv_override = Some(parse_or_exit(&v, "--pv"));
            }
            "--sd" => {
                let v = take_value(&args, &mut i, "--sd");
                cli.sd_override = Some(parse_or_exit(&v, "--sd"));
            }
            "--battery" => cli.with_battery = true,
            "--result-out" => cli.result_out = Some(take_value(&args, &mut i, "--result-out")),
            "--profiles-out" => cli.profiles_out = Some(take_value(&args, &mut i, "--profiles-out")),
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Loads the raw dataset named by the scenario's data section.
fn load_data(scenario: &ScenarioConfig) -> CommunityData {
    let d = &scenario.data;
    match d.source.as_str() {
        "csv" => {
            // validate() already guaranteed both paths are present
            let production = d.production_csv.as_deref().unwrap_or_default();
            let consumption = d.consumption_csv.as_deref().unwrap_or_default();
            match CommunityData::from_csv_files(Path::new(production), Path::new(consumption)) {
                Ok(data) => data,
                Err(e) => {
                    eprintln!("error: {e}");
                    process::exit(1);
                }
            }
        }
        _ => CommunityData::synthetic(
            d.synthetic_buildings,
            scenario.community.block_size,
            scenario.simulation.seed,
        ),
    }
}

fn main() {
    let cli = parse_args();

    if let Err(e) = lec_sim::log::init() {
        eprintln!("error: failed to initialize logging: {e}");
        process::exit(1);
    }

    // Load config: --scenario takes priority, then --preset, then baseline default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    // Apply CLI overrides
    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if let Some(size) = cli.size_override {
        scenario.simulation.community_size = size;
    }
    if let Some(ref code) = cli.season_override {
        match code.parse() {
            Ok(season) => scenario.simulation.season = season,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }
    if let Some(pv) = cli.pv_override {
        scenario.simulation.pv_percentage = pv;
    }
    if let Some(sd) = cli.sd_override {
        scenario.simulation.sd_percentage = sd;
    }
    if cli.with_battery {
        scenario.simulation.with_battery = true;
    }

    // Validate before touching any data
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let data = load_data(&scenario);
    let engine = SimulationEngine::new(scenario);
    let result = match engine.simulate(&data) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    println!("{result}");

    if let Some(ref path) = cli.result_out {
        if let Err(e) = export_result_json(&result, Path::new(path)) {
            eprintln!("error: failed to write JSON: {e}");
            process::exit(1);
        }
        eprintln!("Result written to {path}");
    }
    if let Some(ref path) = cli.profiles_out {
        if let Err(e) = export_profiles_csv(&result, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Profiles written to {path}");
    }
}
