use std::env;

use engine::LoopConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const STAGE_ENV_VAR: &str = "TILERUN_STAGE";
const MAX_TICKS_ENV_VAR: &str = "TILERUN_MAX_TICKS";
const HEADLESS_FAST_ENV_VAR: &str = "TILERUN_HEADLESS_FAST";
const DEFAULT_STAGE_FILE: &str = "stage1.json";
/// One minute of simulation at the default tick rate.
const DEFAULT_MAX_TICKS: u64 = 60 * 60;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) stage_file: String,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Tilerun Startup ===");

    let config = LoopConfig {
        max_ticks: resolve_max_ticks(Some(DEFAULT_MAX_TICKS)),
        realtime: !resolve_headless_fast(false),
        ..LoopConfig::default()
    };
    let stage_file = read_env_var(STAGE_ENV_VAR)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STAGE_FILE.to_string());

    AppWiring { config, stage_file }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn read_env_var(var: &'static str) -> Option<String> {
    match env::var(var) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                env_var = var,
                error = %err,
                "unable to read env var; falling back to config"
            );
            None
        }
    }
}

fn resolve_max_ticks(config_max_ticks: Option<u64>) -> Option<u64> {
    let Some(value) = read_env_var(MAX_TICKS_ENV_VAR) else {
        return config_max_ticks;
    };
    match parse_max_ticks(&value) {
        Some(max_ticks) => max_ticks,
        None => {
            warn!(
                env_var = MAX_TICKS_ENV_VAR,
                value = value.as_str(),
                "invalid max-ticks env var value; falling back to config"
            );
            config_max_ticks
        }
    }
}

fn resolve_headless_fast(config_fast: bool) -> bool {
    let Some(value) = read_env_var(HEADLESS_FAST_ENV_VAR) else {
        return config_fast;
    };
    match parse_flag(&value) {
        Some(fast) => fast,
        None => {
            warn!(
                env_var = HEADLESS_FAST_ENV_VAR,
                value = value.as_str(),
                "invalid headless-fast env var value; falling back to config"
            );
            config_fast
        }
    }
}

/// `0` lifts the limit. `None` means the value did not parse.
fn parse_max_ticks(raw: &str) -> Option<Option<u64>> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Some(None),
        Ok(ticks) => Some(Some(ticks)),
        Err(_) => None,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
