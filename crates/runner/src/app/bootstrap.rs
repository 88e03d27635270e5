use std::env;
use std::path::PathBuf;

use city_engine::LoopConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub(crate) const PROGRAM_ENV_VAR: &str = "ROBOT_CITY_PROGRAM";
pub(crate) const LAYOUT_ENV_VAR: &str = "ROBOT_CITY_LAYOUT";
pub(crate) const HEADLESS_ENV_VAR: &str = "ROBOT_CITY_HEADLESS";
pub(crate) const MAX_TICKS_ENV_VAR: &str = "ROBOT_CITY_MAX_TICKS";
pub(crate) const DEFAULT_MAX_TICKS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RunMode {
    Window,
    /// No window; ticks until finished or `max_ticks`, then prints a JSON summary.
    Headless { max_ticks: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunnerSettings {
    pub(crate) program_path: Option<PathBuf>,
    pub(crate) layout_path: Option<PathBuf>,
    pub(crate) mode: RunMode,
}

impl RunnerSettings {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };
        let headless = lookup(HEADLESS_ENV_VAR)
            .map(|value| parse_flag(HEADLESS_ENV_VAR, &value))
            .unwrap_or(false);
        let mode = if headless {
            RunMode::Headless {
                max_ticks: lookup(MAX_TICKS_ENV_VAR)
                    .map(|value| parse_max_ticks(&value))
                    .unwrap_or(DEFAULT_MAX_TICKS),
            }
        } else {
            RunMode::Window
        };

        Self {
            program_path: path(PROGRAM_ENV_VAR),
            layout_path: path(LAYOUT_ENV_VAR),
            mode,
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) settings: RunnerSettings,
    pub(crate) config: LoopConfig,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Robot City Startup ===");

    let settings = RunnerSettings::from_env();
    info!(
        program = ?settings.program_path,
        layout = ?settings.layout_path,
        mode = ?settings.mode,
        "runner_settings"
    );

    AppWiring {
        settings,
        config: LoopConfig::default(),
    }
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

fn parse_flag(var: &'static str, value: &str) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "" | "0" | "false" | "no" | "off" => false,
        other => {
            warn!(env_var = var, value = other, "invalid flag env var value; treating as off");
            false
        }
    }
}

fn parse_max_ticks(value: &str) -> u64 {
    match value.trim().parse::<u64>() {
        Ok(ticks) if ticks > 0 => ticks,
        _ => {
            warn!(
                env_var = MAX_TICKS_ENV_VAR,
                value,
                default = DEFAULT_MAX_TICKS,
                "invalid max ticks env var value; falling back to default"
            );
            DEFAULT_MAX_TICKS
        }
    }
}
