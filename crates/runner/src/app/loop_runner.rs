use std::io;
use std::process::ExitCode;

use city_engine::{
    resolve_app_paths, run_app, AppError, AppPaths, City, CityConfig, SimulationState,
};
use tracing::{error, info, warn};

use super::bootstrap::{AppWiring, RunMode};
use super::headless::{run_headless, PrintingConsole};
use super::program_file::ProgramFile;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_city(app) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_city(app: AppWiring) -> Result<ExitCode, AppError> {
    let AppWiring {
        settings,
        mut config,
    } = app;

    let (program_path, paths) = match (settings.program_path, resolve_app_paths()) {
        (Some(path), Ok(paths)) => (path, Some(paths)),
        (None, Ok(paths)) => (paths.default_program_file(), Some(paths)),
        (Some(path), Err(err)) if settings.mode != RunMode::Window => {
            warn!(error = %err, "project_root_not_found");
            (path, None)
        }
        (_, Err(err)) => return Err(err.into()),
    };
    let layout_file = settings.layout_path.or_else(|| {
        paths
            .as_ref()
            .map(AppPaths::default_layout_file)
            .filter(|path| path.is_file())
    });

    let source = ProgramFile::new(program_path);
    info!(
        program = %source.path().display(),
        layout = ?layout_file,
        "city_configured"
    );
    let city_config = CityConfig {
        layout_file,
        ..CityConfig::default()
    };
    let city = City::new(
        Box::new(source),
        PrintingConsole::new(io::stdout()),
        city_config,
    );

    match settings.mode {
        RunMode::Window => {
            config.asset_root = paths.map(|paths| paths.assets_dir);
            run_app(config, city)?;
            Ok(ExitCode::SUCCESS)
        }
        RunMode::Headless { max_ticks } => {
            let mut city = city;
            let summary = run_headless(&mut city, max_ticks);
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(err) => warn!(error = %err, "run_summary_serialize_failed"),
            }
            if summary.state == SimulationState::Finished {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
