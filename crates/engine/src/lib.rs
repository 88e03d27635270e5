use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod actor;
pub mod app;
pub mod camera;
pub mod city;
pub mod console;
pub mod log;
pub mod map;
pub mod program;
mod sprite_keys;

pub use actor::{Actor, Heading, RuntimeError, StepContext, MAX_CALL_DEPTH};
pub use app::{run_app, AppError, CityCommand, LoopConfig, LoopMetricsSnapshot, Renderer};
pub use camera::{Camera, Vec2};
pub use city::{City, CityConfig, CityPainter, SimulationState, TickReport};
pub use console::{Console, ConsoleBuffer};
pub use log::{LogBatch, LogRecord, LogState};
pub use map::{
    load_item_layout, parse_item_layout, CityBounds, CityMap, Item, ItemKind, ItemLayout,
    ItemPlacement, ItemStore, LayoutError, LayoutErrorCode, MountError, SourceLocation,
};
pub use program::{
    build_descriptor, build_descriptors, program_fingerprint, ConfigIssue, DescriptorSet,
    Program, ProgramDescriptor, ProgramFingerprint, ProgramSource, ProgramSourceError,
    StaticProgram,
};
pub use sprite_keys::{
    robot_sprite_key, SpriteKeyError, FLOWER_SPRITE_KEY, PAPER_SPRITE_KEY, ROBOT_SPRITE_VARIANTS,
};

pub const ROOT_ENV_VAR: &str = "ROBOT_CITY_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub demos_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            assets_dir: root.join("assets"),
            demos_dir: root.join("demos"),
            root,
        }
    }

    pub fn default_program_file(&self) -> PathBuf {
        self.demos_dir.join("sample_program.json")
    }

    pub fn default_layout_file(&self) -> PathBuf {
        self.assets_dir.join("city").join("items.xml")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("ROBOT_CITY_ROOT={} has no Cargo.toml with demos/ or assets/ next to it", path.display())]
    InvalidEnvRoot { path: PathBuf },
    #[error("no project root above {}; set ROBOT_CITY_ROOT", searched.display())]
    RootNotFound { searched: PathBuf },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let env_root = env::var_os(ROOT_ENV_VAR).map(PathBuf::from);
    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let mut starts = Vec::with_capacity(2);
    if let Ok(cwd) = env::current_dir() {
        starts.push(cwd);
    }
    starts.push(exe);
    find_root(env_root, &starts).map(AppPaths::from_root)
}

/// An explicit root must be valid; otherwise the first marked ancestor of any start wins.
fn find_root(env_root: Option<PathBuf>, starts: &[PathBuf]) -> Result<PathBuf, StartupError> {
    if let Some(path) = env_root {
        let path = normalize_path(&path);
        return if is_repo_marker(&path) {
            Ok(path)
        } else {
            Err(StartupError::InvalidEnvRoot { path })
        };
    }
    starts
        .iter()
        .flat_map(|start| start.ancestors())
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
        .ok_or_else(|| StartupError::RootNotFound {
            searched: starts.first().cloned().unwrap_or_default(),
        })
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file()
        && (path.join("demos").is_dir() || path.join("assets").is_dir())
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn repo_marker_requires_cargo_toml_and_a_content_dir() {
        let temp = TempDir::new().expect("temp dir");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("cargo toml");
        assert!(!is_repo_marker(temp.path()));

        fs::create_dir(temp.path().join("assets")).expect("assets dir");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn root_is_found_from_a_nested_start() {
        let temp = TempDir::new().expect("temp dir");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("cargo toml");
        fs::create_dir(temp.path().join("demos")).expect("demos dir");
        let nested = temp.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested dir");

        let root = find_root(None, &[nested]).expect("root");
        assert_eq!(root, normalize_path(temp.path()));
    }

    #[test]
    fn explicit_root_must_be_marked() {
        let temp = TempDir::new().expect("temp dir");

        let error = find_root(Some(temp.path().to_path_buf()), &[]).expect_err("unmarked");
        assert!(matches!(error, StartupError::InvalidEnvRoot { .. }));
        let error = find_root(None, &[temp.path().to_path_buf()]).expect_err("nothing above");
        assert!(matches!(error, StartupError::RootNotFound { .. }));
    }

    #[test]
    fn default_files_live_under_demos_and_assets() {
        let paths = AppPaths::from_root(PathBuf::from("/srv/city"));
        assert_eq!(
            paths.default_program_file(),
            PathBuf::from("/srv/city/demos/sample_program.json")
        );
        assert_eq!(
            paths.default_layout_file(),
            PathBuf::from("/srv/city/assets/city/items.xml")
        );
    }
}
