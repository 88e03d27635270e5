//! Scheduler that drives every robot of a program one statement per tick.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::actor::Actor;
use crate::camera::{Camera, Vec2};
use crate::console::{Console, ConsoleBuffer};
use crate::log::LogRecord;
use crate::map::{load_item_layout, CityBounds, CityMap, Item, ItemLayout, MountError};
use crate::program::{
    build_descriptors, program_fingerprint, Area, ConfigIssue, Program, ProgramFingerprint,
    ProgramSource, TILE_SIZE,
};

pub const START_MESSAGE: &str = "Comenzando ejecucion";
pub const ALREADY_RUNNING_MESSAGE: &str = "El programa ya esta corriendo";
pub const RESUME_MESSAGE: &str = "Reanudando la ejecucion";
pub const FINISHED_MESSAGE: &str = "Finalizo la ejecucion del programa";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityConfig {
    pub bounds: CityBounds,
    /// Pixels per tile at zoom 1.
    pub tile_size: i32,
    pub item_layout: ItemLayout,
    /// XML layout read on every start; replaces `item_layout` when set.
    pub layout_file: Option<PathBuf>,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            bounds: CityBounds::default(),
            tile_size: TILE_SIZE,
            item_layout: ItemLayout::default(),
            layout_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

impl SimulationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }
}

/// Outcome of a single [`City::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub state: SimulationState,
    pub actors_updated: bool,
    pub active_instances: usize,
    /// True only on the tick that moved the city into `Finished`.
    pub finished_now: bool,
    pub camera_moved: bool,
}

/// Drawing collaborator. Called after ticking, once per frame, in map, items, robots order.
pub trait CityPainter {
    fn draw_map(&mut self, camera: &Camera, bounds: CityBounds, areas: &[Area]);
    fn draw_item(&mut self, camera: &Camera, item: &Item);
    fn draw_robot(&mut self, camera: &Camera, robot: &Actor);
}

pub struct City<C: Console = ConsoleBuffer> {
    source: Box<dyn ProgramSource>,
    console: C,
    config: CityConfig,
    map: CityMap,
    camera: Camera,
    state: SimulationState,
    ticks: u64,
    fingerprint: Option<ProgramFingerprint>,
}

impl<C: Console> City<C> {
    pub fn new(source: Box<dyn ProgramSource>, console: C, config: CityConfig) -> Self {
        let camera = Camera::centered_on(Vec2 {
            x: config.bounds.width as f32 / 2.0,
            y: config.bounds.height as f32 / 2.0,
        });
        Self {
            source,
            console,
            map: CityMap::new(config.bounds),
            config,
            camera,
            state: SimulationState::Idle,
            ticks: 0,
            fingerprint: None,
        }
    }

    /// Starts from `Idle`, resumes from `Paused`, and reports misuse otherwise.
    pub fn start(&mut self) -> SimulationState {
        match self.state {
            SimulationState::Idle => self.launch(),
            SimulationState::Paused => {
                self.state = SimulationState::Running;
                self.console.add(&[LogRecord::valid(RESUME_MESSAGE)]);
                info!(tick = self.ticks, "city_resumed");
            }
            SimulationState::Running | SimulationState::Finished => {
                self.console.set(&[LogRecord::info(ALREADY_RUNNING_MESSAGE)]);
            }
        }
        self.state
    }

    /// Freezes actors at the next tick boundary. Only meaningful while running.
    pub fn pause(&mut self) -> bool {
        if self.state != SimulationState::Running {
            return false;
        }
        self.state = SimulationState::Paused;
        info!(tick = self.ticks, "city_paused");
        true
    }

    /// Discards actors, items and pending logs. The next start loads the program again.
    pub fn reset(&mut self) {
        self.map = CityMap::new(self.config.bounds);
        self.state = SimulationState::Idle;
        self.ticks = 0;
        self.fingerprint = None;
        info!("city_reset");
    }

    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            state: self.state,
            actors_updated: false,
            active_instances: self.map.active_instances(),
            finished_now: false,
            camera_moved: false,
        };
        if self.state == SimulationState::Idle {
            return report;
        }

        report.camera_moved = self.camera.update();
        if self.state != SimulationState::Running {
            return report;
        }

        if let Err(err) = self.map.update_actors() {
            error!(error = %err, "actor_pass_failed");
            return report;
        }
        self.ticks += 1;
        report.actors_updated = true;

        let logs = self.map.take_logs();
        if !logs.is_empty() {
            self.console.add(&logs);
        }

        report.active_instances = self.map.active_instances();
        if report.active_instances == 0 {
            self.state = SimulationState::Finished;
            self.console.add(&[LogRecord::valid(FINISHED_MESSAGE)]);
            report.finished_now = true;
            info!(
                ticks = self.ticks,
                robots = self.map.robots().len(),
                "city_finished"
            );
        }
        report.state = self.state;
        report
    }

    pub fn draw(&self, painter: &mut impl CityPainter) {
        painter.draw_map(&self.camera, self.map.bounds(), self.map.areas());
        for item in self.map.items().items() {
            painter.draw_item(&self.camera, item);
        }
        for robot in self.map.robots() {
            painter.draw_robot(&self.camera, robot);
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Ticks in which actors ran since the last start.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn map(&self) -> &CityMap {
        &self.map
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn config(&self) -> &CityConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> Option<ProgramFingerprint> {
        self.fingerprint
    }

    fn launch(&mut self) {
        let program = match self.source.load_program() {
            Ok(program) => program,
            Err(err) => {
                error!(error = %err, "program_load_failed");
                self.console.set(&[LogRecord::error(format!(
                    "No se pudo cargar el programa: {err}"
                ))]);
                return;
            }
        };

        self.fingerprint = match program_fingerprint(&program) {
            Ok(fingerprint) => Some(fingerprint),
            Err(err) => {
                warn!(error = %err, "program_fingerprint_failed");
                None
            }
        };

        let layout = match &self.config.layout_file {
            Some(path) => match load_item_layout(path) {
                Ok(layout) => layout,
                Err(err) => {
                    error!(error = %err, code = ?err.code, "item_layout_failed");
                    self.console.set(&[LogRecord::error(format!(
                        "No se pudo leer la distribucion de objetos: {err}"
                    ))]);
                    return;
                }
            },
            None => self.config.item_layout.clone(),
        };

        let issues = match self.populate(&program, &layout) {
            Ok(issues) => issues,
            Err(err) => {
                error!(error = %err, "map_mount_failed");
                self.console
                    .set(&[LogRecord::error(format!("No se pudo preparar la ciudad: {err}"))]);
                return;
            }
        };

        self.console.set(&[LogRecord::valid(START_MESSAGE)]);
        if !issues.is_empty() {
            let records: Vec<LogRecord> = issues
                .iter()
                .map(|issue| LogRecord::info(issue.to_string()))
                .collect();
            self.console.add(&records);
        }

        self.state = SimulationState::Running;
        self.ticks = 0;
        let fingerprint = self
            .fingerprint
            .map(|fingerprint| fingerprint.short_hex())
            .unwrap_or_default();
        info!(
            robots = self.map.robots().len(),
            active = self.map.active_instances(),
            config_issues = issues.len(),
            fingerprint = %fingerprint,
            "city_started"
        );
    }

    fn populate(
        &mut self,
        program: &Program,
        layout: &ItemLayout,
    ) -> Result<Vec<ConfigIssue>, MountError> {
        let set = build_descriptors(program);
        let mut map = CityMap::new(self.config.bounds);
        map.set_areas(&program.areas)?;
        map.set_robots(set.descriptors)?;
        map.set_items(layout)?;
        map.mount_objects()?;
        self.map = map;
        Ok(set.issues)
    }
}
