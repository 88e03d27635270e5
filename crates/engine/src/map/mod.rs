//! Shared world state: robots, items on the grid, and the per-tick log batch.

mod items;
mod layout;

pub use items::{Item, ItemKind, ItemLayout, ItemPlacement, ItemStore};
pub use layout::{load_item_layout, parse_item_layout, LayoutError, LayoutErrorCode, SourceLocation};

use thiserror::Error;
use tracing::debug;

use crate::actor::{Actor, StepContext};
use crate::log::{LogBatch, LogRecord};
use crate::program::{Area, AreaDecl, ProgramDescriptor};

pub const DEFAULT_GRID_WIDTH: i32 = 100;
pub const DEFAULT_GRID_HEIGHT: i32 = 100;

/// Tile grid limits. Valid coordinates are `0..width` and `0..height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityBounds {
    pub width: i32,
    pub height: i32,
}

impl Default for CityBounds {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
        }
    }
}

impl CityBounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        (0..self.width).contains(&x) && (0..self.height).contains(&y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("map objects are already mounted")]
    AlreadyMounted,
    #[error("map objects have not been mounted")]
    NotMounted,
}

#[derive(Debug, Clone, Default)]
pub struct CityMap {
    bounds: CityBounds,
    areas: Vec<Area>,
    robots: Vec<Actor>,
    items: ItemStore,
    logs: LogBatch,
    active_instances: usize,
    mounted: bool,
}

impl CityMap {
    pub fn new(bounds: CityBounds) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    pub fn set_areas(&mut self, areas: &[AreaDecl]) -> Result<(), MountError> {
        self.ensure_unmounted()?;
        self.areas = areas.iter().map(Area::from_decl).collect();
        Ok(())
    }

    pub fn set_robots(&mut self, descriptors: Vec<ProgramDescriptor>) -> Result<(), MountError> {
        self.ensure_unmounted()?;
        self.robots = descriptors.into_iter().map(Actor::new).collect();
        Ok(())
    }

    pub fn set_items(&mut self, layout: &ItemLayout) -> Result<(), MountError> {
        self.ensure_unmounted()?;
        self.items = ItemStore::from_layout(layout);
        Ok(())
    }

    /// Freezes the configuration and counts the actors that have work to do.
    pub fn mount_objects(&mut self) -> Result<(), MountError> {
        self.ensure_unmounted()?;
        self.active_instances = self.robots.iter().filter(|robot| robot.is_active()).count();
        self.mounted = true;
        debug!(
            robots = self.robots.len(),
            active = self.active_instances,
            items = self.items.items().len(),
            "map_mounted"
        );
        Ok(())
    }

    /// Runs one step of every active actor in declaration order. Later actors see item changes
    /// made by earlier ones within the same pass.
    pub fn update_actors(&mut self) -> Result<(), MountError> {
        if !self.mounted {
            return Err(MountError::NotMounted);
        }
        let mut ctx = StepContext {
            items: &mut self.items,
            bounds: self.bounds,
            log: &mut self.logs,
        };
        for robot in self.robots.iter_mut().filter(|robot| robot.is_active()) {
            if !robot.update(&mut ctx) {
                self.active_instances = self.active_instances.saturating_sub(1);
            }
        }
        Ok(())
    }

    pub fn take_logs(&mut self) -> Vec<LogRecord> {
        self.logs.take()
    }

    pub fn active_instances(&self) -> usize {
        self.active_instances
    }

    pub fn bounds(&self) -> CityBounds {
        self.bounds
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn robots(&self) -> &[Actor] {
        &self.robots
    }

    pub fn items(&self) -> &ItemStore {
        &self.items
    }

    fn ensure_unmounted(&self) -> Result<(), MountError> {
        if self.mounted {
            return Err(MountError::AlreadyMounted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{
        build_descriptors, GridPoint, InitialPosition, InstanceDecl, Program, RobotType, Statement,
    };

    fn program_with(bodies: &[(&str, Vec<Statement>)]) -> Program {
        let mut program = Program::default();
        for (index, (name, body)) in bodies.iter().enumerate() {
            program.robot_types.push(RobotType {
                identifier: format!("tipo{index}"),
                local_variables: Vec::new(),
                body: body.clone(),
            });
            program.instances.push(InstanceDecl {
                identifier: (*name).to_string(),
                type_name: format!("tipo{index}"),
            });
            program.inits.initial_positions.push(InitialPosition {
                identifier: (*name).to_string(),
                x: 1,
                y: 1,
            });
        }
        program
    }

    fn mounted_map(program: &Program, layout: &ItemLayout) -> CityMap {
        let mut map = CityMap::default();
        map.set_areas(&program.areas).expect("areas");
        map.set_robots(build_descriptors(program).descriptors)
            .expect("robots");
        map.set_items(layout).expect("items");
        map.mount_objects().expect("mount");
        map
    }

    #[test]
    fn bounds_are_half_open() {
        let bounds = CityBounds::default();
        assert!(bounds.contains(0, 0));
        assert!(bounds.contains(99, 99));
        assert!(!bounds.contains(100, 5));
        assert!(!bounds.contains(-1, 5));
    }

    #[test]
    fn mount_is_rejected_twice_and_freezes_configuration() {
        let mut map = CityMap::default();
        map.mount_objects().expect("first mount");

        assert_eq!(map.mount_objects(), Err(MountError::AlreadyMounted));
        assert_eq!(map.set_items(&ItemLayout::empty()), Err(MountError::AlreadyMounted));
        assert_eq!(map.set_robots(Vec::new()), Err(MountError::AlreadyMounted));
    }

    #[test]
    fn update_before_mount_is_rejected() {
        let mut map = CityMap::default();
        assert_eq!(map.update_actors(), Err(MountError::NotMounted));
    }

    #[test]
    fn active_count_skips_robots_without_statements() {
        let program = program_with(&[("r1", vec![Statement::Move]), ("r2", Vec::new())]);
        let map = mounted_map(&program, &ItemLayout::empty());

        assert_eq!(map.robots().len(), 2);
        assert_eq!(map.active_instances(), 1);
    }

    #[test]
    fn earlier_robot_changes_are_visible_to_later_ones() {
        let program = program_with(&[
            ("r1", vec![Statement::TakeFlower]),
            ("r2", vec![Statement::TakeFlower]),
        ]);
        let mut layout = ItemLayout::empty();
        layout.flowers.push(ItemPlacement::new(1, 1, 1));
        let mut map = mounted_map(&program, &layout);

        map.update_actors().expect("tick");
        let logs = map.take_logs();

        assert_eq!(map.robots()[0].inventory().flower, 1);
        assert_eq!(map.robots()[1].inventory().flower, 0);
        assert_eq!(map.active_instances(), 0);
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.starts_with("r2:"));
        assert!(map.take_logs().is_empty());
    }

    #[test]
    fn declared_areas_are_scaled_for_drawing() {
        let mut program = program_with(&[]);
        program.areas.push(AreaDecl {
            identifier: "zona".to_string(),
            kind: None,
            a: GridPoint::new(1, 2),
            b: GridPoint::new(3, 4),
        });
        let map = mounted_map(&program, &ItemLayout::empty());

        assert_eq!(map.areas()[0].a, GridPoint::new(16, 32));
        assert_eq!(map.areas()[0].b, GridPoint::new(48, 64));
    }
}
