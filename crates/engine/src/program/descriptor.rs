use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::sprite_keys::robot_sprite_key;

use super::{AreaDecl, GridPoint, Procedure, Program, RobotType, Statement, Variable};

/// Pixels per declared grid unit; area corners are stored already scaled.
pub const TILE_SIZE: i32 = 16;

/// Axis-aligned work area, corners in scaled units (`declared * TILE_SIZE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Area {
    pub a: GridPoint,
    pub b: GridPoint,
}

impl Area {
    pub fn from_decl(decl: &AreaDecl) -> Self {
        Self {
            a: decl.a.scaled(TILE_SIZE),
            b: decl.b.scaled(TILE_SIZE),
        }
    }

    /// Corner order in the source is not guaranteed, so bounds are normalized here.
    pub fn contains_tile(&self, x: i32, y: i32) -> bool {
        let px = x.saturating_mul(TILE_SIZE);
        let py = y.saturating_mul(TILE_SIZE);
        let (min_x, max_x) = (self.a.x.min(self.b.x), self.a.x.max(self.b.x));
        let (min_y, max_y) = (self.a.y.min(self.b.y), self.a.y.max(self.b.y));
        px >= min_x && px <= max_x && py >= min_y && py <= max_y
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub flower: u32,
    pub paper: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramDescriptor {
    pub identifier: String,
    pub areas: Vec<Area>,
    pub x: i32,
    pub y: i32,
    pub variables: Vec<Variable>,
    pub statements: Vec<Statement>,
    pub procedures: Vec<Procedure>,
    pub inventory: Inventory,
    pub src: String,
}

/// Unresolved references found while building descriptors. Each one has a safe default applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    #[error("robot {instance}: el tipo '{type_name}' no esta definido")]
    UnresolvedType { instance: String, type_name: String },
    #[error("robot {instance}: el area '{area}' no esta definida")]
    UnresolvedArea { instance: String, area: String },
    #[error("robot {instance}: sin posicion inicial, se usa (0, 0)")]
    MissingPosition { instance: String },
}

/// Identifier lookups over a program, built once per load. First declaration wins on duplicates.
#[derive(Debug)]
pub struct ProgramIndex<'a> {
    program: &'a Program,
    types_by_name: HashMap<&'a str, &'a RobotType>,
    areas_by_name: HashMap<&'a str, &'a AreaDecl>,
}

impl<'a> ProgramIndex<'a> {
    pub fn new(program: &'a Program) -> Self {
        let mut types_by_name = HashMap::with_capacity(program.robot_types.len());
        for robot_type in &program.robot_types {
            types_by_name
                .entry(robot_type.identifier.as_str())
                .or_insert(robot_type);
        }
        let mut areas_by_name = HashMap::with_capacity(program.areas.len());
        for area in &program.areas {
            areas_by_name.entry(area.identifier.as_str()).or_insert(area);
        }
        Self {
            program,
            types_by_name,
            areas_by_name,
        }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn robot_type(&self, name: &str) -> Option<&'a RobotType> {
        self.types_by_name.get(name).copied()
    }

    pub fn area(&self, name: &str) -> Option<&'a AreaDecl> {
        self.areas_by_name.get(name).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorSet {
    pub descriptors: Vec<ProgramDescriptor>,
    pub issues: Vec<ConfigIssue>,
}

pub fn build_descriptors(program: &Program) -> DescriptorSet {
    let index = ProgramIndex::new(program);
    let mut set = DescriptorSet {
        descriptors: Vec::with_capacity(program.instances.len()),
        issues: Vec::new(),
    };
    for instance_index in 0..program.instances.len() {
        if let Some(descriptor) = build_descriptor(&index, instance_index, &mut set.issues) {
            set.descriptors.push(descriptor);
        }
    }
    set
}

/// Builds the descriptor for one declared instance. Returns `None` only when `instance_index`
/// is out of range; unresolved references are pushed to `issues` and defaulted.
pub fn build_descriptor(
    index: &ProgramIndex<'_>,
    instance_index: usize,
    issues: &mut Vec<ConfigIssue>,
) -> Option<ProgramDescriptor> {
    let program = index.program();
    let instance = program.instances.get(instance_index)?;
    let id = instance.identifier.as_str();

    let (statements, variables) = match index.robot_type(&instance.type_name) {
        Some(robot_type) => (
            robot_type.body.clone(),
            robot_type
                .local_variables
                .iter()
                .map(|decl| decl.to_variable())
                .collect(),
        ),
        None => {
            report(
                issues,
                ConfigIssue::UnresolvedType {
                    instance: id.to_string(),
                    type_name: instance.type_name.clone(),
                },
            );
            (Vec::new(), Vec::new())
        }
    };

    let mut areas = Vec::new();
    for assignment in program
        .inits
        .assign_areas
        .iter()
        .filter(|assignment| assignment.identifier == id)
    {
        match index.area(&assignment.area) {
            Some(decl) => areas.push(Area::from_decl(decl)),
            None => report(
                issues,
                ConfigIssue::UnresolvedArea {
                    instance: id.to_string(),
                    area: assignment.area.clone(),
                },
            ),
        }
    }

    let (x, y) = match program
        .inits
        .initial_positions
        .iter()
        .find(|initial| initial.identifier == id)
    {
        Some(initial) => (initial.x, initial.y),
        None => {
            report(
                issues,
                ConfigIssue::MissingPosition {
                    instance: id.to_string(),
                },
            );
            (0, 0)
        }
    };

    Some(ProgramDescriptor {
        identifier: id.to_string(),
        areas,
        x,
        y,
        variables,
        statements,
        procedures: program.procedures.clone(),
        inventory: Inventory::default(),
        src: robot_sprite_key(instance_index),
    })
}

fn report(issues: &mut Vec<ConfigIssue>, issue: ConfigIssue) {
    warn!(issue = %issue, "config_issue");
    issues.push(issue);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{
        AreaAssignment, Expression, InitialPosition, InstanceDecl, Value, VariableDecl,
    };

    fn robot_type(identifier: &str, body: Vec<Statement>) -> RobotType {
        RobotType {
            identifier: identifier.to_string(),
            local_variables: Vec::new(),
            body,
        }
    }

    fn instance(identifier: &str, type_name: &str) -> InstanceDecl {
        InstanceDecl {
            identifier: identifier.to_string(),
            type_name: type_name.to_string(),
        }
    }

    fn area(identifier: &str, a: (i32, i32), b: (i32, i32)) -> AreaDecl {
        AreaDecl {
            identifier: identifier.to_string(),
            kind: None,
            a: GridPoint::new(a.0, a.1),
            b: GridPoint::new(b.0, b.1),
        }
    }

    fn assign(identifier: &str, area: &str) -> AreaAssignment {
        AreaAssignment {
            identifier: identifier.to_string(),
            area: area.to_string(),
        }
    }

    fn position(identifier: &str, x: i32, y: i32) -> InitialPosition {
        InitialPosition {
            identifier: identifier.to_string(),
            x,
            y,
        }
    }

    #[test]
    fn single_instance_gets_position_and_defaulted_variables() {
        let mut program = Program::default();
        let mut counter = robot_type("contadorType", vec![Statement::Move]);
        counter.local_variables = vec![VariableDecl::new("contador", "numero")];
        program.robot_types.push(counter);
        program.instances.push(instance("r1", "contadorType"));
        program.inits.initial_positions.push(position("r1", 2, 3));

        let set = build_descriptors(&program);

        assert!(set.issues.is_empty(), "issues={:?}", set.issues);
        let descriptor = &set.descriptors[0];
        assert_eq!(descriptor.identifier, "r1");
        assert_eq!(
            descriptor.variables,
            vec![Variable {
                identifier: "contador".to_string(),
                value: Value::Number(0),
            }]
        );
        assert_eq!((descriptor.x, descriptor.y), (2, 3));
        assert_eq!(descriptor.inventory, Inventory::default());
    }

    #[test]
    fn one_descriptor_per_instance_in_declaration_order() {
        let mut program = Program::default();
        program.robot_types.push(robot_type("t", Vec::new()));
        for name in ["c", "a", "b", "a2"] {
            program.instances.push(instance(name, "t"));
            program.inits.initial_positions.push(position(name, 0, 0));
        }

        let set = build_descriptors(&program);
        let ids: Vec<&str> = set
            .descriptors
            .iter()
            .map(|descriptor| descriptor.identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b", "a2"]);
    }

    #[test]
    fn areas_are_scaled_and_follow_assignment_order() {
        let mut program = Program::default();
        program.robot_types.push(robot_type("t", Vec::new()));
        program.instances.push(instance("r1", "t"));
        program.inits.initial_positions.push(position("r1", 0, 0));
        // Declared in reverse of the assignment order.
        program.areas.push(area("second", (2, 2), (3, 3)));
        program.areas.push(area("first", (0, 0), (1, 1)));
        program.inits.assign_areas.push(assign("r1", "first"));
        program.inits.assign_areas.push(assign("other", "second"));
        program.inits.assign_areas.push(assign("r1", "second"));

        let set = build_descriptors(&program);
        assert_eq!(
            set.descriptors[0].areas,
            vec![
                Area {
                    a: GridPoint::new(0, 0),
                    b: GridPoint::new(16, 16),
                },
                Area {
                    a: GridPoint::new(32, 32),
                    b: GridPoint::new(48, 48),
                },
            ]
        );
    }

    #[test]
    fn sprite_key_repeats_every_eight_instances() {
        let mut program = Program::default();
        program.robot_types.push(robot_type("t", Vec::new()));
        for i in 0..17 {
            let name = format!("r{i}");
            program.inits.initial_positions.push(position(&name, 0, 0));
            program.instances.push(instance(&name, "t"));
        }

        let set = build_descriptors(&program);
        assert_eq!(set.descriptors.len(), 17);
        for i in 0..9 {
            assert_eq!(set.descriptors[i].src, set.descriptors[i + 8].src, "index={i}");
        }
        assert_ne!(set.descriptors[0].src, set.descriptors[1].src);
    }

    #[test]
    fn unresolved_references_fall_back_to_defaults() {
        let mut program = Program::default();
        program.instances.push(instance("r1", "fantasma"));
        program.inits.assign_areas.push(assign("r1", "nowhere"));

        let set = build_descriptors(&program);
        let descriptor = &set.descriptors[0];
        assert!(descriptor.statements.is_empty());
        assert!(descriptor.variables.is_empty());
        assert!(descriptor.areas.is_empty());
        assert_eq!((descriptor.x, descriptor.y), (0, 0));
        assert_eq!(
            set.issues,
            vec![
                ConfigIssue::UnresolvedType {
                    instance: "r1".to_string(),
                    type_name: "fantasma".to_string(),
                },
                ConfigIssue::UnresolvedArea {
                    instance: "r1".to_string(),
                    area: "nowhere".to_string(),
                },
                ConfigIssue::MissingPosition {
                    instance: "r1".to_string(),
                },
            ]
        );
    }

    #[test]
    fn first_declared_type_wins_on_duplicates() {
        let mut program = Program::default();
        program.robot_types.push(robot_type("t", vec![Statement::Move]));
        program.robot_types.push(robot_type("t", vec![Statement::TurnRight]));
        program.instances.push(instance("r1", "t"));

        let set = build_descriptors(&program);
        assert_eq!(set.descriptors[0].statements, vec![Statement::Move]);
    }

    #[test]
    fn descriptors_own_independent_statement_and_procedure_trees() {
        let mut program = Program::default();
        program.robot_types.push(robot_type(
            "t",
            vec![Statement::Repeat {
                times: Expression::number(2),
                body: vec![Statement::Move],
            }],
        ));
        program.procedures.push(Procedure {
            identifier: "girar".to_string(),
            parameters: Vec::new(),
            local_variables: Vec::new(),
            body: vec![Statement::TurnRight],
        });
        program.instances.push(instance("r1", "t"));
        program.instances.push(instance("r2", "t"));

        let mut set = build_descriptors(&program);
        let untouched = set.descriptors[1].clone();
        let original_type = program.robot_types[0].clone();
        let original_procedures = program.procedures.clone();

        if let Statement::Repeat { body, .. } = &mut set.descriptors[0].statements[0] {
            body.push(Statement::TakeFlower);
        }
        set.descriptors[0].procedures[0].body.clear();

        assert_eq!(set.descriptors[1], untouched);
        assert_eq!(program.robot_types[0], original_type);
        assert_eq!(program.procedures, original_procedures);
        assert_ne!(set.descriptors[0].statements, untouched.statements);
    }

    #[test]
    fn building_twice_yields_equal_descriptors() {
        let mut program = Program::default();
        program.robot_types.push(robot_type("t", vec![Statement::Move]));
        program.instances.push(instance("r1", "t"));
        program.inits.initial_positions.push(position("r1", 4, 5));

        assert_eq!(build_descriptors(&program), build_descriptors(&program));
    }

    #[test]
    fn out_of_range_instance_yields_none() {
        let program = Program::default();
        let index = ProgramIndex::new(&program);
        let mut issues = Vec::new();
        assert!(build_descriptor(&index, 0, &mut issues).is_none());
        assert!(issues.is_empty());
    }

    #[test]
    fn oversized_area_corners_saturate_instead_of_overflowing() {
        let huge = Area::from_decl(&area("huge", (-200_000_000, 0), (200_000_000, 200_000_000)));
        assert_eq!(huge.a, GridPoint::new(i32::MIN, 0));
        assert_eq!(huge.b, GridPoint::new(i32::MAX, i32::MAX));
        assert!(huge.contains_tile(50, 50));
        assert!(huge.contains_tile(i32::MAX, 0));
    }

    #[test]
    fn area_contains_tiles_on_its_border() {
        let area = Area::from_decl(&area("a", (2, 2), (4, 5)));
        assert!(area.contains_tile(2, 2));
        assert!(area.contains_tile(4, 5));
        assert!(area.contains_tile(3, 4));
        assert!(!area.contains_tile(1, 2));
        assert!(!area.contains_tile(4, 6));
    }
}
