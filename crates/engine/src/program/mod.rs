//! Program description as produced by the language parser.
//!
//! Field names follow the parser's JSON output (`ROBOT_TYPES`, `INSTANCES`, ...). Everything below
//! `body` is treated as a tree the actors interpret on their own; nothing here executes it.

mod descriptor;
mod fingerprint;
mod source;
mod statement;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use descriptor::{
    build_descriptor, build_descriptors, Area, ConfigIssue, DescriptorSet, Inventory,
    ProgramDescriptor, ProgramIndex, TILE_SIZE,
};
pub use fingerprint::{program_fingerprint, ProgramFingerprint};
pub use source::{ProgramSource, ProgramSourceError, StaticProgram};
pub use statement::{BinaryOperator, Expression, Statement};

pub const NUMBER_TYPE_NAME: &str = "numero";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(rename = "ROBOT_TYPES", default)]
    pub robot_types: Vec<RobotType>,
    #[serde(rename = "INSTANCES", default)]
    pub instances: Vec<InstanceDecl>,
    #[serde(rename = "INITS", default)]
    pub inits: Inits,
    #[serde(rename = "AREAS", default)]
    pub areas: Vec<AreaDecl>,
    #[serde(rename = "PROCEDURES", default)]
    pub procedures: Vec<Procedure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotType {
    pub identifier: String,
    #[serde(default)]
    pub local_variables: Vec<VariableDecl>,
    #[serde(default)]
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub identifier: String,
    pub type_value: String,
}

impl VariableDecl {
    pub fn new(identifier: impl Into<String>, type_value: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            type_value: type_value.into(),
        }
    }

    /// Numbers start at 0; every other declared type is treated as boolean and starts false.
    pub fn initial_value(&self) -> Value {
        if self.type_value == NUMBER_TYPE_NAME {
            Value::Number(0)
        } else {
            Value::Bool(false)
        }
    }

    pub fn to_variable(&self) -> Variable {
        Variable {
            identifier: self.identifier.clone(),
            value: self.initial_value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDecl {
    pub identifier: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inits {
    #[serde(default)]
    pub assign_areas: Vec<AreaAssignment>,
    #[serde(default)]
    pub initial_positions: Vec<InitialPosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaAssignment {
    pub identifier: String,
    #[serde(rename = "type")]
    pub area: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialPosition {
    pub identifier: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn scaled(self, factor: i32) -> Self {
        Self {
            x: self.x.saturating_mul(factor),
            y: self.y.saturating_mul(factor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaDecl {
    pub identifier: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub a: GridPoint,
    pub b: GridPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub identifier: String,
    #[serde(default)]
    pub parameters: Vec<VariableDecl>,
    #[serde(default)]
    pub local_variables: Vec<VariableDecl>,
    #[serde(default)]
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(i64),
    Bool(bool),
}

impl Value {
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Number(_) => "numero",
            Self::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(true) => f.write_str("V"),
            Self::Bool(false) => f.write_str("F"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub identifier: String,
    pub value: Value,
}
