//! Runnable robot instances.
//!
//! An [`Actor`] owns its [`ProgramDescriptor`] and everything it mutates while running. It never
//! sees other actors; the world reaches it only through [`StepContext`].

mod interpreter;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::log::{LogBatch, LogRecord};
use crate::map::{CityBounds, ItemKind, ItemStore};
use crate::program::{Area, Inventory, ProgramDescriptor, Variable};

use interpreter::Frame;

pub const MAX_CALL_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Heading {
    #[default]
    North,
    East,
    South,
    West,
}

impl Heading {
    pub fn turned_right(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("instruccion invalida")]
    InvalidInstruction,
    #[error("variable '{name}' no declarada")]
    UnknownVariable { name: String },
    #[error("procedimiento '{name}' no definido")]
    UnknownProcedure { name: String },
    #[error("'{procedure}' espera {expected} parametros y recibio {found}")]
    ArgumentCount {
        procedure: String,
        expected: usize,
        found: usize,
    },
    #[error("se esperaba un valor {expected} y se obtuvo {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("division por cero")]
    DivisionByZero,
    #[error("no hay {} en la esquina", item_label(*kind))]
    NoItemOnCorner { kind: ItemKind },
    #[error("no hay {} en la bolsa", item_label(*kind))]
    EmptyBag { kind: ItemKind },
    #[error("la posicion ({x}, {y}) esta fuera de la ciudad")]
    OutOfBounds { x: i32, y: i32 },
    #[error("la posicion ({x}, {y}) esta fuera de sus areas")]
    OutsideArea { x: i32, y: i32 },
    #[error("se supero el limite de {limit} llamadas anidadas")]
    CallDepthExceeded { limit: usize },
}

fn item_label(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Flower => "flor",
        ItemKind::Paper => "papel",
    }
}

/// What an actor may touch while stepping: the shared item store, the city limits, and the
/// log batch for the current tick.
#[derive(Debug)]
pub struct StepContext<'a> {
    pub items: &'a mut ItemStore,
    pub bounds: CityBounds,
    pub log: &'a mut LogBatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    descriptor: ProgramDescriptor,
    x: i32,
    y: i32,
    heading: Heading,
    inventory: Inventory,
    variables: Vec<Variable>,
    frames: Vec<Frame>,
    scopes: Vec<Vec<Variable>>,
    active: bool,
    steps: u64,
    last_error: Option<RuntimeError>,
}

impl Actor {
    pub fn new(descriptor: ProgramDescriptor) -> Self {
        let frames = if descriptor.statements.is_empty() {
            Vec::new()
        } else {
            vec![Frame::root(descriptor.statements.clone())]
        };
        Self {
            x: descriptor.x,
            y: descriptor.y,
            heading: Heading::default(),
            inventory: descriptor.inventory,
            variables: descriptor.variables.clone(),
            active: !frames.is_empty(),
            frames,
            scopes: Vec::new(),
            steps: 0,
            last_error: None,
            descriptor,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.descriptor.identifier
    }

    pub fn descriptor(&self) -> &ProgramDescriptor {
        &self.descriptor
    }

    pub fn sprite_key(&self) -> &str {
        &self.descriptor.src
    }

    pub fn areas(&self) -> &[Area] {
        &self.descriptor.areas
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn inventory(&self) -> Inventory {
        self.inventory
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Statements executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    /// Advances the program by exactly one statement. Returns whether the actor is still active.
    ///
    /// A runtime error is written to the log as an `error` record and deactivates only this
    /// actor.
    pub fn update(&mut self, ctx: &mut StepContext<'_>) -> bool {
        if !self.active {
            return false;
        }

        self.unwind();
        let Some(statement) = self.current_statement() else {
            self.active = false;
            return false;
        };

        match self.execute(&statement, ctx) {
            Ok(()) => {
                self.steps = self.steps.saturating_add(1);
                self.unwind();
                if self.frames.is_empty() {
                    self.active = false;
                    debug!(robot = self.identifier(), steps = self.steps, "actor_finished");
                }
            }
            Err(error) => {
                warn!(
                    robot = self.identifier(),
                    error = %error,
                    x = self.x,
                    y = self.y,
                    "actor_runtime_error"
                );
                ctx.log
                    .push(LogRecord::error(format!("{}: {error}", self.identifier())));
                self.halt(error);
            }
        }

        self.active
    }

    fn halt(&mut self, error: RuntimeError) {
        self.frames.clear();
        self.scopes.clear();
        self.active = false;
        self.last_error = Some(error);
    }
}
