use std::path::PathBuf;

use thiserror::Error;

use super::Program;

#[derive(Debug, Error)]
pub enum ProgramSourceError {
    #[error("failed to read program file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid program JSON in {path} at '{json_path}': {message}")]
    InvalidJson {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("no program has been loaded")]
    Empty,
}

/// Storage collaborator the scheduler asks for a fresh program on every start.
pub trait ProgramSource {
    fn load_program(&mut self) -> Result<Program, ProgramSourceError>;
}

/// In-memory source, used by tests and by callers that already hold a parsed program.
#[derive(Debug, Clone, Default)]
pub struct StaticProgram {
    program: Option<Program>,
}

impl StaticProgram {
    pub fn new(program: Program) -> Self {
        Self {
            program: Some(program),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl ProgramSource for StaticProgram {
    fn load_program(&mut self) -> Result<Program, ProgramSourceError> {
        self.program.clone().ok_or(ProgramSourceError::Empty)
    }
}
