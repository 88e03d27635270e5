use std::fs;
use std::path::{Path, PathBuf};

use city_engine::{
    program_fingerprint, Program, ProgramFingerprint, ProgramSource, ProgramSourceError,
};
use tracing::{debug, info, warn};

/// Program description read from disk on every start, so edits are picked up after a reset.
#[derive(Debug)]
pub(crate) struct ProgramFile {
    path: PathBuf,
    last_fingerprint: Option<ProgramFingerprint>,
}

impl ProgramFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_fingerprint: None,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn note_fingerprint(&mut self, program: &Program) {
        let fingerprint = match program_fingerprint(program) {
            Ok(fingerprint) => fingerprint,
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "program_fingerprint_failed");
                return;
            }
        };
        match self.last_fingerprint {
            None => info!(
                path = %self.path.display(),
                fingerprint = %fingerprint.short_hex(),
                robots = program.instances.len(),
                "program_loaded"
            ),
            Some(previous) if previous != fingerprint => info!(
                path = %self.path.display(),
                previous = %previous.short_hex(),
                fingerprint = %fingerprint.short_hex(),
                "program_reloaded"
            ),
            Some(_) => debug!(path = %self.path.display(), "program_unchanged"),
        }
        self.last_fingerprint = Some(fingerprint);
    }
}

impl ProgramSource for ProgramFile {
    fn load_program(&mut self) -> Result<Program, ProgramSourceError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| ProgramSourceError::ReadFile {
            path: self.path.clone(),
            source,
        })?;
        let program = parse_program_json(&self.path, &raw)?;
        self.note_fingerprint(&program);
        Ok(program)
    }
}

fn parse_program_json(path: &Path, raw: &str) -> Result<Program, ProgramSourceError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, Program>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ProgramSourceError::InvalidJson {
            path: path.to_path_buf(),
            json_path,
            message: error.into_inner().to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"{
        "ROBOT_TYPES": [{ "identifier": "t", "local_variables": [], "body": [{ "type": "mover" }] }],
        "INSTANCES": [{ "identifier": "r1", "type": "t" }]
    }"#;

    #[test]
    fn loads_program_and_tracks_fingerprint() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("program.json");
        fs::write(&path, MINIMAL).expect("write program");
        let mut source = ProgramFile::new(path.clone());

        let program = source.load_program().expect("program loads");
        assert_eq!(program.instances.len(), 1);
        let first = source.last_fingerprint.expect("fingerprint recorded");

        fs::write(&path, MINIMAL.replace("mover", "derecha")).expect("rewrite program");
        source.load_program().expect("program reloads");
        assert_ne!(source.last_fingerprint, Some(first));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp = TempDir::new().expect("temp dir");
        let mut source = ProgramFile::new(temp.path().join("absent.json"));

        let error = source.load_program().expect_err("missing file");
        assert!(matches!(error, ProgramSourceError::ReadFile { .. }));
    }

    #[test]
    fn invalid_json_reports_path_to_offending_field() {
        let raw = r#"{ "INSTANCES": [{ "identifier": "r1", "type": 7 }] }"#;
        let error = parse_program_json(Path::new("bad.json"), raw).expect_err("invalid");

        match error {
            ProgramSourceError::InvalidJson { json_path, .. } => {
                assert_eq!(json_path, "INSTANCES[0].type");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
