use std::fmt;

use sha2::{Digest, Sha256};

use super::Program;

/// SHA-256 over the canonical JSON form of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramFingerprint([u8; 32]);

impl ProgramFingerprint {
    pub fn to_hex(&self) -> String {
        let mut output = String::with_capacity(self.0.len() * 2);
        for byte in self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut output, "{byte:02x}");
        }
        output
    }

    /// First 12 hex characters, enough to tell runs apart in logs.
    pub fn short_hex(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl fmt::Display for ProgramFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub fn program_fingerprint(program: &Program) -> Result<ProgramFingerprint, serde_json::Error> {
    let bytes = serde_json::to_vec(program)?;
    let digest = Sha256::digest(&bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(ProgramFingerprint(out))
}
