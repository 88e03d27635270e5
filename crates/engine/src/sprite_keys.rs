use thiserror::Error;

/// Distinct robot sprites; instance `i` uses variant `i % ROBOT_SPRITE_VARIANTS`.
pub const ROBOT_SPRITE_VARIANTS: usize = 8;
pub const FLOWER_SPRITE_KEY: &str = "city/object/item/flower";
pub const PAPER_SPRITE_KEY: &str = "city/object/item/paper";

const ROBOT_SPRITE_PREFIX: &str = "city/object/robot/robot-32x8-";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key must not be empty")]
    Empty,
    #[error("sprite key must not start with '/'")]
    LeadingSlash,
    #[error("sprite key must not contain '\\'")]
    Backslash,
    #[error("sprite key must not contain '..'")]
    ParentTraversal,
    #[error("sprite key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

pub fn robot_sprite_key(instance_index: usize) -> String {
    format!(
        "{ROBOT_SPRITE_PREFIX}{}",
        instance_index % ROBOT_SPRITE_VARIANTS
    )
}

pub(crate) fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    if key.is_empty() {
        return Err(SpriteKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(SpriteKeyError::LeadingSlash);
    }
    if key.contains('\\') {
        return Err(SpriteKeyError::Backslash);
    }
    if key.contains("..") {
        return Err(SpriteKeyError::ParentTraversal);
    }
    for ch in key.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
            continue;
        }
        return Err(SpriteKeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_keys_cycle_through_variants() {
        assert_eq!(robot_sprite_key(0), "city/object/robot/robot-32x8-0");
        assert_eq!(robot_sprite_key(7), "city/object/robot/robot-32x8-7");
        assert_eq!(robot_sprite_key(8), robot_sprite_key(0));
        assert_eq!(robot_sprite_key(21), robot_sprite_key(5));
    }

    #[test]
    fn generated_keys_are_valid() {
        for index in 0..ROBOT_SPRITE_VARIANTS {
            let key = robot_sprite_key(index);
            assert!(validate_sprite_key(&key).is_ok(), "key={key}");
        }
        assert!(validate_sprite_key(FLOWER_SPRITE_KEY).is_ok());
        assert!(validate_sprite_key(PAPER_SPRITE_KEY).is_ok());
    }

    #[test]
    fn rejects_invalid_keys() {
        for key in ["", "/a", "..", "a/../b", r"a\b", "A", "a.b"] {
            assert!(validate_sprite_key(key).is_err(), "key={key}");
        }
    }
}
