//! Player tag sanitization.

/// Rejected player tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayerTagError {
    #[error("player tag is empty")]
    Empty,
    #[error("player tag contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Normalize a player tag for use in file names.
///
/// Surrounding whitespace and one leading '#' are dropped. The remainder must
/// be ASCII alphanumeric and is returned uppercased, so the result can never
/// contain a path separator.
pub fn sanitize_player_tag(tag: &str) -> Result<String, PlayerTagError> {
    let trimmed = tag.trim();
    let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(PlayerTagError::Empty);
    }
    if let Some(c) = trimmed.chars().find(|c| !c.is_ascii_alphanumeric()) {
        return Err(PlayerTagError::InvalidCharacter(c));
    }
    Ok(trimmed.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_accepts_common_forms() {
        assert_eq!(sanitize_player_tag("#abc123").unwrap(), "ABC123");
        assert_eq!(sanitize_player_tag("  #2PP  ").unwrap(), "2PP");
        assert_eq!(sanitize_player_tag("R90PRV0PY").unwrap(), "R90PRV0PY");
    }

    #[test]
    fn test_sanitize_rejects_bad_tags() {
        assert_eq!(sanitize_player_tag(""), Err(PlayerTagError::Empty));
        assert_eq!(sanitize_player_tag("  # "), Err(PlayerTagError::Empty));
        assert_eq!(
            sanitize_player_tag("../etc"),
            Err(PlayerTagError::InvalidCharacter('.'))
        );
        assert_eq!(
            sanitize_player_tag("AB/CD"),
            Err(PlayerTagError::InvalidCharacter('/'))
        );
        assert_eq!(
            sanitize_player_tag("##AB"),
            Err(PlayerTagError::InvalidCharacter('#'))
        );
    }
}
