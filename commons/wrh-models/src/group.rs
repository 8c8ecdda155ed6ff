#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupNameError {
    #[error("Shard group name cannot be empty")]
    Empty,
    #[error("Shard group name `{0}` may only contain ASCII letters, digits, '-', '_' and '.'")]
    InvalidCharacter(String),
    #[error("Shard group name `{0}` is longer than 128 bytes")]
    TooLong(String),
}

pub const MAX_GROUP_NAME_LEN: usize = 128;

/// Group names end up in URL paths and snapshot file names, so they are
/// restricted to a conservative character set.
pub fn validate_group_name(group: &str) -> Result<(), GroupNameError> {
    if group.is_empty() {
        return Err(GroupNameError::Empty);
    }
    if group.len() > MAX_GROUP_NAME_LEN {
        return Err(GroupNameError::TooLong(group.to_string()));
    }
    let valid = group
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid || group.starts_with('.') {
        return Err(GroupNameError::InvalidCharacter(group.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_names() {
        assert!(validate_group_name("g1").is_ok());
        assert!(validate_group_name("orders_2024-eu.v2").is_ok());
    }

    #[test]
    fn rejects_path_like_names() {
        assert_eq!(validate_group_name(""), Err(GroupNameError::Empty));
        assert!(matches!(
            validate_group_name("../etc"),
            Err(GroupNameError::InvalidCharacter(_))
        ));
        assert!(matches!(
            validate_group_name("a/b"),
            Err(GroupNameError::InvalidCharacter(_))
        ));
        assert!(matches!(
            validate_group_name(".hidden"),
            Err(GroupNameError::InvalidCharacter(_))
        ));
    }
}
