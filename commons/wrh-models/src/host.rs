use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use validator::Validate;

/// One physical replica endpoint serving part of a shard group.
///
/// Hosts are compared by the full `(identity, address, port)` triple, which
/// is also the key used when diffing installed connections against a target
/// version. The owning group is carried by the enclosing [`crate::ConfigVersion`].
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Validate,
)]
pub struct ShardHost {
    #[validate(length(min = 1, message = "Host identity cannot be empty"))]
    pub identity: String,
    #[validate(length(min = 1, message = "Host address cannot be empty"))]
    pub address: String,
    #[validate(range(min = 1, message = "Host port must be greater than zero"))]
    pub port: u16,
}

impl ShardHost {
    pub fn new(
        identity: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            identity: identity.into(),
            address: address.into(),
            port,
        }
    }

    pub fn key(&self) -> HostKey {
        HostKey(format!("{}@{}:{}", self.identity, self.address, self.port))
    }
}

impl Display for ShardHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.identity, self.address, self.port)
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HostKey(pub String);

impl Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_covers_identity_address_and_port() {
        let a = ShardHost::new("replica1", "localhost", 5433);
        let b = ShardHost::new("replica1", "localhost", 5434);
        assert_eq!(a.key().to_string(), "replica1@localhost:5433");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn rejects_empty_identity_and_zero_port() {
        let host = ShardHost::new("", "localhost", 0);
        let errors = host.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("identity"));
        assert!(fields.contains_key("port"));
        assert!(!fields.contains_key("address"));
    }
}
