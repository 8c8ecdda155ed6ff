use crate::error::VersionError;
use std::collections::HashMap;

/// Credentials accepted on the version query endpoint.
///
/// Provisioning of replica identities happens outside of the master; this is
/// only the table the query endpoint checks callers against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CredentialPolicy {
    #[default]
    AllowAll,
    Static(HashMap<String, String>),
}

impl CredentialPolicy {
    /// Parse `identity:secret` pairs separated by commas. An empty string
    /// yields [`CredentialPolicy::AllowAll`].
    pub fn parse(list: &str) -> Result<Self, String> {
        let mut table = HashMap::new();
        for pair in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (identity, secret) = pair
                .split_once(':')
                .ok_or_else(|| format!("expected `identity:secret`, got `{pair}`"))?;
            if identity.is_empty() {
                return Err(format!("empty identity in `{pair}`"));
            }
            table.insert(identity.to_string(), secret.to_string());
        }
        if table.is_empty() {
            Ok(CredentialPolicy::AllowAll)
        } else {
            Ok(CredentialPolicy::Static(table))
        }
    }

    pub fn verify(
        &self,
        identity: Option<&str>,
        credential: Option<&str>,
    ) -> Result<(), VersionError> {
        match self {
            CredentialPolicy::AllowAll => Ok(()),
            CredentialPolicy::Static(table) => {
                let identity = identity.ok_or_else(|| {
                    VersionError::Unauthorized("missing identity".into())
                })?;
                match (table.get(identity), credential) {
                    (Some(expected), Some(given)) if expected == given => Ok(()),
                    _ => Err(VersionError::Unauthorized(format!(
                        "credential rejected for `{identity}`"
                    ))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spec_allows_everyone() {
        let policy = CredentialPolicy::parse("").unwrap();
        assert_eq!(policy, CredentialPolicy::AllowAll);
        assert!(policy.verify(None, None).is_ok());
    }

    #[test]
    fn static_table_checks_secret() {
        let policy = CredentialPolicy::parse("replica1:pw1, replica2:pw2").unwrap();
        assert!(policy.verify(Some("replica1"), Some("pw1")).is_ok());
        assert!(policy.verify(Some("replica1"), Some("pw2")).is_err());
        assert!(policy.verify(Some("replica3"), Some("pw1")).is_err());
        assert!(policy.verify(None, Some("pw1")).is_err());
    }

    #[test]
    fn malformed_pair_is_rejected() {
        assert!(CredentialPolicy::parse("replica1").is_err());
        assert!(CredentialPolicy::parse(":pw").is_err());
    }
}
