//! Building the ordered sid list of an authenticated caller.

use serde::{Deserialize, Serialize};

use pipehub_entity::permission::Sid;

/// What the authentication layer knows about the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthContext {
    /// User name.
    pub username: String,
    /// Granted authorities (roles and groups), e.g. `ROLE_USER`.
    #[serde(default)]
    pub authorities: Vec<String>,
}

impl AuthContext {
    /// Creates a context.
    pub fn new(username: impl Into<String>, authorities: Vec<String>) -> Self {
        Self {
            username: username.into(),
            authorities,
        }
    }
}

/// Maps an [`AuthContext`] to the sids used for resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidResolver;

impl SidResolver {
    /// The principal sid first, then one authority sid per distinct
    /// authority in the order given. Blank names are skipped.
    pub fn get_sids(context: &AuthContext) -> Vec<Sid> {
        let mut sids = Vec::with_capacity(context.authorities.len() + 1);
        let username = context.username.trim();
        if !username.is_empty() {
            sids.push(Sid::principal(username));
        }
        for authority in &context.authorities {
            let authority = authority.trim();
            if authority.is_empty() {
                continue;
            }
            let sid = Sid::authority(authority);
            if !sids.contains(&sid) {
                sids.push(sid);
            }
        }
        sids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipehub_entity::permission::Authority;

    #[test]
    fn test_principal_first_and_deduplicated() {
        let context = AuthContext::new(
            "alice",
            vec![
                "ROLE_USER".to_string(),
                "LAB".to_string(),
                "role_user".to_string(),
                " ".to_string(),
            ],
        );
        let sids = SidResolver::get_sids(&context);
        assert_eq!(
            sids,
            vec![
                Sid::principal("alice"),
                Sid::user_role(),
                Sid::authority("LAB"),
            ]
        );
        assert!(sids[1].is_authority(&Authority::User));
    }

    #[test]
    fn test_anonymous_has_no_principal() {
        let context = AuthContext::new("", vec!["ROLE_ADMIN".to_string()]);
        assert_eq!(SidResolver::get_sids(&context), vec![Sid::admin()]);
    }
}
