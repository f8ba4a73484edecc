//! Caller identity and group write scopes.

use depot_core::config::WILDCARD_SCOPE;
use depot_core::{AppError, Config};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    All,
    Groups(HashSet<String>),
}

/// An authenticated caller and the groups it may write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub label: String,
    scope: Scope,
}

impl Caller {
    /// Caller with write access to every group.
    pub fn unrestricted(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            scope: Scope::All,
        }
    }

    pub fn with_groups<I, S>(label: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            scope: Scope::Groups(groups.into_iter().map(Into::into).collect()),
        }
    }

    pub fn can_write(&self, group_id: &str) -> bool {
        match &self.scope {
            Scope::All => true,
            Scope::Groups(groups) => groups.contains(group_id),
        }
    }

    pub fn authorize_write(&self, group_id: &str) -> Result<(), AppError> {
        if self.can_write(group_id) {
            Ok(())
        } else {
            tracing::warn!(caller = %self.label, group_id = %group_id, "Write outside caller scope rejected");
            Err(AppError::Forbidden(format!(
                "Caller lacks write access to group '{}'",
                group_id
            )))
        }
    }
}

/// Resolves a bearer token into a [`Caller`].
pub trait AccessPolicy: Send + Sync {
    fn authenticate(&self, bearer_token: Option<&str>) -> Result<Caller, AppError>;
}

/// Open access for local development: every request is an unrestricted caller.
#[derive(Debug, Default, Clone)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn authenticate(&self, _bearer_token: Option<&str>) -> Result<Caller, AppError> {
        Ok(Caller::unrestricted("anonymous"))
    }
}

/// Fixed token table loaded from configuration.
#[derive(Clone)]
pub struct StaticTokens {
    tokens: Vec<(String, Caller)>,
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

impl StaticTokens {
    pub fn new(grants: &HashMap<String, Vec<String>>) -> Self {
        let tokens = grants
            .iter()
            .enumerate()
            .map(|(index, (token, scopes))| {
                let label = format!("token-{}", index + 1);
                let caller = if scopes.iter().any(|s| s == WILDCARD_SCOPE) {
                    Caller::unrestricted(label)
                } else {
                    Caller::with_groups(label, scopes.iter().cloned())
                };
                (token.clone(), caller)
            })
            .collect();
        Self { tokens }
    }
}

impl AccessPolicy for StaticTokens {
    fn authenticate(&self, bearer_token: Option<&str>) -> Result<Caller, AppError> {
        let token = bearer_token
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        // Compare against every entry so timing does not reveal the match position
        let mut matched = None;
        for (candidate, caller) in &self.tokens {
            if secure_compare(candidate, token) {
                matched = Some(caller);
            }
        }

        matched
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Invalid bearer token".to_string()))
    }
}

pub fn create_access_policy(config: &Config) -> Arc<dyn AccessPolicy> {
    if config.api_tokens.is_empty() {
        tracing::warn!("API_TOKENS not set, all callers have write access to every group");
        Arc::new(AllowAll)
    } else {
        tracing::info!(tokens = config.api_tokens.len(), "Static token access policy enabled");
        Arc::new(StaticTokens::new(&config.api_tokens))
    }
}
