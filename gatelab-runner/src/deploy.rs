//! Deploy scope validation — pure invariant check against deployment policy.
//!
//! The policy defines the fixed superset of symbols ever permitted to reach
//! deployment, independent of what the gate decided this run. A violation
//! is a policy breach, not a statistics problem: it is a distinct fatal
//! error type that must abort any downstream deployment action.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gate::TradableScope;

/// Deployment policy: allowed superset plus the single mandated symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployPolicy {
    /// Every symbol that may ever appear in a deploy-bound scope.
    pub allowed: BTreeSet<String>,
    /// Under the single-symbol policy, the only symbol allowed to deploy
    /// (and the gate's fallback). Must be a member of `allowed`.
    pub mandated_symbol: String,
}

impl DeployPolicy {
    /// Single-symbol policy: `allowed = {mandated}`.
    pub fn single(mandated_symbol: impl Into<String>) -> Self {
        let mandated_symbol = mandated_symbol.into();
        Self {
            allowed: BTreeSet::from([mandated_symbol.clone()]),
            mandated_symbol,
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.allowed.contains(symbol)
    }
}

/// Errors from policy validation.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("mandated_symbol '{0}' is not in the allowed set")]
    MandatedNotAllowed(String),
    #[error("allowed set must be non-empty")]
    EmptyAllowedSet,
}

impl DeployPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.allowed.is_empty() {
            return Err(PolicyError::EmptyAllowedSet);
        }
        if !self.allowed.contains(&self.mandated_symbol) {
            return Err(PolicyError::MandatedNotAllowed(self.mandated_symbol.clone()));
        }
        Ok(())
    }
}

/// Fatal policy breach: the scope escaped the allowed deploy set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("deploy scope violation: expected {expected:?}, got {actual:?}")]
pub struct DeployScopeViolation {
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

/// Validate a scope against the policy.
///
/// Checks `scope ⊆ allowed`; under the single-symbol policy the scope must
/// equal exactly `{mandated}`. Returns the human-readable confirmation
/// string on success.
pub fn validate_scope(
    scope: &TradableScope,
    policy: &DeployPolicy,
) -> Result<String, DeployScopeViolation> {
    let violation = || DeployScopeViolation {
        expected: policy.allowed.iter().cloned().collect(),
        actual: scope.symbols.clone(),
    };

    if scope.symbols.iter().any(|s| !policy.contains(s)) {
        return Err(violation());
    }

    if policy.allowed.len() == 1 && scope.symbols != vec![policy.mandated_symbol.clone()] {
        return Err(violation());
    }

    Ok(format!("Deploy scope OK: {} only.", policy.mandated_symbol))
}
