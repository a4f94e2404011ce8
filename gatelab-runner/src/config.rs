//! Run configuration — one immutable structure, validated at run start.
//!
//! Every threshold the pipeline consults lives here as a named field with a
//! default, loadable from TOML. Validation happens once, up front; the rest
//! of the run treats the structure as read-only.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatelab_core::{CostError, CostModel, ParamsError, StrategyParams};

use crate::challenger::{ScoreWeights, SearchGrid};
use crate::deploy::{DeployPolicy, PolicyError};
use crate::gate::{GateConfigError, GateThresholds};
use crate::refresh::RefreshConfig;
use crate::rolling::{RollingConfig, RollingConfigError};
use crate::stress::{StressConfig, StressConfigError};

/// Challenger search settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub grid: SearchGrid,
    #[serde(default)]
    pub weights: ScoreWeights,
}

/// File locations of the run artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub champion: PathBuf,
    pub audit_log: PathBuf,
    pub leaderboard: PathBuf,
    pub promotion_matrix: PathBuf,
    pub tradable_scope: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            champion: PathBuf::from("outputs/champion.json"),
            audit_log: PathBuf::from("outputs/audit.csv"),
            leaderboard: PathBuf::from("outputs/leaderboard.csv"),
            promotion_matrix: PathBuf::from("outputs/promotion_matrix.csv"),
            tradable_scope: PathBuf::from("outputs/tradable_scope.csv"),
        }
    }
}

/// The full run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Candidate universe evaluated by the gate.
    pub universe: Vec<String>,
    #[serde(default)]
    pub strategy: StrategyParams,
    #[serde(default)]
    pub costs: CostModel,
    #[serde(default)]
    pub rolling: RollingConfig,
    #[serde(default)]
    pub stress: StressConfig,
    #[serde(default)]
    pub gate: GateThresholds,
    pub deploy: DeployPolicy,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub artifacts: ArtifactPaths,
}

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("universe must contain at least one symbol")]
    EmptyUniverse,
    #[error("gate fallback symbol '{0}' is outside the deploy policy")]
    FallbackOutsidePolicy(String),
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error(transparent)]
    Costs(#[from] CostError),
    #[error(transparent)]
    Rolling(#[from] RollingConfigError),
    #[error(transparent)]
    Stress(#[from] StressConfigError),
    #[error(transparent)]
    Gate(#[from] GateConfigError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl RunConfig {
    /// Sensible defaults over the original candidate universe.
    pub fn for_universe(universe: Vec<String>, mandated: impl Into<String>) -> Self {
        let mandated = mandated.into();
        Self {
            universe,
            strategy: StrategyParams::default(),
            costs: CostModel::default(),
            rolling: RollingConfig::default(),
            stress: StressConfig::default(),
            gate: GateThresholds {
                fallback_symbol: mandated.clone(),
                ..Default::default()
            },
            deploy: DeployPolicy::single(mandated),
            search: SearchSettings::default(),
            refresh: RefreshConfig::default(),
            artifacts: ArtifactPaths::default(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validate every section once; the config is read-only afterwards.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        self.strategy.validate()?;
        CostModel::new(self.costs.fee_per_trade, self.costs.slippage_per_trade)?;
        self.rolling.validate()?;
        self.stress.validate()?;
        self.gate.validate()?;
        self.deploy.validate()?;
        if !self.deploy.contains(&self.gate.fallback_symbol) {
            return Err(ConfigError::FallbackOutsidePolicy(
                self.gate.fallback_symbol.clone(),
            ));
        }
        Ok(())
    }
}
