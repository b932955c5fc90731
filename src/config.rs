use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::Category;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Category weights and the set of indicators where higher means lower risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: BTreeMap<Category, f64>,
    pub inverted: BTreeSet<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                (Category::Food, 0.4),
                (Category::Conflict, 0.35),
                (Category::Macro, 0.25),
            ]),
            inverted: BTreeSet::from(["gdp_growth".to_string()]),
        }
    }
}

impl ScoringConfig {
    /// Fills absent categories with a zero weight and checks that the
    /// weights are non-negative and sum to 1.0.
    pub fn validated(mut self) -> Result<Self, EngineError> {
        for category in Category::ALL {
            self.weights.entry(category).or_insert(0.0);
        }
        let sum: f64 = self.weights.values().sum();
        let negative = self.weights.values().any(|w| !w.is_finite() || *w < 0.0);
        if negative || (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EngineError::InvalidWeights { sum });
        }
        Ok(self)
    }

    pub fn is_inverted(&self, indicator_id: &str) -> bool {
        self.inverted.contains(indicator_id)
    }
}

/// Named shock profiles: `shock_type -> indicator_id -> sensitivity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShockProfiles(pub BTreeMap<String, BTreeMap<String, f64>>);

fn profile(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|(id, factor)| (id.to_string(), *factor))
        .collect()
}

impl Default for ShockProfiles {
    fn default() -> Self {
        Self(BTreeMap::from([
            (
                "currency_depreciation".to_string(),
                profile(&[
                    ("inflation", 0.35),
                    ("food_price_stress", 0.25),
                    ("currency_pressure", 0.6),
                ]),
            ),
            (
                "commodity_price_spike".to_string(),
                profile(&[("food_price_stress", 0.7), ("inflation", 0.2)]),
            ),
            (
                "conflict_spike".to_string(),
                profile(&[
                    ("conflict_events", 0.8),
                    ("undernourishment", 0.25),
                    ("food_price_stress", 0.2),
                ]),
            ),
        ]))
    }
}

impl ShockProfiles {
    /// Sensitivity for an indicator under a shock. Unknown shocks and
    /// indicators outside the profile both yield 0.0.
    pub fn sensitivity(&self, shock_type: &str, indicator_id: &str) -> f64 {
        self.0
            .get(shock_type)
            .and_then(|profile| profile.get(indicator_id))
            .copied()
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub shocks: ShockProfiles,
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(raw).context("failed to parse engine config")?;
        Ok(Self {
            scoring: config.scoring.validated()?,
            shocks: config.shocks,
        })
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_json(&raw)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Settings read from the process environment.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub database_url: String,
    pub demo_data_dir: PathBuf,
}

impl AppSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a Postgres instance")?;
        let demo_data_dir = std::env::var("DEMO_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/demo"));
        Ok(Self {
            database_url,
            demo_data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let config = ScoringConfig::default().validated().unwrap();
        let sum: f64 = config.weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(config.is_inverted("gdp_growth"));
        assert!(!config.is_inverted("inflation"));
    }

    #[test]
    fn partial_config_keeps_default_shocks() {
        let config = EngineConfig::from_json(
            r#"{"scoring": {"weights": {"food": 0.5, "conflict": 0.5}}}"#,
        )
        .unwrap();
        assert_eq!(config.scoring.weights[&Category::Macro], 0.0);
        assert!(config.scoring.is_inverted("gdp_growth"));
        assert_eq!(config.shocks, ShockProfiles::default());
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let err = EngineConfig::from_json(
            r#"{"scoring": {"weights": {"food": 0.5, "conflict": 0.2, "macro": 0.1}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sum"));
    }

    #[test]
    fn rejects_negative_weight() {
        let config = ScoringConfig {
            weights: BTreeMap::from([
                (Category::Food, 1.2),
                (Category::Conflict, -0.2),
                (Category::Macro, 0.0),
            ]),
            inverted: BTreeSet::new(),
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn unknown_shock_has_zero_sensitivity() {
        let shocks = ShockProfiles::default();
        assert_eq!(shocks.sensitivity("currency_depreciation", "inflation"), 0.35);
        assert_eq!(shocks.sensitivity("currency_depreciation", "gdp_growth"), 0.0);
        assert_eq!(shocks.sensitivity("locust_swarm", "inflation"), 0.0);
    }
}
