use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Weighted bucket an indicator belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Conflict,
    Macro,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Food, Category::Conflict, Category::Macro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Conflict => "conflict",
            Category::Macro => "macro",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "food" => Ok(Category::Food),
            "conflict" => Ok(Category::Conflict),
            "macro" => Ok(Category::Macro),
            other => Err(EngineError::UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorObservation {
    pub country_iso3: String,
    pub date: NaiveDate,
    pub indicator_id: String,
    pub value: f64,
    pub unit: String,
    pub source: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorMeta {
    pub indicator_id: String,
    pub indicator_name: String,
    pub category: Category,
    pub unit: String,
    pub source: String,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedScore {
    pub indicator_id: String,
    pub raw_value: f64,
    pub score: f64,
}

/// Output of one scoring pass. Recomputed on every query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScorePack {
    pub overall_risk: f64,
    /// Only categories with at least one indicator in the pass appear here.
    pub category_scores: BTreeMap<Category, f64>,
    pub weights: BTreeMap<Category, f64>,
    pub normalized_inputs: BTreeMap<String, f64>,
    /// Descending by score; ties keep the order of the latest rows.
    pub contributors: Vec<(String, f64)>,
}

impl RiskScorePack {
    pub fn contributor_ids(&self) -> Vec<String> {
        self.contributors.iter().map(|(id, _)| id.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Above,
    Below,
}

impl AlertDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertDirection::Above => "above",
            AlertDirection::Below => "below",
        }
    }
}

impl FromStr for AlertDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "above" => Ok(AlertDirection::Above),
            "below" => Ok(AlertDirection::Below),
            other => anyhow::bail!("unknown alert direction {other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub alert_id: Uuid,
    pub country_iso3: String,
    pub indicator_id: String,
    pub direction: AlertDirection,
    pub threshold: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertHit {
    pub alert_id: Uuid,
    pub indicator_id: String,
    pub observed_value: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub event_id: Uuid,
    pub indicator_id: String,
    pub triggered_at: DateTime<Utc>,
    pub observed_value: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ScenarioRecord {
    pub country_iso3: String,
    pub shock_type: String,
    pub severity: f64,
    pub horizon: i32,
}

#[derive(Debug, Clone)]
pub struct IngestionRun {
    pub country_iso3: String,
    pub mode: String,
    pub row_count: i64,
    pub ingested_at: DateTime<Utc>,
}
