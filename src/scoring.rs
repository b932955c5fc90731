use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;

use crate::config::ScoringConfig;
use crate::error::EngineError;
use crate::models::{Category, IndicatorObservation, NormalizedScore, RiskScorePack};
use crate::normalize::{normalize, round2};

/// Turns indicator observations into category and overall risk scores.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Normalizes each latest row against the bounds its indicator spans in
    /// `window_rows`. An indicator with no window history is scored against
    /// its own value alone and lands on the midpoint.
    pub fn normalize_latest(
        &self,
        window_rows: &[IndicatorObservation],
        latest_rows: &[IndicatorObservation],
    ) -> Result<Vec<NormalizedScore>, EngineError> {
        ensure_finite(window_rows)?;
        ensure_finite(latest_rows)?;

        let mut by_indicator: HashMap<&str, Vec<f64>> = HashMap::new();
        for row in window_rows {
            by_indicator
                .entry(row.indicator_id.as_str())
                .or_default()
                .push(row.value);
        }

        let mut seen = HashSet::new();
        let mut scores = Vec::with_capacity(latest_rows.len());
        for row in latest_rows {
            if !seen.insert(row.indicator_id.as_str()) {
                return Err(EngineError::DuplicateLatest {
                    indicator_id: row.indicator_id.clone(),
                });
            }
            let fallback = [row.value];
            let window = by_indicator
                .get(row.indicator_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&fallback);
            let invert = self.config.is_inverted(&row.indicator_id);
            scores.push(NormalizedScore {
                indicator_id: row.indicator_id.clone(),
                raw_value: row.value,
                score: normalize(row.value, window, invert),
            });
        }
        Ok(scores)
    }

    pub fn compute_scores(
        &self,
        window_rows: &[IndicatorObservation],
        latest_rows: &[IndicatorObservation],
    ) -> Result<RiskScorePack, EngineError> {
        let scores = self.normalize_latest(window_rows, latest_rows)?;

        let mut normalized_inputs = BTreeMap::new();
        let mut buckets: BTreeMap<Category, Vec<f64>> = BTreeMap::new();
        for (row, norm) in latest_rows.iter().zip(&scores) {
            normalized_inputs.insert(norm.indicator_id.clone(), round2(norm.score));
            buckets.entry(row.category).or_default().push(norm.score);
        }

        let category_scores: BTreeMap<Category, f64> = buckets
            .into_iter()
            .map(|(category, values)| {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                (category, round2(mean))
            })
            .collect();

        // Absent categories contribute 0.0 but stay out of `category_scores`.
        let overall: f64 = self
            .config
            .weights
            .iter()
            .map(|(category, weight)| weight * category_scores.get(category).copied().unwrap_or(0.0))
            .sum();

        let mut ranked: Vec<&NormalizedScore> = scores.iter().collect();
        // `sort_by` is stable, so equal scores keep the latest-row order.
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let contributors = ranked
            .into_iter()
            .map(|s| (s.indicator_id.clone(), round2(s.score)))
            .collect();

        Ok(RiskScorePack {
            overall_risk: round2(overall).clamp(0.0, 100.0),
            category_scores,
            weights: self.config.weights.clone(),
            normalized_inputs,
            contributors,
        })
    }

    /// Overall risk as it stood on each distinct date in `rows`, scoring only
    /// the observations recorded up to and including that date.
    pub fn score_trend(
        &self,
        rows: &[IndicatorObservation],
    ) -> Result<Vec<(NaiveDate, f64)>, EngineError> {
        let dates: BTreeSet<NaiveDate> = rows.iter().map(|row| row.date).collect();
        let mut trend = Vec::with_capacity(dates.len());

        for date in dates {
            let upto: Vec<IndicatorObservation> =
                rows.iter().filter(|row| row.date <= date).cloned().collect();
            let latest = latest_per_indicator(&upto);
            let pack = self.compute_scores(&upto, &latest)?;
            trend.push((date, pack.overall_risk));
        }

        Ok(trend)
    }
}

fn ensure_finite(rows: &[IndicatorObservation]) -> Result<(), EngineError> {
    match rows.iter().find(|row| !row.value.is_finite()) {
        Some(row) => Err(EngineError::NonFiniteValue {
            indicator_id: row.indicator_id.clone(),
            date: row.date,
            value: row.value,
        }),
        None => Ok(()),
    }
}

/// Rows inside the inclusive `[start, end]` range whose indicator is in
/// `indicators`. An empty indicator list selects every indicator.
pub fn filter_window(
    rows: &[IndicatorObservation],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    indicators: &[String],
) -> Vec<IndicatorObservation> {
    rows.iter()
        .filter(|row| start.map_or(true, |start| row.date >= start))
        .filter(|row| end.map_or(true, |end| row.date <= end))
        .filter(|row| indicators.is_empty() || indicators.contains(&row.indicator_id))
        .cloned()
        .collect()
}

/// Most recent row per indicator, ordered by indicator id.
pub fn latest_per_indicator(rows: &[IndicatorObservation]) -> Vec<IndicatorObservation> {
    let mut latest: BTreeMap<&str, &IndicatorObservation> = BTreeMap::new();
    for row in rows {
        let entry = latest.entry(row.indicator_id.as_str()).or_insert(row);
        if row.date >= entry.date {
            *entry = row;
        }
    }
    latest.into_values().cloned().collect()
}
