use std::collections::HashMap;

use crate::models::{AlertDirection, AlertHit, AlertRule, IndicatorObservation};

/// Checks one rule against the latest reading of its indicator.
pub fn evaluate_rule(rule: &AlertRule, latest: &IndicatorObservation) -> Option<AlertHit> {
    let triggered = match rule.direction {
        AlertDirection::Above => latest.value >= rule.threshold,
        AlertDirection::Below => latest.value <= rule.threshold,
    };

    triggered.then(|| AlertHit {
        alert_id: rule.alert_id,
        indicator_id: rule.indicator_id.clone(),
        observed_value: latest.value,
        date: latest.date,
    })
}

/// Sweeps `rules` over the latest value per indicator. Rules whose indicator
/// has no reading are skipped.
pub fn evaluate_rules(rules: &[AlertRule], latest: &[IndicatorObservation]) -> Vec<AlertHit> {
    let by_indicator: HashMap<&str, &IndicatorObservation> = latest
        .iter()
        .map(|row| (row.indicator_id.as_str(), row))
        .collect();

    rules
        .iter()
        .filter_map(|rule| {
            by_indicator
                .get(rule.indicator_id.as_str())
                .and_then(|row| evaluate_rule(rule, row))
        })
        .collect()
}
