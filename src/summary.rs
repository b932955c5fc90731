use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{AlertEvent, IndicatorObservation, RiskScorePack};

const MAX_SUMMARY_DRIVERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    Low,
    Moderate,
    High,
}

impl Posture {
    /// Bands include their lower bound: 70 is high, 40 is moderate.
    pub fn from_risk(risk: f64) -> Self {
        if risk >= 70.0 {
            Posture::High
        } else if risk >= 40.0 {
            Posture::Moderate
        } else {
            Posture::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Posture::Low => "low",
            Posture::Moderate => "moderate",
            Posture::High => "high",
        }
    }
}

/// One-paragraph risk posture statement. `top_contributors` is expected in
/// ranked order; only the first three are named.
pub fn deterministic_summary(
    country: &str,
    risk: f64,
    top_contributors: &[String],
    alert_count: usize,
) -> String {
    let posture = Posture::from_risk(risk);
    let drivers = if top_contributors.is_empty() {
        "stable indicators".to_string()
    } else {
        top_contributors
            .iter()
            .take(MAX_SUMMARY_DRIVERS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "{country} shows a {} risk posture (score {risk:.1}/100). \
         Primary contributors are {drivers}. \
         Triggered alerts in this view: {alert_count}.",
        posture.as_str()
    )
}

pub fn build_report(
    country: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    pack: &RiskScorePack,
    latest: &[IndicatorObservation],
    events: &[AlertEvent],
) -> String {
    let summary = deterministic_summary(country, pack.overall_risk, &pack.contributor_ids(), events.len());
    let mut output = String::new();
    let window_label = match (start, end) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        (Some(start), None) => format!("since {start}"),
        (None, Some(end)) => format!("up to {end}"),
        (None, None) => "all available dates".to_string(),
    };

    let _ = writeln!(output, "# Food Security Risk Report: {country}");
    let _ = writeln!(output, "Window: {window_label}");
    let _ = writeln!(output);
    let _ = writeln!(output, "{summary}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Scores");

    for (category, weight) in pack.weights.iter() {
        match pack.category_scores.get(category) {
            Some(score) => {
                let _ = writeln!(output, "- {category}: {score:.2} (weight {weight:.2})");
            }
            None => {
                let _ = writeln!(output, "- {category}: no data (weight {weight:.2})");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Contributors");

    if pack.contributors.is_empty() {
        let _ = writeln!(output, "No indicators scored for this window.");
    } else {
        for (indicator_id, score) in pack.contributors.iter().take(10) {
            let _ = writeln!(output, "- {indicator_id}: {score:.2}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Values");

    if latest.is_empty() {
        let _ = writeln!(output, "No observations recorded for this window.");
    } else {
        for row in latest {
            let _ = writeln!(
                output,
                "- {} ({}): {} {} on {} [{}]",
                row.indicator_id, row.category, row.value, row.unit, row.date, row.source
            );
        }
    }

    let mut recent_events = events.to_vec();
    recent_events.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Alert Events");

    if recent_events.is_empty() {
        let _ = writeln!(output, "No alerts triggered.");
    } else {
        for event in recent_events.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} observed {} on {} (triggered {})",
                event.indicator_id,
                event.observed_value,
                event.date,
                event.triggered_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::config::ScoringConfig;
    use crate::models::Category;

    fn names(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn summary_names_country_posture_and_alerts() {
        let text = deterministic_summary("KEN", 75.0, &names(&["inflation", "conflict_events"]), 3);
        assert!(text.contains("KEN"));
        assert!(text.contains("high"));
        assert!(text.contains("3"));
        assert!(text.contains("inflation, conflict_events"));
    }

    #[test]
    fn posture_bands_include_lower_bound() {
        assert_eq!(Posture::from_risk(70.0), Posture::High);
        assert_eq!(Posture::from_risk(69.99), Posture::Moderate);
        assert_eq!(Posture::from_risk(40.0), Posture::Moderate);
        assert_eq!(Posture::from_risk(39.99), Posture::Low);
        assert_eq!(Posture::from_risk(0.0), Posture::Low);
    }

    #[test]
    fn lists_at_most_three_drivers() {
        let text = deterministic_summary("YEM", 50.0, &names(&["a", "b", "c", "d"]), 0);
        assert!(text.contains("a, b, c."));
        assert!(!text.contains("d."));
        assert!(text.contains("moderate"));
    }

    #[test]
    fn empty_contributors_read_as_stable() {
        let text = deterministic_summary("SDN", 12.345, &[], 0);
        assert_eq!(
            text,
            "SDN shows a low risk posture (score 12.3/100). \
             Primary contributors are stable indicators. \
             Triggered alerts in this view: 0."
        );
    }

    #[test]
    fn report_marks_missing_categories_and_events() {
        let pack = RiskScorePack {
            overall_risk: 40.0,
            category_scores: BTreeMap::from([(Category::Food, 100.0)]),
            weights: ScoringConfig::default().weights,
            normalized_inputs: BTreeMap::from([("food_price_stress".to_string(), 100.0)]),
            contributors: vec![("food_price_stress".to_string(), 100.0)],
        };
        let events = vec![AlertEvent {
            event_id: Uuid::new_v4(),
            indicator_id: "food_price_stress".to_string(),
            triggered_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            observed_value: 80.0,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }];

        let report = build_report("KEN", NaiveDate::from_ymd_opt(2020, 1, 1), None, &pack, &[], &events);
        assert!(report.contains("# Food Security Risk Report: KEN"));
        assert!(report.contains("Window: since 2020-01-01"));
        assert!(report.contains("- food: 100.00 (weight 0.40)"));
        assert!(report.contains("- conflict: no data (weight 0.35)"));
        assert!(report.contains("Triggered alerts in this view: 1."));
        assert!(report.contains("food_price_stress observed 80 on 2024-01-01 (triggered 2024-03-01 09:30 UTC)"));
    }
}
