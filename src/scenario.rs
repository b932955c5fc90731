use clap::ValueEnum;
use serde::Serialize;

use crate::config::ShockProfiles;
use crate::error::EngineError;
use crate::models::{IndicatorObservation, RiskScorePack};
use crate::normalize::round2;
use crate::scoring::Scorer;

/// Months that count as one full unit of shock sensitivity.
pub const REFERENCE_HORIZON_MONTHS: f64 = 12.0;

/// Shock types shipped with the default profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ShockType {
    CurrencyDepreciation,
    CommodityPriceSpike,
    ConflictSpike,
}

impl ShockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShockType::CurrencyDepreciation => "currency_depreciation",
            ShockType::CommodityPriceSpike => "commodity_price_spike",
            ShockType::ConflictSpike => "conflict_spike",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShockSimulator {
    profiles: ShockProfiles,
}

impl ShockSimulator {
    pub fn new(profiles: ShockProfiles) -> Self {
        Self { profiles }
    }

    /// Fractional bump applied to an indicator:
    /// `sensitivity * severity / 100 * horizon / 12`.
    pub fn bump(&self, shock_type: &str, indicator_id: &str, severity: f64, horizon: f64) -> f64 {
        self.profiles.sensitivity(shock_type, indicator_id)
            * (severity / 100.0)
            * (horizon / REFERENCE_HORIZON_MONTHS)
    }

    /// Returns a shocked copy of `rows`. Only `value` changes; indicators
    /// outside the shock profile (or any indicator under an unknown shock)
    /// are copied through unchanged. Severity and horizon are not clamped.
    pub fn simulate(
        &self,
        rows: &[IndicatorObservation],
        shock_type: &str,
        severity: f64,
        horizon: f64,
    ) -> Result<Vec<IndicatorObservation>, EngineError> {
        ensure_finite_parameter("severity", severity)?;
        ensure_finite_parameter("horizon", horizon)?;

        rows.iter()
            .map(|row| {
                if !row.value.is_finite() {
                    return Err(EngineError::NonFiniteValue {
                        indicator_id: row.indicator_id.clone(),
                        date: row.date,
                        value: row.value,
                    });
                }
                let bump = self.bump(shock_type, &row.indicator_id, severity, horizon);
                Ok(IndicatorObservation {
                    value: round2(row.value * (1.0 + bump)),
                    ..row.clone()
                })
            })
            .collect()
    }

    /// Scores `latest` before and after the shock against the same window.
    pub fn compare(
        &self,
        scorer: &Scorer,
        window: &[IndicatorObservation],
        latest: &[IndicatorObservation],
        shock_type: &str,
        severity: f64,
        horizon: f64,
    ) -> Result<ScenarioOutcome, EngineError> {
        let shocked = self.simulate(latest, shock_type, severity, horizon)?;
        let before = scorer.compute_scores(window, latest)?;
        let after = scorer.compute_scores(window, &shocked)?;

        let adjusted = latest
            .iter()
            .zip(&shocked)
            .map(|(old, new)| AdjustedValue {
                indicator_id: old.indicator_id.clone(),
                before: old.value,
                after: new.value,
            })
            .collect();

        Ok(ScenarioOutcome {
            shock_type: shock_type.to_string(),
            severity,
            horizon,
            before,
            after,
            adjusted,
        })
    }
}

fn ensure_finite_parameter(name: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::NonFiniteParameter { name, value })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedValue {
    pub indicator_id: String,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub shock_type: String,
    pub severity: f64,
    pub horizon: f64,
    pub before: RiskScorePack,
    pub after: RiskScorePack,
    pub adjusted: Vec<AdjustedValue>,
}

impl ScenarioOutcome {
    pub fn narrative(&self) -> String {
        format!(
            "Scenario narrative: a {} shock (severity {}/100, {} months) moves overall risk from {:.2} to {:.2}.",
            self.shock_type.replace('_', " "),
            self.severity,
            self.horizon,
            self.before.overall_risk,
            self.after.overall_risk
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Category;

    fn obs(indicator_id: &str, value: f64, category: Category) -> IndicatorObservation {
        IndicatorObservation {
            country_iso3: "SDN".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            indicator_id: indicator_id.to_string(),
            value,
            unit: "%".to_string(),
            source: "demo".to_string(),
            category,
        }
    }

    fn sample_rows() -> Vec<IndicatorObservation> {
        vec![
            obs("inflation", 10.0, Category::Macro),
            obs("food_price_stress", 60.0, Category::Food),
            obs("gdp_growth", 2.5, Category::Macro),
        ]
    }

    #[test]
    fn currency_depreciation_bumps_inflation() {
        let rows = vec![obs("inflation", 10.0, Category::Macro)];
        let out = ShockSimulator::default()
            .simulate(&rows, "currency_depreciation", 100.0, 12.0)
            .unwrap();
        assert_eq!(out[0].value, 13.5);
        assert_eq!(rows[0].value, 10.0);
    }

    #[test]
    fn zero_severity_leaves_values_unchanged() {
        let rows = sample_rows();
        for shock in [
            ShockType::CurrencyDepreciation,
            ShockType::CommodityPriceSpike,
            ShockType::ConflictSpike,
        ] {
            let out = ShockSimulator::default()
                .simulate(&rows, shock.as_str(), 0.0, 6.0)
                .unwrap();
            assert_eq!(out, rows);
        }
    }

    #[test]
    fn unknown_shock_is_a_no_op() {
        let rows = sample_rows();
        let out = ShockSimulator::default()
            .simulate(&rows, "unknown_shock", 50.0, 12.0)
            .unwrap();
        assert_eq!(out, rows);
    }

    #[test]
    fn horizon_scales_linearly() {
        let rows = vec![obs("food_price_stress", 100.0, Category::Food)];
        let sim = ShockSimulator::default();
        let half = sim.simulate(&rows, "commodity_price_spike", 50.0, 6.0).unwrap();
        let full = sim.simulate(&rows, "commodity_price_spike", 50.0, 24.0).unwrap();
        // 0.7 * 0.5 * 0.5 and 0.7 * 0.5 * 2
        assert_eq!(half[0].value, 117.5);
        assert_eq!(full[0].value, 170.0);
    }

    #[test]
    fn preserves_every_field_but_value() {
        let rows = sample_rows();
        let out = ShockSimulator::default()
            .simulate(&rows, "currency_depreciation", 40.0, 6.0)
            .unwrap();
        assert_eq!(out.len(), rows.len());
        for (old, new) in rows.iter().zip(&out) {
            assert_eq!(old.indicator_id, new.indicator_id);
            assert_eq!(old.country_iso3, new.country_iso3);
            assert_eq!(old.date, new.date);
            assert_eq!(old.category, new.category);
            assert_eq!(old.unit, new.unit);
        }
        assert_eq!(out[2].value, 2.5);
    }

    #[test]
    fn rejects_non_finite_parameters() {
        let rows = sample_rows();
        let err = ShockSimulator::default()
            .simulate(&rows, "conflict_spike", f64::NAN, 12.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::NonFiniteParameter { name: "severity", .. }));
    }

    #[test]
    fn custom_profiles_replace_defaults() {
        let profiles: ShockProfiles =
            serde_json::from_str(r#"{"drought": {"undernourishment": 0.5}}"#).unwrap();
        let rows = vec![obs("undernourishment", 20.0, Category::Food)];
        let sim = ShockSimulator::new(profiles);
        let out = sim.simulate(&rows, "drought", 100.0, 12.0).unwrap();
        assert_eq!(out[0].value, 30.0);
        let out = sim.simulate(&rows, "conflict_spike", 100.0, 12.0).unwrap();
        assert_eq!(out[0].value, 20.0);
    }

    #[test]
    fn compare_scores_before_and_after() {
        let window = vec![
            obs("food_price_stress", 40.0, Category::Food),
            obs("food_price_stress", 80.0, Category::Food),
        ];
        let latest = vec![obs("food_price_stress", 60.0, Category::Food)];
        let outcome = ShockSimulator::default()
            .compare(&Scorer::default(), &window, &latest, "commodity_price_spike", 40.0, 6.0)
            .unwrap();

        assert_eq!(outcome.before.overall_risk, 20.0);
        // 60 * (1 + 0.7 * 0.4 * 0.5) = 68.4 -> 71.0 normalized
        assert_eq!(outcome.adjusted[0].after, 68.4);
        assert_eq!(outcome.after.overall_risk, 28.4);
        let text = outcome.narrative();
        assert!(text.contains("commodity price spike"));
        assert!(text.contains("from 20.00 to 28.40"));
    }
}
