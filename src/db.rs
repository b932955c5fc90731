use anyhow::Context;
use chrono::Utc;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AlertDirection, AlertEvent, AlertHit, AlertRule, Category, IndicatorMeta, IndicatorObservation,
    IngestionRun, ScenarioRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn upsert_meta(pool: &PgPool, rows: &[IndicatorMeta]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO food_security.indicators_meta
            (indicator_id, indicator_name, category, unit, source, source_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (indicator_id) DO UPDATE
            SET indicator_name = EXCLUDED.indicator_name,
                category = EXCLUDED.category,
                unit = EXCLUDED.unit,
                source = EXCLUDED.source,
                source_url = EXCLUDED.source_url
            "#,
        )
        .bind(&row.indicator_id)
        .bind(&row.indicator_name)
        .bind(row.category.as_str())
        .bind(&row.unit)
        .bind(&row.source)
        .bind(&row.source_url)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    debug!(rows = rows.len(), "upserted indicator metadata");
    Ok(())
}

pub async fn upsert_values(pool: &PgPool, rows: &[IndicatorObservation]) -> anyhow::Result<()> {
    let last_updated = Utc::now();
    let mut tx = pool.begin().await?;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO food_security.indicators_values
            (country_iso3, date, indicator_id, value, unit, source, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (country_iso3, date, indicator_id) DO UPDATE
            SET value = EXCLUDED.value,
                unit = EXCLUDED.unit,
                source = EXCLUDED.source,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&row.country_iso3)
        .bind(row.date)
        .bind(&row.indicator_id)
        .bind(row.value)
        .bind(&row.unit)
        .bind(&row.source)
        .bind(last_updated)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    debug!(rows = rows.len(), "upserted indicator values");
    Ok(())
}

/// All observations for a country, joined with their category, oldest first.
pub async fn query_country_values(
    pool: &PgPool,
    country_iso3: &str,
) -> anyhow::Result<Vec<IndicatorObservation>> {
    let records = sqlx::query(
        "SELECT v.country_iso3, v.date, v.indicator_id, v.value, v.unit, v.source, m.category \
         FROM food_security.indicators_values v \
         JOIN food_security.indicators_meta m ON m.indicator_id = v.indicator_id \
         WHERE v.country_iso3 = $1 \
         ORDER BY v.date, v.indicator_id",
    )
    .bind(country_iso3)
    .fetch_all(pool)
    .await?;

    let mut observations = Vec::with_capacity(records.len());
    for row in records {
        let category: String = row.get("category");
        let indicator_id: String = row.get("indicator_id");
        let category: Category = category
            .parse()
            .with_context(|| format!("stored metadata for {indicator_id} is invalid"))?;
        observations.push(IndicatorObservation {
            country_iso3: row.get("country_iso3"),
            date: row.get("date"),
            indicator_id,
            value: row.get("value"),
            unit: row.get("unit"),
            source: row.get("source"),
            category,
        });
    }

    Ok(observations)
}

pub async fn add_alert_rule(
    pool: &PgPool,
    country_iso3: &str,
    indicator_id: &str,
    direction: AlertDirection,
    threshold: f64,
) -> anyhow::Result<Uuid> {
    let alert_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO food_security.alerts
        (alert_id, country_iso3, indicator_id, direction, threshold, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(alert_id)
    .bind(country_iso3)
    .bind(indicator_id)
    .bind(direction.as_str())
    .bind(threshold)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(alert_id)
}

pub async fn fetch_alert_rules(pool: &PgPool, country_iso3: &str) -> anyhow::Result<Vec<AlertRule>> {
    let records = sqlx::query(
        "SELECT alert_id, country_iso3, indicator_id, direction, threshold, created_at \
         FROM food_security.alerts WHERE country_iso3 = $1 ORDER BY created_at",
    )
    .bind(country_iso3)
    .fetch_all(pool)
    .await?;

    let mut rules = Vec::with_capacity(records.len());
    for row in records {
        let direction: String = row.get("direction");
        rules.push(AlertRule {
            alert_id: row.get("alert_id"),
            country_iso3: row.get("country_iso3"),
            indicator_id: row.get("indicator_id"),
            direction: direction.parse::<AlertDirection>()?,
            threshold: row.get("threshold"),
            created_at: row.get("created_at"),
        });
    }

    Ok(rules)
}

pub async fn record_alert_hits(pool: &PgPool, hits: &[AlertHit]) -> anyhow::Result<usize> {
    let triggered_at = Utc::now();
    let mut tx = pool.begin().await?;

    for hit in hits {
        sqlx::query(
            r#"
            INSERT INTO food_security.alert_events
            (event_id, alert_id, triggered_at, observed_value, date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(hit.alert_id)
        .bind(triggered_at)
        .bind(hit.observed_value)
        .bind(hit.date)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(hits.len())
}

pub async fn list_alert_events(pool: &PgPool, country_iso3: &str) -> anyhow::Result<Vec<AlertEvent>> {
    let records = sqlx::query(
        "SELECT ae.event_id, ae.triggered_at, ae.observed_value, ae.date, a.indicator_id \
         FROM food_security.alert_events ae \
         JOIN food_security.alerts a ON a.alert_id = ae.alert_id \
         WHERE a.country_iso3 = $1 \
         ORDER BY ae.triggered_at DESC",
    )
    .bind(country_iso3)
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(|row| AlertEvent {
            event_id: row.get("event_id"),
            indicator_id: row.get("indicator_id"),
            triggered_at: row.get("triggered_at"),
            observed_value: row.get("observed_value"),
            date: row.get("date"),
        })
        .collect())
}

pub async fn record_scenario(pool: &PgPool, scenario: &ScenarioRecord) -> anyhow::Result<Uuid> {
    let scenario_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO food_security.scenarios
        (scenario_id, country_iso3, shock_type, severity, horizon, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(scenario_id)
    .bind(&scenario.country_iso3)
    .bind(&scenario.shock_type)
    .bind(scenario.severity)
    .bind(scenario.horizon)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(scenario_id)
}

pub async fn record_ingestion_run(
    pool: &PgPool,
    country_iso3: &str,
    mode: &str,
    row_count: usize,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO food_security.ingestion_runs
        (run_id, country_iso3, mode, row_count, ingested_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(country_iso3)
    .bind(mode)
    .bind(i64::try_from(row_count)?)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn latest_ingestion_run(
    pool: &PgPool,
    country_iso3: &str,
) -> anyhow::Result<Option<IngestionRun>> {
    let record = sqlx::query(
        "SELECT country_iso3, mode, row_count, ingested_at \
         FROM food_security.ingestion_runs \
         WHERE country_iso3 = $1 \
         ORDER BY ingested_at DESC \
         LIMIT 1",
    )
    .bind(country_iso3)
    .fetch_optional(pool)
    .await?;

    Ok(record.map(|row| IngestionRun {
        country_iso3: row.get("country_iso3"),
        mode: row.get("mode"),
        row_count: row.get("row_count"),
        ingested_at: row.get("ingested_at"),
    }))
}
