use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::db;
use crate::models::{Category, IndicatorMeta, IndicatorObservation};

pub const META_FILE: &str = "indicators_meta.csv";
pub const VALUES_FILE: &str = "indicators_values.csv";

#[derive(serde::Deserialize)]
struct MetaCsvRow {
    indicator_id: String,
    indicator_name: String,
    category: String,
    unit: String,
    source: String,
    source_url: String,
}

#[derive(serde::Deserialize)]
struct ValueCsvRow {
    country_iso3: String,
    date: NaiveDate,
    indicator_id: String,
    value: f64,
    unit: String,
    source: String,
}

/// Parses the indicator metadata and value CSVs. Every value row gets the
/// category of its indicator attached; rows for unknown indicators or with
/// non-finite values are rejected with their line number.
pub fn load_demo_data<M: Read, V: Read>(
    meta: M,
    values: V,
) -> anyhow::Result<(Vec<IndicatorMeta>, Vec<IndicatorObservation>)> {
    let mut meta_rows = Vec::new();
    for (index, result) in csv::Reader::from_reader(meta).deserialize::<MetaCsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("invalid metadata row on line {line}"))?;
        let category: Category = row
            .category
            .parse()
            .with_context(|| format!("metadata line {line} ({})", row.indicator_id))?;
        meta_rows.push(IndicatorMeta {
            indicator_id: row.indicator_id,
            indicator_name: row.indicator_name,
            category,
            unit: row.unit,
            source: row.source,
            source_url: row.source_url,
        });
    }

    let categories: HashMap<&str, Category> = meta_rows
        .iter()
        .map(|meta| (meta.indicator_id.as_str(), meta.category))
        .collect();

    let mut observations = Vec::new();
    for (index, result) in csv::Reader::from_reader(values).deserialize::<ValueCsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("invalid value row on line {line}"))?;
        if !row.value.is_finite() {
            anyhow::bail!(
                "value row on line {line} ({} {}) has non-finite value {}",
                row.country_iso3,
                row.indicator_id,
                row.value
            );
        }
        let category = *categories.get(row.indicator_id.as_str()).with_context(|| {
            format!("value row on line {line} references unknown indicator {}", row.indicator_id)
        })?;
        observations.push(IndicatorObservation {
            country_iso3: row.country_iso3.trim().to_ascii_uppercase(),
            date: row.date,
            indicator_id: row.indicator_id,
            value: row.value,
            unit: row.unit,
            source: row.source,
            category,
        });
    }

    Ok((meta_rows, observations))
}

/// Loads the demo CSVs from `data_dir` and stores the rows for one country.
pub async fn ingest_country(
    pool: &PgPool,
    country_iso3: &str,
    data_dir: &Path,
) -> anyhow::Result<usize> {
    let meta_path = data_dir.join(META_FILE);
    let values_path = data_dir.join(VALUES_FILE);
    let meta_file = std::fs::File::open(&meta_path)
        .with_context(|| format!("failed to open {}", meta_path.display()))?;
    let values_file = std::fs::File::open(&values_path)
        .with_context(|| format!("failed to open {}", values_path.display()))?;

    let (meta, values) = load_demo_data(meta_file, values_file)?;
    debug!(indicators = meta.len(), rows = values.len(), "parsed demo data");

    let country_rows: Vec<IndicatorObservation> = values
        .into_iter()
        .filter(|row| row.country_iso3 == country_iso3)
        .collect();

    db::upsert_meta(pool, &meta).await?;
    db::upsert_values(pool, &country_rows).await?;
    db::record_ingestion_run(pool, country_iso3, "demo", country_rows.len()).await?;

    info!(country = country_iso3, rows = country_rows.len(), "ingested demo data");
    Ok(country_rows.len())
}
