use std::io::Write;

use clap::ValueEnum;

use crate::models::IndicatorObservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

fn sorted(rows: &[IndicatorObservation]) -> Vec<&IndicatorObservation> {
    let mut sorted: Vec<&IndicatorObservation> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.indicator_id.cmp(&b.indicator_id))
    });
    sorted
}

pub fn export_csv<W: Write>(rows: &[IndicatorObservation], writer: W) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in sorted(rows) {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_json<W: Write>(rows: &[IndicatorObservation], writer: W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, &sorted(rows))?;
    Ok(())
}

pub fn export<W: Write>(
    rows: &[IndicatorObservation],
    format: ExportFormat,
    writer: W,
) -> anyhow::Result<()> {
    match format {
        ExportFormat::Csv => export_csv(rows, writer),
        ExportFormat::Json => export_json(rows, writer),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Category;

    fn rows() -> Vec<IndicatorObservation> {
        let row = |date: (i32, u32), indicator_id: &str, value: f64, category| IndicatorObservation {
            country_iso3: "YEM".to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, 1).unwrap(),
            indicator_id: indicator_id.to_string(),
            value,
            unit: "%".to_string(),
            source: "demo".to_string(),
            category,
        };
        vec![
            row((2023, 1), "inflation", 9.5, Category::Macro),
            row((2022, 1), "undernourishment", 38.0, Category::Food),
            row((2022, 1), "inflation", 8.1, Category::Macro),
        ]
    }

    #[test]
    fn csv_is_sorted_by_date_then_indicator() {
        let mut out = Vec::new();
        export(&rows(), ExportFormat::Csv, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "country_iso3,date,indicator_id,value,unit,source,category");
        assert_eq!(lines[1], "YEM,2022-01-01,inflation,8.1,%,demo,macro");
        assert_eq!(lines[2], "YEM,2022-01-01,undernourishment,38.0,%,demo,food");
        assert_eq!(lines[3], "YEM,2023-01-01,inflation,9.5,%,demo,macro");
    }

    #[test]
    fn json_round_trips_records() {
        let mut out = Vec::new();
        export(&rows(), ExportFormat::Json, &mut out).unwrap();
        let parsed: Vec<IndicatorObservation> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].indicator_id, "inflation");
        assert_eq!(parsed[0].value, 8.1);
        assert_eq!(parsed[2].category, Category::Macro);
    }
}
