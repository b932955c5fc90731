use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod alerts;
mod config;
mod db;
mod error;
mod export;
mod ingest;
mod models;
mod normalize;
mod scenario;
mod scoring;
mod summary;

use config::{AppSettings, EngineConfig};
use models::{AlertDirection, IndicatorObservation, ScenarioRecord};
use scenario::{ShockSimulator, ShockType};
use scoring::Scorer;

#[derive(Parser)]
#[command(name = "food-security-early-warning")]
#[command(about = "Country-level food security risk scoring and shock simulation", long_about = None)]
struct Cli {
    /// JSON file overriding category weights, inverted indicators and shock profiles
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Scope {
    /// ISO3 country code
    #[arg(long)]
    country: String,
    /// First date of the window (inclusive)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last date of the window (inclusive)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Restrict scoring to these indicators (repeatable)
    #[arg(long = "indicator")]
    indicators: Vec<String>,
}

impl Scope {
    fn country(&self) -> String {
        self.country.trim().to_ascii_uppercase()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the demo indicator data for a country
    Ingest {
        #[arg(long)]
        country: String,
        /// Directory holding indicators_meta.csv and indicators_values.csv
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Score current risk for a country
    Score {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Print the full score pack as JSON
        #[arg(long)]
        json: bool,
    },
    /// Overall risk as it stood on each observation date
    Trend {
        #[command(flatten)]
        scope: Scope,
    },
    /// Apply a shock to the latest values and compare scores
    Simulate {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, value_enum)]
        shock: ShockType,
        #[arg(long, default_value_t = 40, value_parser = clap::value_parser!(u32).range(0..=100))]
        severity: u32,
        /// Months
        #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(1..=24))]
        horizon: u32,
    },
    /// Add a threshold alert rule
    AlertAdd {
        #[arg(long)]
        country: String,
        #[arg(long)]
        indicator: String,
        /// above or below
        #[arg(long)]
        direction: AlertDirection,
        #[arg(long)]
        threshold: f64,
    },
    /// Evaluate alert rules against the latest values
    AlertEvaluate {
        #[arg(long)]
        country: String,
    },
    /// List triggered alert events
    AlertList {
        #[arg(long)]
        country: String,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the filtered observations
    Export {
        #[command(flatten)]
        scope: Scope,
        #[arg(long, value_enum, default_value_t = export::ExportFormat::Csv)]
        format: export::ExportFormat,
        #[arg(long)]
        out: PathBuf,
    },
}

async fn load_window(pool: &PgPool, scope: &Scope) -> anyhow::Result<Vec<IndicatorObservation>> {
    let country = scope.country();
    let rows = db::query_country_values(pool, &country).await?;
    let window = scoring::filter_window(&rows, scope.start, scope.end, &scope.indicators);
    info!(
        country = %country,
        stored = rows.len(),
        in_window = window.len(),
        "loaded observations"
    );
    Ok(window)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = EngineConfig::load(cli.config.as_deref())?;
    let settings = AppSettings::from_env()?;
    let scorer = Scorer::new(engine.scoring);
    let simulator = ShockSimulator::new(engine.shocks);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Ingest { country, data_dir } => {
            let country = country.trim().to_ascii_uppercase();
            let data_dir = data_dir.unwrap_or(settings.demo_data_dir);
            let inserted = ingest::ingest_country(&pool, &country, &data_dir).await?;
            println!("Ingested {inserted} observations for {country} from {}.", data_dir.display());
        }
        Commands::Score { scope, limit, json } => {
            let country = scope.country();
            let window = load_window(&pool, &scope).await?;
            if window.is_empty() {
                println!("No observations found for {country} in this window.");
                return Ok(());
            }

            let latest = scoring::latest_per_indicator(&window);
            let pack = scorer.compute_scores(&window, &latest)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&pack)?);
                return Ok(());
            }

            let alert_count = db::list_alert_events(&pool, &country).await?.len();
            if let Some(run) = db::latest_ingestion_run(&pool, &country).await? {
                println!(
                    "Data: {} rows ingested for {} ({} mode) at {}",
                    run.row_count,
                    run.country_iso3,
                    run.mode,
                    run.ingested_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
            println!("Overall risk {:.2}/100", pack.overall_risk);
            for (category, weight) in pack.weights.iter() {
                match pack.category_scores.get(category) {
                    Some(score) => println!("- {category}: {score:.2} (weight {weight:.2})"),
                    None => println!("- {category}: no data (weight {weight:.2})"),
                }
            }
            println!("Top contributors:");
            for (indicator_id, score) in pack.contributors.iter().take(limit) {
                println!("- {indicator_id} {score:.2}");
            }
            println!(
                "{}",
                summary::deterministic_summary(
                    &country,
                    pack.overall_risk,
                    &pack.contributor_ids(),
                    alert_count
                )
            );
        }
        Commands::Trend { scope } => {
            let window = load_window(&pool, &scope).await?;
            let trend = scorer.score_trend(&window)?;
            if trend.is_empty() {
                println!("No observations found for this window.");
            }
            for (date, risk) in trend {
                println!("{date} {risk:.2}");
            }
        }
        Commands::Simulate {
            scope,
            shock,
            severity,
            horizon,
        } => {
            let country = scope.country();
            let window = load_window(&pool, &scope).await?;
            if window.is_empty() {
                println!("No observations found for {country} in this window.");
                return Ok(());
            }

            let latest = scoring::latest_per_indicator(&window);
            let outcome = simulator.compare(
                &scorer,
                &window,
                &latest,
                shock.as_str(),
                f64::from(severity),
                f64::from(horizon),
            )?;

            for adjusted in &outcome.adjusted {
                println!(
                    "- {}: {:.2} -> {:.2}",
                    adjusted.indicator_id, adjusted.before, adjusted.after
                );
            }
            println!("Before score {:.2}", outcome.before.overall_risk);
            println!("After score {:.2}", outcome.after.overall_risk);
            println!("{}", outcome.narrative());

            db::record_scenario(
                &pool,
                &ScenarioRecord {
                    country_iso3: country,
                    shock_type: shock.as_str().to_string(),
                    severity: f64::from(severity),
                    horizon: i32::try_from(horizon)?,
                },
            )
            .await?;
        }
        Commands::AlertAdd {
            country,
            indicator,
            direction,
            threshold,
        } => {
            if !threshold.is_finite() {
                anyhow::bail!("threshold must be a finite number");
            }
            let country = country.trim().to_ascii_uppercase();
            let alert_id = db::add_alert_rule(&pool, &country, &indicator, direction, threshold).await?;
            println!(
                "Alert rule {alert_id} saved: {indicator} {} {threshold}.",
                direction.as_str()
            );
        }
        Commands::AlertEvaluate { country } => {
            let country = country.trim().to_ascii_uppercase();
            let rows = db::query_country_values(&pool, &country).await?;
            let latest = scoring::latest_per_indicator(&rows);
            let rules = db::fetch_alert_rules(&pool, &country).await?;
            if rules.is_empty() {
                warn!(country = %country, "no alert rules configured");
            }
            let hits = alerts::evaluate_rules(&rules, &latest);
            let recorded = db::record_alert_hits(&pool, &hits).await?;
            println!("Triggered alerts: {recorded}");
            for hit in &hits {
                println!("- {} observed {} on {}", hit.indicator_id, hit.observed_value, hit.date);
            }
        }
        Commands::AlertList { country } => {
            let country = country.trim().to_ascii_uppercase();
            let events = db::list_alert_events(&pool, &country).await?;
            if events.is_empty() {
                println!("No alert events for {country}.");
            }
            for event in events {
                println!(
                    "- {} {} observed {} on {} (triggered {})",
                    event.event_id,
                    event.indicator_id,
                    event.observed_value,
                    event.date,
                    event.triggered_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }
        Commands::Report { scope, out } => {
            let country = scope.country();
            let window = load_window(&pool, &scope).await?;
            let latest = scoring::latest_per_indicator(&window);
            let pack = scorer.compute_scores(&window, &latest)?;
            let events = db::list_alert_events(&pool, &country).await?;
            let report = summary::build_report(&country, scope.start, scope.end, &pack, &latest, &events);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { scope, format, out } => {
            let window = load_window(&pool, &scope).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            export::export(&window, format, std::io::BufWriter::new(file))?;
            println!("Exported {} observations to {}.", window.len(), out.display());
        }
    }

    Ok(())
}
