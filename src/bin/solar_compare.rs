use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use solar_compare::{ComparisonRequest, LatLon, SessionHistory, Settings, StartEndDate};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Compare historical solar radiation records with NASA POWER daily data"
)]
struct Cli {
    /// TOML config file. Defaults to ./solar-compare.toml when present.
    #[arg(short, long, env = "SOLAR_COMPARE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one comparison per historical file against the same NASA series.
    Compare(CompareArgs),
}

#[derive(clap::Args, Debug)]
struct CompareArgs {
    /// Historical radiation export, delimited text or workbook. Repeat to run several
    /// comparisons.
    #[arg(long = "historical", required = true)]
    historical: Vec<PathBuf>,

    /// Label per historical file, in the same order. Defaults to the file stem.
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Humidity export from the same station, joined on date.
    #[arg(long)]
    humidity: Option<PathBuf>,

    /// Atmospheric pressure export from the same station, joined on date.
    #[arg(long)]
    pressure: Option<PathBuf>,

    /// Keep historical rows from this date on.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Keep historical rows up to this date.
    #[arg(long)]
    to: Option<NaiveDate>,

    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// First day of the NASA series.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the NASA series.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// CSV export path. Defaults to comparacion_{today}.csv.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Command::Compare(args) => compare(&settings, args).await,
    }
}

async fn compare(settings: &Settings, args: CompareArgs) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let location = LatLon(
        args.lat.unwrap_or(settings.location.latitude),
        args.lon.unwrap_or(settings.location.longitude),
    );
    let start = args.start.unwrap_or(settings.nasa.start);
    let end = args.end.unwrap_or(settings.nasa_end(today));
    let historical_range = match (args.from, args.to) {
        (None, None) => None,
        (from, to) => Some(StartEndDate {
            start: from.unwrap_or(NaiveDate::MIN),
            end: to.unwrap_or(NaiveDate::MAX),
        }),
    };
    let humidity = read_optional(args.humidity.as_deref()).await?;
    let pressure = read_optional(args.pressure.as_deref()).await?;
    let base_output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("comparacion_{today}.csv")));

    let mut session = settings.session()?;
    let mut failures = 0usize;
    let many = args.historical.len() > 1;

    for (idx, path) in args.historical.iter().enumerate() {
        let label = args.labels.get(idx).cloned().unwrap_or_else(|| file_label(path));
        let radiation = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Could not read {}: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };

        let request = ComparisonRequest::builder()
            .radiation(radiation)
            .maybe_humidity(humidity.clone())
            .maybe_pressure(pressure.clone())
            .label(label)
            .maybe_historical_range(historical_range)
            .location(location)
            .start(start)
            .end(end)
            .build();

        let comparison = match session.run_action(&request).await {
            Ok(comparison) => comparison,
            Err(e) => {
                error!("Comparison for {} failed: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };

        if let Err(e) = comparison.summary.ensure_populated() {
            warn!("{}", e);
        }
        println!(
            "Días con radiación > {} W/m² (comparación #{})",
            comparison.summary.threshold, comparison.sequence
        );
        println!("{}", comparison.summary.to_frame()?);
        for period in &comparison.summary.periods {
            println!("Correlaciones {}", period.label);
            println!("{}", period.correlations.to_frame()?);
        }

        let output = export_path(&base_output, comparison.sequence, many);
        comparison.dataset.sorted_by_date()?.write_csv(&output).await?;
        info!("Wrote {}", output.display());
    }

    print_history(session.history())?;

    if failures == args.historical.len() {
        bail!("no comparison succeeded");
    }
    Ok(())
}

async fn read_optional(path: Option<&Path>) -> anyhow::Result<Option<Vec<u8>>> {
    match path {
        Some(path) => Ok(Some(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?,
        )),
        None => Ok(None),
    }
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "histórico".to_string())
}

/// `comparacion.csv` becomes `comparacion_2.csv` when several comparisons are exported.
fn export_path(base: &Path, sequence: u64, many: bool) -> PathBuf {
    if !many {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{stem}_{sequence}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{sequence}"),
    };
    base.with_file_name(name)
}

fn print_history(history: &SessionHistory) -> anyhow::Result<()> {
    if history.is_empty() {
        return Ok(());
    }
    println!("Historial de comparaciones");
    for comparison in history.iter() {
        match comparison.dataset.date_span()? {
            Some(span) => println!(
                "Comparación #{} – {} ({} días)",
                comparison.sequence,
                span,
                span.days()
            ),
            None => println!("Comparación #{} – sin datos", comparison.sequence),
        }
        for period in &comparison.summary.periods {
            println!("  {}: {:.1}%", period.label, period.percentage_high);
        }
    }
    Ok(())
}
