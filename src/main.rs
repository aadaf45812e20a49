use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use movie_insights::{AnalysisConfig, JsonFileSink, Pipeline};

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    TopMovies,
    RatingsDashboard,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Exploratory analysis over a movie CSV")]
struct Args {
    /// CSV source to analyze
    #[arg(short, long, default_value = "top_movies.csv")]
    data: PathBuf,

    /// Built-in analysis preset
    #[arg(short, long, value_enum, default_value = "top-movies")]
    preset: Preset,

    /// TOML analysis config; overrides --preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory chart specs are written to
    #[arg(short, long, default_value = "outputs")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::from_toml_file(path)?,
        None => match args.preset {
            Preset::TopMovies => AnalysisConfig::top_movies(),
            Preset::RatingsDashboard => AnalysisConfig::ratings_dashboard(),
        },
    };
    info!(config = %config.name, data = %args.data.display(), "starting analysis");

    let pipeline = Pipeline::new(config);
    let mut sink = JsonFileSink::new(&args.out_dir);

    let report = match pipeline.run(&args.data, &mut sink) {
        Ok(report) => report,
        Err(e) if e.is_fatal_input() => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    for (heading, body) in &report.sections {
        println!("\n--- {} ---\n{}", heading, body);
    }
    if !report.parse.errors.is_empty() {
        println!(
            "{} malformed line(s) skipped while loading",
            report.parse.errors.len()
        );
    }
    for path in sink.written() {
        println!("Chart saved: {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}
