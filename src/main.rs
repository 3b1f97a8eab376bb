use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use conpubs::aggregate::Aggregator;
use conpubs::config::Settings;
use conpubs::{parser, Fetch, NodeError};

#[derive(Parser)]
#[command(name = "conpubs", about = "Count PDFs, pages, images and links on the convention publications site")]
struct Cli {
    /// Root URL of the site (overrides CONPUBS_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Read pages from a local mirror instead (overrides CONPUBS_MIRROR_DIR)
    #[arg(long, global = true)]
    mirror: Option<PathBuf>,
    /// Worker threads (0 = one per core)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the root index and total every series
    All {
        /// Only series whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Totals for one convention series
    Series { name: String },
    /// Totals for one convention
    Instance { series: String, name: String },
    /// Print the decoded entities of one page as JSON
    Inspect {
        /// Directory of the page, e.g. "/Boskone" ("" for the root index)
        path: String,
        #[arg(short, long, value_enum, default_value = "instance")]
        kind: Kind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Root,
    Series,
    Instance,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if cli.base_url.is_some() {
        settings.base_url = cli.base_url;
    }
    if cli.mirror.is_some() {
        settings.mirror_dir = cli.mirror;
    }
    if let Some(jobs) = cli.jobs {
        settings.jobs = jobs;
    }
    if settings.jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(settings.jobs)
            .build_global()
            .context("failed to size the worker pool")?;
    }

    let aggregator = Aggregator::new(settings.fetcher()?).index_name(settings.index_name.clone());

    match cli.command {
        Commands::All { filter } => {
            if filter.is_some() {
                settings.series_filter = filter;
            }
            run_all(&aggregator, &settings)?;
        }
        Commands::Series { name } => {
            let agg = aggregator.decode_series(&name);
            print!("{}", agg.counts);
            print_failures(&agg.failures);
        }
        Commands::Instance { series, name } => {
            let agg = aggregator.decode_instance(&series, &name);
            print!("{}", agg.counts);
            print_failures(&agg.failures);
        }
        Commands::Inspect { path, kind } => inspect(&aggregator, &settings, &path, kind)?,
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn run_all<F: Fetch>(aggregator: &Aggregator<F>, settings: &Settings) -> anyhow::Result<()> {
    let series = aggregator.root_entries()?;
    let series: Vec<_> = series
        .into_iter()
        .filter(|s| settings.wants_series(&s.name))
        .collect();
    if series.is_empty() {
        println!("No convention series matched.");
        return Ok(());
    }

    let pb = ProgressBar::new(series.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} series")?
            .progress_chars("#>-"),
    );
    let report = aggregator.decode_series_list(&series, |_| pb.inc(1));
    pb.finish_and_clear();

    println!(
        "Convention publications, {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    );
    println!("{}", "-".repeat(72));
    for counts in &report.series {
        println!("{}", counts.summary());
    }
    println!("{}", "-".repeat(72));
    println!("{}", report.total.counts.summary());
    print_failures(&report.total.failures);
    Ok(())
}

fn inspect<F: Fetch>(
    aggregator: &Aggregator<F>,
    settings: &Settings,
    path: &str,
    kind: Kind,
) -> anyhow::Result<()> {
    let Some(text) = aggregator.fetcher().fetch(path, &settings.index_name)? else {
        println!("{}/{} does not exist", path, settings.index_name);
        return Ok(());
    };
    let json = match kind {
        Kind::Root => serde_json::to_string_pretty(&parser::decode_root(&text)?)?,
        Kind::Series => serde_json::to_string_pretty(&parser::decode_series(&text)?)?,
        Kind::Instance => serde_json::to_string_pretty(&parser::decode_instance(&text)?)?,
    };
    println!("{}", json);
    Ok(())
}

fn print_failures(failures: &[NodeError]) {
    if failures.is_empty() {
        return;
    }
    eprintln!("\n{} page(s) could not be counted:", failures.len());
    for f in failures {
        eprintln!("  {}", f);
    }
}
