mod db;
mod enrich;
mod extract;
mod normalize;
mod record;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use extract::rules::{CompiledRules, RuleConfig};
use record::{CompanyRecord, PlacementData};

#[derive(Parser)]
#[command(name = "placement_parser", about = "Placement chat corpus extractor")]
struct Cli {
    /// Optional JSON rule file overriding the built-in tables
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build company records from a grouped chat corpus
    Extract {
        /// Grouped messages JSON (company name -> message list)
        #[arg(short, long, default_value = "grouped_messages.json")]
        input: PathBuf,
        /// Output placement data JSON
        #[arg(short, long, default_value = "placement_data.json")]
        output: PathBuf,
    },
    /// Merge decoded secondary documents into existing records
    Enrich {
        /// Placement data JSON produced by `extract`
        #[arg(short, long, default_value = "placement_data.json")]
        data: PathBuf,
        /// Decoded media manifest JSON
        #[arg(short, long, default_value = "media_manifest.json")]
        media: PathBuf,
        /// Output path (defaults to rewriting the data file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract + enrich in one pipeline
    Run {
        #[arg(short, long, default_value = "grouped_messages.json")]
        input: PathBuf,
        /// Decoded media manifest JSON (skipped when absent)
        #[arg(short, long)]
        media: Option<PathBuf>,
        #[arg(short, long, default_value = "placement_data.json")]
        output: PathBuf,
    },
    /// Companies overview table
    Overview {
        /// Only companies with confirmed results
        #[arg(long)]
        confirmed: bool,
        /// Only withdrawn companies
        #[arg(long)]
        withdrawn: bool,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Corpus statistics
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let rules = load_rules(cli.rules.as_deref())?;

    let result = match cli.command {
        Commands::Extract { input, output } => {
            let data = run_extract(&input, &rules)?;
            persist(&data, &output)?;
            Ok(())
        }
        Commands::Enrich { data, media, output } => {
            let mut doc = load_data(&data)?;
            let items = load_manifest(&media)?;
            let stats = enrich::apply_manifest(&mut doc.companies, &items, &rules);
            println!(
                "Enriched from {} documents ({} unmatched, {} failed).",
                stats.applied, stats.unmatched, stats.failed
            );
            persist(&doc, output.as_deref().unwrap_or(&data))?;
            Ok(())
        }
        Commands::Run { input, media, output } => {
            let mut doc = run_extract(&input, &rules)?;
            if let Some(media) = media {
                let items = load_manifest(&media)?;
                let stats = enrich::apply_manifest(&mut doc.companies, &items, &rules);
                println!(
                    "Enriched from {} documents ({} unmatched, {} failed).",
                    stats.applied, stats.unmatched, stats.failed
                );
            }
            persist(&doc, &output)?;
            Ok(())
        }
        Commands::Overview { confirmed, withdrawn, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, confirmed, withdrawn, limit)?;
            if rows.is_empty() {
                println!("No companies found. Run 'extract' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<24} | {:>8} | {:>8} | {:>9} | {:>8} | {:<5}",
                "#", "Company", "CTC", "Selected", "Shortlist", "Profiles", "Flags"
            );
            println!("{}", "-".repeat(84));
            for (i, r) in rows.iter().enumerate() {
                let ctc = r
                    .ctc_lpa
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_else(|| "-".into());
                let mut flags = String::new();
                if r.is_result_confirmed {
                    flags.push('C');
                }
                if r.is_withdrawn {
                    flags.push('W');
                }
                println!(
                    "{:>3} | {:<24} | {:>8} | {:>8} | {:>9} | {:>8} | {:<5}",
                    i + 1,
                    truncate(&r.name, 24),
                    ctc,
                    count_or_dash(r.students_selected),
                    count_or_dash(r.students_shortlisted),
                    r.profile_count,
                    flags
                );
            }

            let with_roles: Vec<_> = rows.iter().filter(|r| !r.roles.is_empty()).collect();
            if !with_roles.is_empty() {
                println!("\n--- Roles ---");
                for r in &with_roles {
                    println!("  {}: {}", truncate(&r.name, 24), r.roles);
                }
            }

            println!("\n{} companies | flags: C confirmed, W withdrawn", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Companies: {}", s.companies);
            println!("Profiles:  {}", s.profiles);
            println!("Messages:  {}", s.messages);
            println!("Confirmed: {}", s.confirmed);
            println!("Withdrawn: {}", s.withdrawn);
            println!("With CTC:  {}", s.with_ctc);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_rules(path: Option<&Path>) -> Result<CompiledRules> {
    let config = match path {
        Some(p) => {
            info!("loading rule tables from {}", p.display());
            RuleConfig::load(p)?
        }
        None => RuleConfig::default(),
    };
    config.compile()
}

fn run_extract(input: &Path, rules: &CompiledRules) -> Result<PlacementData> {
    let corpus = load_corpus(input)?;
    println!("Extracting {} companies...", corpus.len());
    let companies = process_corpus(&corpus, rules);
    println!(
        "Built {} records ({} companies had no usable messages).",
        companies.len(),
        corpus.len() - companies.len()
    );
    Ok(PlacementData {
        companies,
        unresolved_conflicts: Vec::new(),
    })
}

/// Per-company records are independent, so the batch fans out across a
/// rayon pool; messages within one company stay strictly ordered.
fn process_corpus(
    corpus: &BTreeMap<String, Vec<String>>,
    rules: &CompiledRules,
) -> Vec<CompanyRecord> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(corpus.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let entries: Vec<(&String, &Vec<String>)> = corpus.iter().collect();
    let mut records: Vec<CompanyRecord> = entries
        .into_par_iter()
        .filter_map(|(name, messages)| {
            let record = extract::build_record(name, messages, rules);
            pb.inc(1);
            record
        })
        .collect();
    pb.finish_and_clear();

    records.sort_by(|a, b| a.company_name.cmp(&b.company_name));
    records
}

fn load_corpus(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading corpus {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing corpus {}", path.display()))
}

fn load_data(path: &Path) -> Result<PlacementData> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading placement data {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing placement data {}", path.display()))
}

fn load_manifest(path: &Path) -> Result<Vec<enrich::MediaItem>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading media manifest {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing media manifest {}", path.display()))
}

/// Write the output document and mirror it into SQLite for `overview`.
fn persist(data: &PlacementData, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    fs::write(output, json).with_context(|| format!("writing {}", output.display()))?;

    let conn = db::connect()?;
    db::init_schema(&conn)?;
    db::save_records(&conn, &data.companies)?;

    println!("Saved {} companies to {}.", data.companies.len(), output.display());
    Ok(())
}

fn count_or_dash(v: Option<u32>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "-".into())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
