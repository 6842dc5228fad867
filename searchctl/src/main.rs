use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use search_core::profile::{profile_facets, profile_schema, LeaderboardSort, UserProfile};
use search_core::request::{request_facets, request_schema, Request};
use search_core::{FacetView, ReindexOutcome, SearchConfig, SearchEngine, SearchFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Requests,
    Profiles,
}

#[derive(Parser)]
#[command(name = "searchctl")]
#[command(about = "Search and filter a JSON corpus of requests or profiles", long_about = None)]
struct Args {
    /// Input path (JSON / JSONL file or a directory of them)
    #[arg(long)]
    input: String,
    /// Entity type stored in the input
    #[arg(long, value_enum, default_value_t = Kind::Requests)]
    kind: Kind,
    /// Search text; empty shows the filtered corpus
    #[arg(long, default_value = "")]
    query: String,
    /// Select a facet value, e.g. `--facet tags=INDOOR` (repeatable)
    #[arg(long = "facet")]
    facets: Vec<String>,
    /// Restrict a range facet, e.g. `--range kudos=10..40` (repeatable)
    #[arg(long = "range")]
    ranges: Vec<String>,
    /// Leaderboard order for profiles, e.g. `kudos-desc`
    #[arg(long)]
    sort: Option<String>,
    /// JSON configuration file; defaults come from SEARCH_* environment variables
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also print per-value counts for every categorical facet
    #[arg(long, default_value_t = false)]
    counts: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            SearchConfig::from_json(&text)?
        }
        None => SearchConfig::from_env()?,
    };

    match args.kind {
        Kind::Requests => {
            if args.sort.is_some() {
                bail!("--sort only applies to profiles");
            }
            let filter = SearchFilter::new(SearchEngine::new(request_schema(), config), request_facets())?;
            let corpus: Vec<Request> = load_corpus(Path::new(&args.input))?;
            run(filter, corpus, &args).await
        }
        Kind::Profiles => {
            let filter = SearchFilter::new(SearchEngine::new(profile_schema(), config), profile_facets())?;
            if let Some(order) = &args.sort {
                let order: LeaderboardSort = order.parse().map_err(|e: String| anyhow!(e))?;
                filter.set_sort_order(Some(order.comparator()));
            }
            let corpus: Vec<UserProfile> = load_corpus(Path::new(&args.input))?;
            run(filter, corpus, &args).await
        }
    }
}

async fn run<E>(filter: SearchFilter<E>, corpus: Vec<E>, args: &Args) -> Result<()>
where
    E: Clone + Send + Sync + Serialize + 'static,
{
    match filter.reindex(corpus).await {
        ReindexOutcome::Installed { generation, entities } => {
            tracing::info!(generation, entities, "index ready");
        }
        ReindexOutcome::Retained { error } => {
            tracing::warn!(%error, "index build failed, using substring search");
        }
        other => bail!("index was not installed: {other:?}"),
    }

    for selection in &args.facets {
        let (id, value) = selection
            .split_once('=')
            .ok_or_else(|| anyhow!("expected ID=VALUE, got {selection:?}"))?;
        filter.toggle_facet(id, value)?;
    }
    for range in &args.ranges {
        let (id, lo, hi) = parse_range(range)?;
        filter.set_range(id, lo, hi)?;
    }

    filter.update_search_query(&args.query);
    filter.flush().await;

    for entity in filter.displayed_entities() {
        println!("{}", serde_json::to_string(&entity)?);
    }

    if args.counts {
        for view in filter.facets() {
            if let FacetView::Categorical { id, .. } = view {
                let counts: Vec<String> = filter
                    .facet_counts(id)?
                    .into_iter()
                    .map(|(value, n)| format!("{}={n}", value.key))
                    .collect();
                eprintln!("{id}: {}", counts.join(" "));
            }
        }
    }

    filter.close();
    Ok(())
}

/// `id=LO..HI`, either end optional.
fn parse_range(arg: &str) -> Result<(&str, i64, i64)> {
    let (id, bounds) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected ID=LO..HI, got {arg:?}"))?;
    let (lo, hi) = bounds
        .split_once("..")
        .ok_or_else(|| anyhow!("expected LO..HI, got {bounds:?}"))?;
    let lo = if lo.is_empty() { i64::MIN } else { lo.parse().with_context(|| format!("bad lower bound in {arg:?}"))? };
    let hi = if hi.is_empty() { i64::MAX } else { hi.parse().with_context(|| format!("bad upper bound in {arg:?}"))? };
    Ok((id, lo, hi))
}

fn load_corpus<E: DeserializeOwned>(input: &Path) -> Result<Vec<E>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }

    let mut corpus = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            load_jsonl(&file, &mut corpus)?;
        } else {
            load_json(&file, &mut corpus)?;
        }
    }
    tracing::info!(entities = corpus.len(), "loaded corpus");
    Ok(corpus)
}

fn load_jsonl<E: DeserializeOwned>(path: &Path, out: &mut Vec<E>) -> Result<()> {
    let reader = BufReader::new(File::open(path)?);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entity = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", path.display(), lineno + 1))?;
        out.push(entity);
    }
    Ok(())
}

fn load_json<E: DeserializeOwned>(path: &Path, out: &mut Vec<E>) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text).with_context(|| path.display().to_string())?;
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                out.push(serde_json::from_value(item).with_context(|| path.display().to_string())?);
            }
        }
        other => out.push(serde_json::from_value(other).with_context(|| path.display().to_string())?),
    }
    Ok(())
}
