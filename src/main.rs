// =============================================================================
// Multi-Timeframe Signal Engine: command-line entry point
// =============================================================================
//
// Usage: mtf-signal-engine <pair.json>...
//
// Each pair file holds `{ "symbol": "USD/JPY", "timeframes": { "D1": {...},
// "H4": {...}, ... } }` where every timeframe value is one of the accepted
// series shapes.  Pairs are analysed concurrently on blocking tasks and the
// reports are printed as JSON, one per line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mtf_signal_engine::market_data::SeriesInput;
use mtf_signal_engine::types::Timeframe;
use mtf_signal_engine::{analyze_raw, EngineConfig, MultiTimeframeReport};

#[derive(Debug, Deserialize)]
struct PairInput {
    symbol: String,
    timeframes: BTreeMap<Timeframe, SeriesInput>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::var("ENGINE_CONFIG") {
        Ok(path) => EngineConfig::load(&path).unwrap_or_else(|e| {
            warn!(path = %path, error = %e, "Failed to load engine config, using defaults");
            EngineConfig::default()
        }),
        Err(_) => EngineConfig::default(),
    };

    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        bail!("usage: mtf-signal-engine <pair.json>...");
    }

    // ── 2. Fan out one blocking task per pair ────────────────────────────
    let mut handles = Vec::with_capacity(paths.len());
    for path in paths {
        let config = config.clone();
        handles.push((
            path.clone(),
            tokio::task::spawn_blocking(move || analyze_file(&path, &config)),
        ));
    }

    // ── 3. Collect and print ─────────────────────────────────────────────
    let (reports, failures) = collect_reports(handles).await;
    for report in &reports {
        let bias = report.daily_trend_bias();
        info!(
            symbol = %report.symbol,
            band = %bias.band,
            bias = %bias.bias,
            confidence = bias.confidence,
            "D1 trend bias: {}",
            bias.band.guidance()
        );
        println!(
            "{}",
            serde_json::to_string(report).context("failed to serialise report")?
        );
    }

    if failures > 0 {
        bail!("{failures} pair file(s) could not be analysed");
    }
    Ok(())
}

type PairTask = (PathBuf, JoinHandle<anyhow::Result<MultiTimeframeReport>>);

/// Await every pair task.  A failed or panicked task is logged and counted;
/// it never drops the reports of the other pairs.
async fn collect_reports(handles: Vec<PairTask>) -> (Vec<MultiTimeframeReport>, usize) {
    let mut reports = Vec::with_capacity(handles.len());
    let mut failures = 0usize;

    for (path, handle) in handles {
        match handle.await {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(e)) => {
                failures += 1;
                error!(path = %path.display(), error = %e, "Pair analysis failed");
            }
            Err(e) => {
                failures += 1;
                error!(path = %path.display(), error = %e, "Analysis task panicked");
            }
        }
    }

    (reports, failures)
}

fn analyze_file(path: &Path, config: &EngineConfig) -> anyhow::Result<MultiTimeframeReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pair file {}", path.display()))?;
    let input: PairInput = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse pair file {}", path.display()))?;

    info!(
        symbol = %input.symbol,
        timeframes = input.timeframes.len(),
        "Analysing pair"
    );
    Ok(analyze_raw(&input.symbol, input.timeframes, config))
}
