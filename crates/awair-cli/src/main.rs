mod cli;
mod sink;

use std::io;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use awair_client::{ApiClient, Device, FetchSummary, RangeOptions, fetch_range};
use awair_store::{Store, daily_counts, largest_gaps};
use awair_types::{ConflictPolicy, Reading, format_timestamp, parse_timestamp};

use cli::{ApiArgs, Cli, Commands, DataArgs, WindowArgs};
use sink::JsonlSink;

/// Default lookback when no --from is given (~one month of data).
const DEFAULT_LOOKBACK_DAYS: i64 = 34;
/// Default window end runs slightly past now so the newest samples land.
const FUTURE_BUFFER_MINUTES: i64 = 10;
/// Lookback for a first catch-up run against an empty store.
const UPDATE_LOOKBACK_DAYS: i64 = 7;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Narration goes to stderr; stdout carries only data rows and results.
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Fetch {
            api,
            data,
            window,
            limit,
            sleep_s,
            conflict_action,
            recent_only,
            max_requests,
        } => cmd_fetch(
            &api,
            &data,
            &window,
            limit,
            sleep_s,
            conflict_action,
            recent_only,
            max_requests,
        ),
        Commands::Update {
            api,
            data,
            max_requests,
        } => cmd_update(&api, &data, max_requests),
        Commands::Info { data, device_id } => cmd_info(&data, device_id),
        Commands::Gaps {
            data,
            device_id,
            window,
            count,
            min_gap,
        } => cmd_gaps(&data, device_id, &window, count, min_gap),
        Commands::Hist {
            data,
            device_id,
            window,
        } => cmd_hist(&data, device_id, &window),
    }
}

fn now_naive() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

fn parse_arg_timestamp(
    value: Option<&String>,
    default: PrimitiveDateTime,
) -> Result<PrimitiveDateTime> {
    match value {
        Some(s) => parse_timestamp(s).with_context(|| format!("invalid datetime {s:?}")),
        None => Ok(default),
    }
}

fn resolve_data_path(data: &DataArgs, device_id: Option<u64>) -> Result<String> {
    if let Some(path) = &data.data_path {
        return Ok(path.clone());
    }
    match device_id {
        Some(id) => Ok(awair_store::default_data_path(id).display().to_string()),
        None => bail!("no data path; pass --data-path or --device-id"),
    }
}

fn filter_window(rows: &mut Vec<Reading>, window: &WindowArgs) -> Result<()> {
    if let Some(from) = &window.from {
        let from = parse_timestamp(from).with_context(|| format!("invalid --from {from:?}"))?;
        rows.retain(|r| r.timestamp >= from);
    }
    if let Some(to) = &window.to {
        let to = parse_timestamp(to).with_context(|| format!("invalid --to {to:?}"))?;
        rows.retain(|r| r.timestamp <= to);
    }
    Ok(())
}

fn report_summary(summary: &FetchSummary) {
    if summary.rate_limited() {
        warn!(
            "stopped early due to rate limiting after {} requests; re-run later to resume",
            summary.requests
        );
    }
    info!(
        "complete: {} requests, {} records inserted",
        summary.requests, summary.total_inserted
    );
}

#[allow(clippy::too_many_arguments)]
fn cmd_fetch(
    api: &ApiArgs,
    data: &DataArgs,
    window: &WindowArgs,
    limit: u32,
    sleep_s: f64,
    conflict_action: ConflictPolicy,
    recent_only: bool,
    max_requests: Option<u32>,
) -> Result<()> {
    if sleep_s < 0.0 {
        bail!("--sleep-s must be non-negative");
    }

    let now = now_naive();
    let mut from = parse_arg_timestamp(
        window.from.as_ref(),
        now - Duration::days(DEFAULT_LOOKBACK_DAYS),
    )?;
    let to = parse_arg_timestamp(
        window.to.as_ref(),
        now + Duration::minutes(FUTURE_BUFFER_MINUTES),
    )?;

    let device = Device::new(api.device_type.clone(), api.device_id);
    let mut client = ApiClient::new(api.token.clone(), device);

    let mut options = RangeOptions::new(from, to)
        .limit(limit)
        .sleep(StdDuration::from_secs_f64(sleep_s));
    if let Some(cap) = max_requests {
        options = options.max_requests(cap);
    }

    if matches!(data.data_path.as_deref(), Some("-" | "")) {
        let stdout = io::stdout();
        let mut sink = JsonlSink::new(stdout.lock());
        let summary = fetch_range(&mut client, &options, &mut sink)?;
        report_summary(&summary);
        return Ok(());
    }

    let path = resolve_data_path(data, Some(api.device_id))?;
    let store = Store::open(&path, conflict_action);

    if recent_only {
        match store.latest_timestamp()? {
            Some(latest) => {
                info!(
                    "recent-only mode: fetching data since {}",
                    format_timestamp(latest)
                );
                from = latest;
            }
            None => info!(
                "no existing data found; fetching from {}",
                format_timestamp(from)
            ),
        }
        if from >= to {
            info!("store is already up to date");
            return Ok(());
        }
        options.from = from;
    }

    let mut session = store.session()?;
    let summary = fetch_range(&mut client, &options, &mut session)?;
    session.close()?;
    report_summary(&summary);
    info!(
        "data file now contains {} total records",
        store.record_count()?
    );
    Ok(())
}

fn cmd_update(api: &ApiArgs, data: &DataArgs, max_requests: Option<u32>) -> Result<()> {
    let path = resolve_data_path(data, Some(api.device_id))?;
    let store = Store::open(&path, ConflictPolicy::Warn);

    let now = now_naive();
    let from = match store.latest_timestamp()? {
        Some(latest) => {
            info!("fetching data since {}", format_timestamp(latest));
            latest
        }
        None => {
            info!(
                "no existing data; fetching last {} days",
                UPDATE_LOOKBACK_DAYS
            );
            now - Duration::days(UPDATE_LOOKBACK_DAYS)
        }
    };
    let to = now + Duration::minutes(FUTURE_BUFFER_MINUTES);
    if from >= to {
        info!("store is already up to date");
        return Ok(());
    }

    let device = Device::new(api.device_type.clone(), api.device_id);
    let mut client = ApiClient::new(api.token.clone(), device);

    let mut options = RangeOptions::new(from, to);
    if let Some(cap) = max_requests {
        options = options.max_requests(cap);
    }

    let mut session = store.session()?;
    let summary = fetch_range(&mut client, &options, &mut session)?;
    session.close()?;
    report_summary(&summary);
    info!(
        "data file now contains {} total records",
        store.record_count()?
    );
    Ok(())
}

fn cmd_info(data: &DataArgs, device_id: Option<u64>) -> Result<()> {
    let path = resolve_data_path(data, device_id)?;
    let store = Store::open(&path, ConflictPolicy::Warn);
    let summary = store.summary()?;

    println!("Data file: {path}");
    println!("Total records: {}", summary.count);
    match (summary.earliest, summary.latest) {
        (Some(earliest), Some(latest)) => println!(
            "Date range: {} to {}",
            format_timestamp(earliest),
            format_timestamp(latest)
        ),
        _ => println!("No data found"),
    }
    println!(
        "File size: {:.2} MiB ({} bytes)",
        summary.size_bytes as f64 / (1024.0 * 1024.0),
        summary.size_bytes
    );
    Ok(())
}

fn cmd_gaps(
    data: &DataArgs,
    device_id: Option<u64>,
    window: &WindowArgs,
    count: usize,
    min_gap: Option<i64>,
) -> Result<()> {
    let path = resolve_data_path(data, device_id)?;
    let store = Store::open(&path, ConflictPolicy::Warn);

    let mut rows = store.readings()?;
    filter_window(&mut rows, window)?;
    if rows.is_empty() {
        warn!("no data in specified range");
        return Ok(());
    }

    let min_gap = min_gap.map(Duration::seconds);
    let gaps = largest_gaps(&rows, count, min_gap);

    println!("Gap analysis for {path}");
    println!("Total records: {}", rows.len());
    if gaps.is_empty() {
        println!("No gaps found");
        return Ok(());
    }

    println!("Top {} largest gaps:", gaps.len());
    for gap in &gaps {
        println!(
            "{:5.1}m gap: {} -> {}",
            gap.duration().as_seconds_f64() / 60.0,
            format_timestamp(gap.start),
            format_timestamp(gap.end)
        );
    }
    Ok(())
}

fn cmd_hist(data: &DataArgs, device_id: Option<u64>, window: &WindowArgs) -> Result<()> {
    let path = resolve_data_path(data, device_id)?;
    let store = Store::open(&path, ConflictPolicy::Warn);

    let mut rows = store.readings()?;
    filter_window(&mut rows, window)?;
    if rows.is_empty() {
        warn!("no data in specified range");
        return Ok(());
    }

    for (date, count) in daily_counts(&rows) {
        println!("{count:7} {date}");
    }
    Ok(())
}
