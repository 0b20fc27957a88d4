//! `fetchy run` – run a manifest to completion.

use anyhow::{bail, Result};
use fetchy_core::config::FetchyConfig;
use fetchy_core::manifest::Manifest;
use fetchy_core::{AdmissionReport, CurlTransport, FetchScheduler, Update, UpdateKind};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::table::{format_progress, format_states};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run_manifest(
    cfg: &FetchyConfig,
    path: &Path,
    concurrency: Option<usize>,
) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let concurrency = concurrency
        .or(manifest.concurrency)
        .unwrap_or(cfg.concurrency);
    let requests = manifest.into_requests();
    if requests.is_empty() {
        println!("No requests in manifest.");
        return Ok(());
    }

    let transport = Arc::new(CurlTransport::new(cfg.curl_options(), cfg.retry_policy()));
    let mut scheduler = FetchScheduler::new(transport, concurrency, requests)?;
    tracing::info!(
        manifest = %path.display(),
        requests = scheduler.requests().len(),
        concurrency = scheduler.concurrency(),
        "running manifest"
    );

    print_admission(&scheduler.mount());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_print: HashMap<String, Instant> = HashMap::new();
    let mut interrupted = false;

    loop {
        tokio::select! {
            update = scheduler.step() => match update {
                Some(update) => print_update(&scheduler, &update, &mut last_print),
                None => break,
            },
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    tracing::warn!("ctrl-c handler failed: {}", e);
                }
                println!("Interrupted, aborting all requests.");
                scheduler.unmount();
                interrupted = true;
                break;
            }
        }
    }

    let states = scheduler.states();
    println!();
    print!("{}", format_states(&states));

    let failed = states.iter().filter(|(_, s)| s.rejected).count();
    tracing::info!(
        total = states.len(),
        failed,
        interrupted,
        "manifest run finished"
    );
    if interrupted {
        bail!("interrupted");
    }
    if failed > 0 {
        bail!("{} of {} request(s) failed", failed, states.len());
    }
    Ok(())
}

fn print_admission(report: &AdmissionReport) {
    for id in &report.started {
        println!("  started   {}", id);
    }
    for err in &report.failed {
        println!("  skipped   {}", err);
    }
}

fn print_update(
    scheduler: &FetchScheduler,
    update: &Update,
    last_print: &mut HashMap<String, Instant>,
) {
    let Some(state) = scheduler.state(&update.id) else {
        return;
    };
    match update.kind {
        UpdateKind::Progress => {
            let now = Instant::now();
            let due = last_print
                .get(&update.id)
                .map(|t| now.duration_since(*t) >= PROGRESS_INTERVAL)
                .unwrap_or(true);
            if let (true, Some(progress)) = (due, state.progress) {
                println!("  {:<9} {}  {}", "progress", update.id, format_progress(&progress));
                last_print.insert(update.id.clone(), now);
            }
        }
        UpdateKind::Fulfilled => {
            let status = state.result.as_ref().map(|r| r.status).unwrap_or_default();
            println!("  done      {}  HTTP {}", update.id, status);
        }
        UpdateKind::Rejected => {
            let reason = state
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            println!("  failed    {}  {}", update.id, reason);
        }
        UpdateKind::Stale => {}
    }
    print_admission(&update.admission);
}
