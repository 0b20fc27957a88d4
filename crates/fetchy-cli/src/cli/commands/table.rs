//! Plain-text rendering of request states.

use fetchy_core::{Progress, RequestState, StatesSnapshot};
use std::fmt::Write;

fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn format_progress(progress: &Progress) -> String {
    let dir = match progress.direction {
        fetchy_core::state::Direction::Upload => "up",
        fetchy_core::state::Direction::Download => "down",
    };
    match (progress.total, progress.percent()) {
        (Some(total), Some(pct)) => format!(
            "{} {} / {} ({:.1}%)",
            dir,
            human_bytes(progress.loaded),
            human_bytes(total),
            pct
        ),
        _ => format!("{} {}", dir, human_bytes(progress.loaded)),
    }
}

fn detail(state: &RequestState) -> String {
    if let Some(err) = &state.error {
        return err.to_string();
    }
    match &state.result {
        Some(r) => format!("HTTP {} ({})", r.status, human_bytes(r.body.len() as u64)),
        None => "-".to_string(),
    }
}

/// One row per declared request, in declared order.
pub fn format_states(states: &StatesSnapshot) -> String {
    let width = states
        .iter()
        .map(|(id, _)| id.len())
        .max()
        .unwrap_or(0)
        .max(2);
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:<10} {}", "ID", "STATE", "DETAIL");
    for (id, state) in states.iter() {
        let _ = writeln!(
            out,
            "{:<width$}  {:<10} {}",
            id,
            state.label(),
            detail(state)
        );
    }
    out
}
