//! Plain-text output helpers.

use skillshare_core::engine::{PruneReport, TargetReport, TargetState};

/// Section header.
pub fn header(text: &str) {
    println!("{text}");
    println!("{}", "-".repeat(text.len()));
}

/// One projection report, grouped by action.
pub fn print_target_report(report: &TargetReport) {
    println!("[{}] mode={}", report.target, report.mode);
    print_names("  linked", &report.report.linked);
    print_names("  copied", &report.report.copied);
    print_names("  updated", &report.report.updated);
    print_names("  skipped", &report.report.skipped);
    for failure in &report.report.failed {
        println!("  failed: {} ({})", failure.name, failure.error);
    }
    if let Some(prune) = &report.prune {
        print_prune(prune);
    }
}

fn print_prune(prune: &PruneReport) {
    print_names("  pruned", &prune.removed);
    for name in &prune.warnings {
        println!("  warning: {name} is an external symlink (use --force to remove)");
    }
    print_names("  local", &prune.local_dirs);
}

fn print_names(label: &str, names: &[String]) {
    if !names.is_empty() {
        println!("{label}: {}", names.join(", "));
    }
}

/// Human label for a target state.
pub fn state_label(state: TargetState) -> &'static str {
    match state {
        TargetState::NotExist => "not synced",
        TargetState::Linked => "linked (symlink mode)",
        TargetState::Merged => "merged (per-skill links)",
        TargetState::Copied => "copied",
        TargetState::HasFiles => "has local files",
        TargetState::Conflict => "CONFLICT: symlink points elsewhere",
        TargetState::Broken => "BROKEN: symlink does not resolve",
        TargetState::Unknown => "unknown",
    }
}

/// Byte count with a binary-unit suffix.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
