// Terminal output for the tiered commands

use deployment_service::{CompletionState, RunSummary, UnitReport};

const BOLD_CYAN: &str = "1;36";
const BOLD_GREEN: &str = "1;32";
const BOLD_RED: &str = "1;31";
const GREEN: &str = "32";
const YELLOW: &str = "33";
const CYAN: &str = "36";
const FAINT: &str = "2";

fn paint(style: &str, marker: &str, message: &str) {
    eprintln!("\x1b[{}m{}\x1b[0m {}", style, marker, message);
}

/// Right-aligned action verb followed by a message
pub fn status(action: &str, message: &str) {
    paint(BOLD_CYAN, &format!("{:>12}", action), message);
}

pub fn success(message: &str) {
    paint(BOLD_GREEN, "  \u{2713}", message);
}

pub fn failure(message: &str) {
    paint(BOLD_RED, "  \u{2717}", message);
}

pub fn check(message: &str) {
    paint(GREEN, "  \u{2713}", message);
}

pub fn warning(message: &str) {
    paint(YELLOW, "  !", message);
}

pub fn error(message: &str) {
    paint(BOLD_RED, "error:", message);
}

pub fn info(message: &str) {
    paint(CYAN, "  i", message);
}

/// A unit that did not start, either skipped or never reached
pub fn not_started(message: &str) {
    paint(FAINT, "  -", message);
}

pub fn header(message: &str) {
    eprintln!("\x1b[1m==> {}\x1b[0m", message);
}

/// One line per unit, indented by depth
pub fn summary(summary: &RunSummary) {
    for unit in &summary.units {
        unit_line(unit);
    }
}

fn unit_line(unit: &UnitReport) {
    let name = format!("{}{}", "  ".repeat(unit.depth), unit.identifier);
    match &unit.state {
        CompletionState::Succeeded { instance_id } => check(&format!("{} ({})", name, instance_id)),
        CompletionState::Failed { cause } => failure(&format!("{}: {}", name, cause)),
        CompletionState::Skipped { reason } => not_started(&format!("{} skipped: {}", name, reason)),
        CompletionState::Pending => not_started(&format!("{} not started", name)),
    }
}
