//! Canned text blocks and the final result table.

use crate::output::{OutputRecord, escape_markup, highlight};
use crate::speedtest::{Metric, SpeedTestResult};

pub const APP_TITLE: &str = "Terminal Speed Test v1.0.0";

const LABEL_WIDTH: usize = 18;

pub fn welcome_records(banner: &str) -> Vec<OutputRecord> {
    vec![
        OutputRecord::plain(format!("Welcome to {}", banner)),
        OutputRecord::plain("Type 'help' for available commands or 'speedtest' to start a test."),
    ]
}

pub fn help_record() -> OutputRecord {
    let lines = [
        "Available commands:".to_string(),
        format!("  - {}: Display this help message", highlight("help")),
        format!(
            "  - {} or {}: Clear the terminal",
            highlight("clear"),
            highlight("cls")
        ),
        format!(
            "  - {} [--download|--upload|--full]: Run a speed test (latency, jitter, throughput)",
            highlight("speedtest")
        ),
        format!("  - {}: Display information about this app", highlight("about")),
        format!("  - {}: Show command history", highlight("history")),
    ];
    OutputRecord::markup(lines.join("\n"))
}

pub fn about_record() -> OutputRecord {
    let lines = [
        highlight(APP_TITLE),
        "A retro terminal-style internet speed testing tool.".to_string(),
        "Built with Rust, tokio and ratatui.".to_string(),
        "Measures download speed, upload speed, latency, jitter, and more.".to_string(),
    ];
    OutputRecord::markup(lines.join("\n"))
}

pub fn history_record(entries: &[String]) -> OutputRecord {
    if entries.is_empty() {
        return OutputRecord::plain("No command history yet.");
    }
    let mut out = highlight("Command History:");
    for (index, cmd) in entries.iter().enumerate() {
        out.push('\n');
        // User text must not open highlight spans.
        out.push_str(&format!("{}: {}", index + 1, escape_markup(cmd)));
    }
    OutputRecord::markup(out)
}

pub fn prompt_echo(prompt: &str, command: &str) -> OutputRecord {
    if command.is_empty() {
        return OutputRecord::markup(format!("{} ", highlight(prompt)));
    }
    OutputRecord::markup(format!("{} {}", highlight(prompt), escape_markup(command)))
}

pub fn command_not_found(name: &str) -> OutputRecord {
    OutputRecord::plain(format!(
        "Command not found: {}. Type 'help' for available commands.",
        name
    ))
}

/// Render the summary table appended when a session finishes.
pub fn result_records(result: &SpeedTestResult) -> Vec<OutputRecord> {
    let rows = [
        (
            "Timestamp:",
            result.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        ("IP Address:", result.ip_address.clone()),
        ("ISP:", result.isp.clone()),
        ("Location:", result.location.clone()),
        ("Latency:", format_metric(result.latency_ms, "ms", 0)),
        ("Jitter:", format_metric(result.jitter_ms, "ms", 1)),
        ("Download Speed:", format_metric(result.download_mbps, "Mbps", 2)),
        ("Upload Speed:", format_metric(result.upload_mbps, "Mbps", 2)),
    ];
    let mut records = vec![
        OutputRecord::plain(""),
        OutputRecord::plain("--- Test Complete ---"),
    ];
    records.extend(rows.into_iter().map(|(label, value)| {
        OutputRecord::plain(format!("{:<width$}{}", label, value, width = LABEL_WIDTH))
    }));
    records.push(OutputRecord::plain("-------------------"));
    records
}

pub fn format_metric(metric: Metric, unit: &str, precision: usize) -> String {
    match metric {
        Metric::Value(v) => format!("{:.*} {}", precision, v, unit),
        Metric::Unavailable => "N/A".to_string(),
        Metric::NotTested => "N/A (Not Tested)".to_string(),
    }
}
