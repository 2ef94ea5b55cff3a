//! Table output formatting for CLI commands
//!
//! Provides formatted table output for policies, actions, and queue
//! statistics using comfy-table. Supports color-coded status cells and
//! automatic column sizing.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{ActionRecord, ActionStatus, Policy};
use crate::domain::ports::QueueStats;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Format a list of policies as a table
    pub fn format_policies(&self, policies: &[Policy]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Severity").add_attribute(Attribute::Bold),
            Cell::new("Target").add_attribute(Attribute::Bold),
            Cell::new("Action").add_attribute(Attribute::Bold),
            Cell::new("Enabled").add_attribute(Attribute::Bold),
            Cell::new("Auto").add_attribute(Attribute::Bold),
            Cell::new("Cooldown").add_attribute(Attribute::Bold),
        ]);

        for policy in policies {
            table.add_row(vec![
                Cell::new(&policy.name),
                Cell::new(policy.severity.as_str()),
                Cell::new(truncate_text(&policy.target, 30)),
                Cell::new(policy.action.as_str()),
                Cell::new(if policy.enabled { "yes" } else { "no" }),
                Cell::new(if policy.auto_remediate { "yes" } else { "no" }),
                Cell::new(format!("{}s", policy.cooldown_seconds)),
            ]);
        }

        table.to_string()
    }

    /// Format a list of action records as a table
    pub fn format_actions(&self, actions: &[ActionRecord]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Target").add_attribute(Attribute::Bold),
            Cell::new("Action").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Attempts").add_attribute(Attribute::Bold),
            Cell::new("Updated").add_attribute(Attribute::Bold),
            Cell::new("Last Error").add_attribute(Attribute::Bold),
        ]);

        for action in actions {
            let status_cell = if self.use_colors {
                Cell::new(action.status.as_str()).fg(status_color(action.status))
            } else {
                Cell::new(action.status.as_str())
            };

            table.add_row(vec![
                Cell::new(action.id.to_string()),
                Cell::new(truncate_text(&action.target, 30)),
                Cell::new(&action.action),
                status_cell,
                Cell::new(action.attempts.to_string()),
                Cell::new(action.updated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                Cell::new(truncate_text(action.last_error.as_deref().unwrap_or("-"), 40)),
            ]);
        }

        table.to_string()
    }

    /// Format queue statistics as a metric/count table
    pub fn format_queue_stats(&self, stats: &QueueStats) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec!["Queue length", &stats.queue_length.to_string()]);
        table.add_row(vec!["Enqueued", &stats.tasks_enqueued.to_string()]);
        table.add_row(vec!["Dequeued", &stats.tasks_dequeued.to_string()]);
        table.add_row(vec!["Completed", &stats.tasks_completed.to_string()]);
        table.add_row(vec!["Failed", &stats.tasks_failed.to_string()]);
        table.add_row(vec![
            "Last processed",
            stats.last_processed_task.as_deref().unwrap_or("-"),
        ]);

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }
    true
}

/// Map action status to color
fn status_color(status: ActionStatus) -> Color {
    match status {
        ActionStatus::Completed => Color::Green,
        ActionStatus::Running => Color::Cyan,
        ActionStatus::Pending => Color::Yellow,
        ActionStatus::Failed => Color::Red,
        ActionStatus::Cancelled => Color::DarkGrey,
    }
}

/// Truncate text to max length with ellipsis
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        text.to_string()
    } else {
        format!("{}...", &text[..max_len.saturating_sub(3)])
    }
}
