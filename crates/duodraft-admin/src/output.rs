//! Output formatting for the admin tool.

use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use colored::*;
use duodraft_domain::Round;
use duodraft_history::{RebuildReport, ReconcileReport, RoundListing, RoundSummary};
use serde_json::json;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

fn timestamp(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format rounds waiting for the index.
    pub fn format_pending(&self, rounds: &[Round]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let pending: Vec<serde_json::Value> = rounds
                    .iter()
                    .map(|r| {
                        json!({
                            "id": r.id.to_string(),
                            "teacherId": r.teacher_id.to_string(),
                            "createdAt": timestamp(r.created_at),
                            "pairCount": r.pairs.len(),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json!({
                    "unindexedRounds": rounds.len(),
                    "rounds": pending,
                }))?)
            }
            OutputFormat::Table => {
                if rounds.is_empty() {
                    return Ok(self.success("Adjacency index is up to date"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Round", "Teacher", "Created", "Pairs"]);
                for round in rounds {
                    builder.push_record([
                        round.id.to_string(),
                        round.teacher_id.to_string(),
                        timestamp(round.created_at),
                        round.pairs.len().to_string(),
                    ]);
                }
                Ok(format!(
                    "{}\n{}",
                    self.table(builder),
                    self.warning(&format!("{} round(s) not indexed", rounds.len()))
                ))
            }
            OutputFormat::Quiet => Ok(rounds
                .iter()
                .map(|r| r.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format a catch-up run.
    pub fn format_reconcile(&self, report: &ReconcileReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "roundsMerged": report.rounds_merged,
                "failed": report.failed.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }))?),
            OutputFormat::Table => {
                if report.is_clean() {
                    Ok(self.success(&format!("Merged {} round(s)", report.rounds_merged)))
                } else {
                    Ok(self.error(&format!(
                        "Merged {} round(s), {} failed",
                        report.rounds_merged,
                        report.failed.len()
                    )))
                }
            }
            OutputFormat::Quiet => Ok(report
                .failed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format a rebuild report.
    pub fn format_rebuild(&self, report: &RebuildReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "teacherId": report.teacher_id.to_string(),
                "roundsReplayed": report.rounds_replayed,
                "studentsReset": report.students_reset,
            }))?),
            OutputFormat::Table => Ok(self.success(&format!(
                "Rebuilt index for {}: {} round(s) replayed, {} student(s) reset",
                report.teacher_id, report.rounds_replayed, report.students_reset
            ))),
            OutputFormat::Quiet => Ok(report.rounds_replayed.to_string()),
        }
    }

    /// Format a page of rounds.
    pub fn format_listing(&self, listing: &RoundListing) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let rounds: Vec<serde_json::Value> =
                    listing.rounds.iter().map(summary_json).collect();
                Ok(serde_json::to_string_pretty(&json!({
                    "total": listing.total,
                    "offset": listing.offset,
                    "rounds": rounds,
                }))?)
            }
            OutputFormat::Table => {
                if listing.rounds.is_empty() {
                    return Ok(self.warning("No pair history found."));
                }
                let mut builder = Builder::default();
                builder.push_record(["Round", "Created", "Shuffle", "Pairs", "Students"]);
                for summary in &listing.rounds {
                    builder.push_record([
                        summary.id.to_string(),
                        timestamp(summary.created_at),
                        summary.shuffle_number.to_string(),
                        summary.pair_count.to_string(),
                        summary.student_count.to_string(),
                    ]);
                }
                Ok(format!(
                    "{}\n{}",
                    self.table(builder),
                    self.info(&format!(
                        "Showing {} of {} round(s) from offset {}",
                        listing.rounds.len(),
                        listing.total,
                        listing.offset
                    ))
                ))
            }
            OutputFormat::Quiet => Ok(listing
                .rounds
                .iter()
                .map(|s| s.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn table(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn summary_json(summary: &RoundSummary) -> serde_json::Value {
    json!({
        "id": summary.id.to_string(),
        "createdAt": timestamp(summary.created_at),
        "shuffleNumber": summary.shuffle_number,
        "pairCount": summary.pair_count,
        "studentCount": summary.student_count,
    })
}
