use crate::error::{Error, FailureKind, Result};
use crate::harness::Case;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;

/// Why a case failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of running a single case
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub case: Case,
    pub passed: bool,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl CaseOutcome {
    pub fn new(case: Case, duration: Duration, result: Result<()>) -> Self {
        let failure = result.err().map(|err: Error| Failure {
            kind: err.kind(),
            message: err.to_string(),
        });
        Self {
            case,
            passed: failure.is_none(),
            duration,
            failure,
        }
    }
}

/// Outcomes of one harness run, in execution order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    started_at: DateTime<Utc>,
    outcomes: Vec<CaseOutcome>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: CaseOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn outcomes(&self) -> &[CaseOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> Vec<&CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed).collect()
    }

    /// True when every case passed (an empty run passes)
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => Ok(format_table_output(self)),
            OutputFormat::Json => format_json_output(self),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{other}' (expected table or json)")),
        }
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

fn format_table_output(report: &RunReport) -> String {
    const HEADER: [&str; 4] = ["case", "status", "time", "detail"];

    let rows: Vec<[String; 4]> = report
        .outcomes
        .iter()
        .map(|o| {
            let (status, detail) = match &o.failure {
                None => ("PASS".to_string(), String::new()),
                Some(failure) => (
                    "FAIL".to_string(),
                    format!("[{}] {}", failure.kind, failure.message),
                ),
            };
            [
                o.case.to_string(),
                status,
                format!("{:.1}ms", o.duration.as_secs_f64() * 1000.0),
                detail,
            ]
        })
        .collect();

    // Calculate column widths; the detail column is left unpadded
    let mut col_widths = HEADER.map(str::len);
    for row in &rows {
        for (i, cell) in row.iter().enumerate().take(3) {
            col_widths[i] = col_widths[i].max(cell.len());
        }
    }

    let mut output = String::new();
    push_row(&mut output, &HEADER.map(String::from), &col_widths);

    // Separator
    for (i, &width) in col_widths.iter().enumerate().take(3) {
        if i > 0 {
            output.push('+');
        }
        output.push_str(&format!("-{}-", "-".repeat(width)));
    }
    output.push_str("+--------\n");

    for row in &rows {
        push_row(&mut output, row, &col_widths);
    }

    let failed = report.failures().len();
    output.push_str(&format!(
        "\n{} passed, {} failed\n",
        report.outcomes.len() - failed,
        failed
    ));
    output
}

fn push_row(output: &mut String, row: &[String; 4], col_widths: &[usize; 4]) {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            output.push('|');
        }
        if i == 3 {
            output.push_str(&format!(" {cell}"));
        } else {
            output.push_str(&format!(" {:width$} ", cell, width = col_widths[i]));
        }
    }
    output.truncate(output.trim_end().len());
    output.push('\n');
}

fn format_json_output(report: &RunReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
