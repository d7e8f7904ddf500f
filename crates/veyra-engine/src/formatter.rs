use crate::inbox::{ReconcileOutcome, ReconciliationRecord};
use crate::workflow::PostReport;

const PREVIEW_WIDTH: usize = 40;

/// Plain-text table of a reconciliation run, one row per thread.
pub fn format_summary(records: &[ReconciliationRecord]) -> String {
    if records.is_empty() {
        return "No threads processed.\n".to_string();
    }

    let rows: Vec<[String; 6]> = records
        .iter()
        .map(|r| {
            [
                r.identifier.name.clone(),
                truncate(&r.identifier.last_message_preview, PREVIEW_WIDTH),
                r.identifier.timestamp_label.clone(),
                r.classification.to_string(),
                r.outcome.to_string(),
                r.chat_url.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let header = ["Name", "Preview", "Time", "Class", "Outcome", "URL"];
    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    push_row(&mut output, &header.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&rule.join("-+-"));
    output.push('\n');
    for row in &rows {
        push_row(&mut output, row, &widths);
    }

    let replied = records
        .iter()
        .filter(|r| {
            matches!(
                r.outcome,
                ReconcileOutcome::Replied | ReconcileOutcome::AcceptedAndReplied
            )
        })
        .count();
    let failed = records
        .iter()
        .filter(|r| {
            matches!(
                r.outcome,
                ReconcileOutcome::AcceptFailed
                    | ReconcileOutcome::ReplyFailed
                    | ReconcileOutcome::Error(_)
            )
        })
        .count();
    output.push_str(&format!(
        "\n{} threads, {} replied, {} failed\n",
        records.len(),
        replied,
        failed
    ));
    output
}

pub fn format_post_report(report: &PostReport) -> String {
    format!(
        "Post: {}\n  like:    {}\n  comment: {} ({:?})\n",
        report.url, report.like, report.comment, report.comment_text
    )
}

fn push_row(output: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
        .collect();
    output.push_str(padded.join(" | ").trim_end());
    output.push('\n');
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
