//! Text rendering for attention breakdowns and GEMM tables.
//!
//! Pure consumers of the model output: the only arithmetic here is the
//! percentage column.

use std::fmt::Write;

use crate::attention::AttentionReport;
use crate::gemm::MetricTable;

const RULE_WIDTH: usize = 60;
const LABEL_WIDTH: usize = 25;
const GEMM_LABEL_WIDTH: usize = 24;
const MIN_COLUMN_WIDTH: usize = 12;

/// `softmax_fma_exp` -> `Softmax Fma Exp`.
pub fn format_stage_name(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Format a cycle count: integral values without decimals.
pub fn format_cycles(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Format percentage.
pub fn format_pct(value: f64, total: f64) -> String {
    if total > 0.0 {
        format!("{:.1}%", 100.0 * value / total)
    } else {
        "0.0%".to_string()
    }
}

/// Generations that switch modes under co-execution only report the
/// overlapped total when it was requested.
fn shows_coexec_total(report: &AttentionReport) -> bool {
    report.flags.coexec || !report.generation.profile().stages.packed_off_under_coexec
}

/// Render one attention estimate as a component / cycles table.
pub fn render_attention_report(report: &AttentionReport) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "Performance Table: gen={}, qtile={}, kv_tile={}, is_packed={}, co_exe={}",
        report.generation.name(),
        report.shape.query_tile,
        report.shape.kv_tile,
        report.flags.packed,
        report.flags.coexec
    );
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:<LABEL_WIDTH$} {:<12} {:>8}", "Component", "Cycles", "Share");
    let _ = writeln!(out, "{thin}");

    let total = report.total_cycles;
    let _ = writeln!(
        out,
        "{:<LABEL_WIDTH$} {:<12.2} {:>8}",
        "GEMM",
        report.gemm_cycles,
        format_pct(report.gemm_cycles, total)
    );
    let _ = writeln!(
        out,
        "{:<LABEL_WIDTH$} {:<12.2} {:>8}",
        "Softmax Total",
        report.softmax_total,
        format_pct(report.softmax_total, total)
    );
    for (stage, cycles) in report.breakdown.iter() {
        let _ = writeln!(
            out,
            "  {:<23} {:<12.2} {:>8}",
            format_stage_name(stage.key()),
            cycles,
            format_pct(cycles, total)
        );
    }

    let _ = writeln!(out, "{:<LABEL_WIDTH$} {:<12.2}", "Total Cycles", report.total_cycles);
    if shows_coexec_total(report) {
        let _ = writeln!(
            out,
            "{:<LABEL_WIDTH$} {:<12.2}",
            "Total Cycles for Coexecution", report.coexec_total_cycles
        );
    }
    let _ = writeln!(out, "{rule}");
    out
}

/// Render a GEMM metric table with one column per config.
pub fn render_gemm_table(table: &MetricTable) -> String {
    if table.is_empty() {
        return "(no tile configs)\n".to_string();
    }

    let widths: Vec<usize> = table
        .columns
        .iter()
        .map(|c| (c.len() + 2).max(MIN_COLUMN_WIDTH))
        .collect();

    let mut out = String::new();
    let _ = write!(out, "{:<GEMM_LABEL_WIDTH$}", "");
    for (col, w) in table.columns.iter().zip(&widths) {
        let _ = write!(out, "{:>w$}", col, w = *w);
    }
    out.push('\n');

    for row in &table.rows {
        let _ = write!(out, "{:<GEMM_LABEL_WIDTH$}", row.metric.label());
        for (v, w) in row.values.iter().zip(&widths) {
            let _ = write!(out, "{:>w$}", format_cycles(*v), w = *w);
        }
        out.push('\n');
    }
    out
}
