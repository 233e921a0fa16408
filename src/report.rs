//! Dual-mode reporting: a colored human summary to stdout, or the same data
//! as JSON when `--stats-json` is set.

use std::io::Write;

use colored::*;
use serde::Serialize;

use crate::control::ControlMetrics;
use crate::eval::DetectorReport;
use crate::util::format_us;

/// One optimizer's share of the control-experiment report, paired with the
/// metrics its run produced.
#[derive(Serialize, Clone, Debug)]
pub struct OptimizerReport {
    pub name: String,
    pub flows_considered: usize,
    pub sum_original_v_us: f64,
    pub sum_optimized_v_us: f64,
    pub percent_reduction: f64,
    pub buffers_dropped: u64,
}

impl OptimizerReport {
    pub fn from_metrics(name: &str, metrics: &ControlMetrics) -> Self {
        Self {
            name: name.to_string(),
            flows_considered: metrics.flows_considered,
            sum_original_v_us: metrics.sum_original_v,
            sum_optimized_v_us: metrics.sum_optimized_v,
            percent_reduction: metrics.percent_reduction(),
            buffers_dropped: metrics.buffers_dropped,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
struct DetectorReportJson<'a> {
    label: &'a str,
    true_positives: u64,
    false_positives: u64,
    false_negatives: u64,
    precision: f64,
    recall: f64,
    f1: f64,
    throughput_mpps: f64,
    size_bytes: usize,
}

impl<'a> From<&'a DetectorReport> for DetectorReportJson<'a> {
    fn from(r: &'a DetectorReport) -> Self {
        Self {
            label: r.label,
            true_positives: r.true_positives,
            false_positives: r.false_positives,
            false_negatives: r.false_negatives,
            precision: r.precision,
            recall: r.recall,
            f1: r.f1,
            throughput_mpps: r.throughput_mpps,
            size_bytes: r.size_bytes,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    records_processed: usize,
    detectors: Vec<DetectorReportJson<'a>>,
    optimizers: &'a [OptimizerReport],
}

/// Prints the full run report, either as a colored human summary (stderr is
/// reserved for logs, so the report itself goes to stdout) or as JSON.
pub fn print_report(
    records_processed: usize,
    detector_reports: &[DetectorReport],
    optimizer_reports: &[OptimizerReport],
    as_json: bool,
) {
    if as_json {
        print_report_json(records_processed, detector_reports, optimizer_reports, std::io::stdout());
    } else {
        print_report_human(records_processed, detector_reports, optimizer_reports);
    }
}

fn print_report_json(
    records_processed: usize,
    detector_reports: &[DetectorReport],
    optimizer_reports: &[OptimizerReport],
    mut writer: impl Write,
) {
    let report = Report {
        records_processed,
        detectors: detector_reports.iter().map(DetectorReportJson::from).collect(),
        optimizers: optimizer_reports,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            let _ = writeln!(writer, "{json}");
        }
        Err(e) => {
            eprintln!("{}", format!("Failed to serialize report: {e}").red().bold());
        }
    }
}

fn print_report_human(
    records_processed: usize,
    detector_reports: &[DetectorReport],
    optimizer_reports: &[OptimizerReport],
) {
    println!(
        "{}",
        "----------------------------------------------------------"
            .on_bright_black()
            .blue()
            .bold()
    );
    println!(
        "{} {}",
        "Records processed:".bold(),
        records_processed.to_string().yellow()
    );
    println!();
    println!("{}", "Detector comparison (vs. ground truth)".bold().underline());
    println!(
        "{:<22} {:>6} {:>6} {:>6} {:>9} {:>9} {:>9} {:>10} {:>10}",
        "detector", "TP", "FP", "FN", "precision", "recall", "f1", "Mpps", "bytes"
    );
    for r in detector_reports {
        println!(
            "{:<22} {:>6} {:>6} {:>6} {:>9.3} {:>9.3} {:>9.3} {:>10.3} {:>10}",
            r.label,
            r.true_positives,
            r.false_positives,
            r.false_negatives,
            r.precision,
            r.recall,
            r.f1,
            r.throughput_mpps,
            r.size_bytes
        );
    }
    println!();
    println!("{}", "Delay-compensation experiments".bold().underline());
    for opt in optimizer_reports {
        let headline = format!(
            "{}: {} flows, V {} -> {} ({:+.1}% reduction), {} buffers dropped",
            opt.name,
            opt.flows_considered,
            format_us(opt.sum_original_v_us as u64),
            format_us(opt.sum_optimized_v_us as u64),
            opt.percent_reduction,
            opt.buffers_dropped
        );
        if opt.percent_reduction > 0.0 {
            println!("{}", headline.green());
        } else {
            println!("{}", headline.yellow());
        }
    }
    println!(
        "{}",
        "----------------------------------------------------------"
            .on_bright_black()
            .blue()
            .bold()
    );
}
