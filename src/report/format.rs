//! Formatted terminal output for an engine run.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays free of presentation concerns
//! - output changes are localized

use crate::domain::{FittedModel, Metric, SampleSummary};
use crate::engine::EngineReport;
use crate::fit::return_period;
use crate::io::ingest::IngestedData;

/// Format the full run summary (data + sample stats + diagnostics + design height).
pub fn format_run_summary(report: &EngineReport, ingest: Option<&IngestedData>) -> String {
    let mut out = String::new();

    out.push_str("=== levee - Flood Design Height ===\n");
    out.push_str(&format!(
        "Risk level: p={} (1-in-{:.0} event) | mode={:?} | criterion={}\n",
        report.risk_level,
        return_period(report.risk_level),
        report.mode,
        report.criterion.metric().name(),
    ));
    if let Some(ingest) = ingest {
        out.push_str(&format_ingest_line(ingest));
    }
    out.push_str(&format_sample_summary(&report.summary));

    out.push_str("\nModel diagnostics:\n");
    out.push_str(&format_score_table(report));

    if !report.failures.is_empty() {
        out.push_str("\nFailed families:\n");
        for (family, err) in &report.failures {
            out.push_str(&format!("- {family}: {err}\n"));
        }
    }

    out.push_str("\nSelected model:\n");
    out.push_str(&format!(
        "- {} ({})\n",
        report.best.family(),
        fmt_params(&report.best)
    ));

    out.push_str("\nDesign height:\n");
    for t in &report.thresholds {
        let marker = if t.model == report.best { "*" } else { " " };
        out.push_str(&format!(
            "{marker} {:<12} {:.3}\n",
            t.model.family().display_name(),
            t.height
        ));
    }
    out.push_str(&format!(
        "  {:<12} {:.3} (sample percentile at 1-p; bounded by the observed maximum)\n",
        "empirical", report.empirical_height
    ));

    out
}

fn format_ingest_line(ingest: &IngestedData) -> String {
    let years = ingest
        .year_span()
        .map(|(a, b)| format!(" | years {a}-{b}"))
        .unwrap_or_default();
    format!(
        "Data: rows read={} used={} dropped={}{years}\n",
        ingest.rows_read,
        ingest.rows_used(),
        ingest.row_errors.len(),
    )
}

/// One-line box-plot style description of the sample.
pub fn format_sample_summary(s: &SampleSummary) -> String {
    format!(
        "Sample: n={} | min={:.3} q1={:.3} median={:.3} q3={:.3} max={:.3} | mean={:.3} sd={:.3} | IQR outliers={}\n",
        s.n, s.min, s.q1, s.median, s.q3, s.max, s.mean, s.std_dev, s.iqr_outliers
    )
}

/// Ranked table of fitted models with their scores and thresholds.
pub fn format_score_table(report: &EngineReport) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>3} {:<12} {:>10} {:>10} {:>8} {:>9}  {}\n",
            "#", "family", "AIC", "BIC", "KS", "height", "params"
        )
        .trim_end(),
    );
    out.push('\n');

    for (i, family) in report.ranking.iter().enumerate() {
        let Some(model) = report.fits.iter().find(|m| m.family() == *family) else {
            continue;
        };
        let score = |metric| {
            report
                .score_of(*family, metric)
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "-".to_string())
        };
        let height = report
            .thresholds
            .iter()
            .find(|t| t.model == *model)
            .map(|t| format!("{:.3}", t.height))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>3} {:<12} {:>10} {:>10} {:>8} {:>9}  {}\n",
            i + 1,
            family.display_name(),
            score(Metric::Aic),
            score(Metric::Bic),
            score(Metric::Ks),
            height,
            fmt_params(model),
        ));
    }
    out
}

fn fmt_params(model: &FittedModel) -> String {
    model
        .named_params()
        .map(|(name, v)| format!("{name}={v:.4}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Criterion, DistributionFamily, FitOptions, Sample, SelectionMode};
    use crate::engine::estimate_threshold;
    use crate::io::ingest::parse_flood_csv;

    fn report(mode: SelectionMode) -> EngineReport {
        let sample = Sample::new(vec![1.2, 1.5, 1.1, 1.8, 1.3, 2.0, 1.4]).unwrap();
        estimate_threshold(
            &sample,
            &[DistributionFamily::Normal, DistributionFamily::Exponential],
            0.01,
            mode,
            Criterion::Aic,
            &FitOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn summary_names_selected_model_and_heights() {
        let r = report(SelectionMode::AllFits);
        let ingest = parse_flood_csv("year,height\n1950,1.2\n1951,x\n").unwrap();
        let txt = format_run_summary(&r, Some(&ingest));
        assert!(txt.contains("1-in-100 event"), "{txt}");
        assert!(txt.contains("criterion=AIC"), "{txt}");
        assert!(txt.contains("rows read=2 used=1 dropped=1 | years 1950-1950"), "{txt}");
        assert!(txt.contains("- Normal (mean=1.4714 std_dev=0.3010)"), "{txt}");
        assert!(txt.contains("empirical"), "{txt}");
        // Both models have a threshold line in all-fits mode.
        assert!(txt.contains("* Normal"), "{txt}");
        assert!(txt.contains("  Exponential"), "{txt}");
    }

    #[test]
    fn score_table_follows_ranking() {
        let r = report(SelectionMode::BestFit);
        let table = format_score_table(&r);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].trim_start().starts_with('#'));
        assert!(lines[1].contains("Normal"));
        assert!(lines[2].contains("Exponential"));
        // Only the best model has a threshold in best-fit mode.
        assert!(lines[2].contains(" - "), "{}", lines[2]);
    }
}
