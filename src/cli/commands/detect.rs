//! Detect Command
//!
//! Rule-based reports only: no collaborator calls, no network.
//!
//! Usage:
//!   lessonaudit detect <transcript> [-f json]

use serde_json::json;
use std::path::Path;

use crate::analysis::{DeterministicReports, rigor::rigorous_score};
use crate::cli::ui::Output;
use crate::cli::util::read_transcript;
use crate::types::Result;

pub fn run(path: &Path, format: &str) -> Result<()> {
    let text = read_transcript(path)?;
    let reports = DeterministicReports::analyze(&text);
    let rigorous = rigorous_score(
        reports.behavior.safety_score,
        reports.context.hypocrisy_score,
        reports.compliance.combined_score,
    );

    if format == "json" {
        let out = json!({
            "behavior": reports.behavior,
            "context": reports.context,
            "compliance": reports.compliance,
            "rigorous_score": rigorous,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let out = Output::new();
    out.header(&format!("Rule-based analysis: {}", path.display()));
    render_reports(&out, &reports);
    out.section("Rigorous score");
    out.score("rigorous", rigorous);
    Ok(())
}

/// Text rendering shared with `analyze`
pub(crate) fn render_reports(out: &Output, reports: &DeterministicReports) {
    let behavior = &reports.behavior;
    out.section("Behavior");
    out.score("safety", behavior.safety_score);
    out.field("legal risk", behavior.legal_risk.as_str());
    if !behavior.any_detected() {
        out.success("No harmful patterns detected");
    }
    for detection in behavior.detected() {
        out.warning(&format!(
            "{} ({}, impact {})",
            detection.category.display_name(),
            detection.severity,
            detection.score_impact
        ));
        for snippet in &detection.evidence {
            out.bullet(&format!("\"{}\"", snippet));
        }
    }

    let context = &reports.context;
    out.section("Context");
    out.score("hypocrisy", context.hypocrisy_score);
    let topics: Vec<&str> = context.detected_topics.iter().map(|t| t.as_str()).collect();
    if topics.is_empty() {
        out.field("topics", "-");
    } else {
        out.field("topics", &topics.join(", "));
    }
    for c in &context.contradictions {
        out.warning(&format!(
            "Teaching {} while practicing {} (x{:.1}, -{})",
            c.topic, c.behavior, c.multiplier, c.score_penalty
        ));
    }

    let compliance = &reports.compliance;
    out.section("Compliance");
    out.score("combined", compliance.combined_score);
    for statute in &compliance.statutes {
        out.field(
            &statute.statute.to_string(),
            &format!(
                "{} / {} risk / {}",
                statute.compliance_level.as_str(),
                statute.risk_level.as_str(),
                statute.score
            ),
        );
        for recommendation in &statute.recommendations {
            out.bullet(recommendation);
        }
    }
    if !compliance.summary.is_empty() {
        out.info(&compliance.summary);
    }
}
