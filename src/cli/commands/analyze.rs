//! Analyze Command
//!
//! Runs the full phase-gated pipeline over one transcript.
//!
//! Usage:
//!   lessonaudit analyze <transcript> [--provider P] [--model M] [--samples N]
//!                       [--no-enrichment] [--curriculum FILE] [-f json] [-o FILE]

use std::path::PathBuf;

use tokio::runtime::Runtime;
use tracing::info;

use crate::analysis::DeterministicReports;
use crate::cli::commands::detect::render_reports;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, Overrides, read_transcript};
use crate::pipeline::{AnalysisReport, LessonInput, LessonMetadata, Pipeline};
use crate::types::{Result, json_string};

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub path: PathBuf,
    pub overrides: Overrides,
    pub metadata: LessonMetadata,
    /// Competency list (JSON) enabling curriculum matching
    pub curriculum: Option<PathBuf>,
    pub format: String,
    /// Write the JSON report here instead of stdout
    pub output: Option<PathBuf>,
}

pub fn run(options: AnalyzeOptions) -> Result<()> {
    let transcript = read_transcript(&options.path)?;
    let ctx = CommandContext::load(&options.overrides)?;
    let provider = ctx.provider()?;

    info!(
        provider = %ctx.config.llm.provider,
        model = %ctx.config.llm.model,
        self_consistency = ctx.config.pipeline.self_consistency_enabled,
        "Starting analysis"
    );

    let rt = Runtime::new()?;
    let report = rt.block_on(async {
        let mut pipeline = Pipeline::new(provider, &ctx.config);
        if let Some(path) = &options.curriculum {
            pipeline = pipeline.with_curriculum(ctx.curriculum(path).await?);
        }
        pipeline
            .run(LessonInput::new(transcript).with_metadata(options.metadata.clone()))
            .await
    })?;

    if let Some(path) = &options.output {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        Output::new().success(&format!("Report written to {}", path.display()));
        return Ok(());
    }

    if options.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render(&report);
    }
    Ok(())
}

fn render(report: &AnalysisReport) {
    let out = Output::new();
    out.header("Lesson analysis");

    out.section("Scores");
    match report.generative_score() {
        Some(score) => out.score("generative", score),
        None => out.field("generative", "not reported"),
    }
    out.score("rigorous", report.rigor.rigorous_score);
    if let Some(summary) = json_string(&report.outputs.scoring, "summary") {
        out.info(&summary);
    }

    if let Some(warning) = &report.rigor.warning {
        out.section("Discrepancy");
        out.warning(&warning.message);
        for issue in &warning.issues {
            out.bullet(issue);
        }
    }

    let reports = DeterministicReports {
        behavior: report.behavior.clone(),
        context: report.context.clone(),
        compliance: report.compliance.clone(),
    };
    render_reports(&out, &reports);

    if let Some(enrichment) = &report.enrichment {
        out.section("Enrichment");
        if let Some(email) = &enrichment.coaching_email {
            if let Some(subject) = json_string(email, "subject") {
                out.field("coaching email", &subject);
            }
        }
        if let Some(matches) = &enrichment.curriculum {
            for m in matches {
                out.bullet(&format!("{} ({:.2})", m.id, m.score));
            }
        }
        for failed in &enrichment.failed {
            out.warning(&format!("{} unavailable", failed));
        }
    }

    let meta = &report.metadata;
    out.section("Run");
    out.field("run id", meta.run_id.as_str());
    out.field("duration", &format!("{:.1}s", meta.duration_ms as f64 / 1000.0));
    out.field("tokens", &meta.usage.total().to_string());
    if let Some(confidence) = meta.self_consistency.confidence {
        out.field(
            "consensus",
            &format!(
                "{}/{} samples, confidence {:.2}",
                meta.self_consistency.successful_samples,
                meta.self_consistency.requested_samples,
                confidence
            ),
        );
    }
}
