//! Typed pipeline context
//!
//! Each phase writes one typed field after its barrier succeeds. Prompts for
//! later sub-tasks are rendered from whatever fields are present.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::DeterministicReports;
use crate::constants::pipeline::MAX_TRANSCRIPT_CHARS;
use crate::types::truncate_chars;

/// Optional facts about the lesson supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl LessonMetadata {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.subject.is_none() && self.grade.is_none()
    }
}

/// Pipeline input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonInput {
    pub transcript: String,
    #[serde(default)]
    pub metadata: LessonMetadata,
}

impl LessonInput {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            metadata: LessonMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: LessonMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingOutputs {
    pub structure: Value,
    pub classification: Value,
    pub participation: Value,
}

impl ReadingOutputs {
    /// Merge barrier outputs by sub-task name
    pub fn merge(outputs: Vec<(&'static str, Value)>) -> Self {
        let mut merged = Self::default();
        for (name, value) in outputs {
            match name {
                "structure" => merged.structure = value,
                "classification" => merged.classification = value,
                "participation" => merged.participation = value,
                _ => {}
            }
        }
        merged
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutputs {
    pub pedagogy: Value,
    pub socioemotional: Value,
    pub legal: Value,
}

impl AnalysisOutputs {
    pub fn merge(outputs: Vec<(&'static str, Value)>) -> Self {
        let mut merged = Self::default();
        for (name, value) in outputs {
            match name {
                "pedagogy" => merged.pedagogy = value,
                "socioemotional" => merged.socioemotional = value,
                "legal" => merged.legal = value,
                _ => {}
            }
        }
        merged
    }
}

/// Accumulated state of one run
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub input: LessonInput,
    pub reading: Option<ReadingOutputs>,
    pub analysis: Option<AnalysisOutputs>,
    pub scoring: Option<Value>,
    pub deterministic: Option<DeterministicReports>,
}

impl PipelineContext {
    pub fn new(input: LessonInput) -> Self {
        Self {
            input,
            reading: None,
            analysis: None,
            scoring: None,
            deterministic: None,
        }
    }

    pub fn transcript(&self) -> &str {
        &self.input.transcript
    }

    /// User prompt carrying the transcript and every completed phase
    pub fn user_prompt(&self) -> String {
        let mut prompt = String::new();

        if !self.input.metadata.is_empty() {
            prompt.push_str("# Lesson\n\n");
            let meta = &self.input.metadata;
            for (label, value) in [
                ("Title", &meta.title),
                ("Subject", &meta.subject),
                ("Grade", &meta.grade),
            ] {
                if let Some(v) = value {
                    prompt.push_str(&format!("**{}**: {}\n", label, v));
                }
            }
            prompt.push('\n');
        }

        if let Some(reading) = &self.reading {
            push_json(&mut prompt, "Reading", reading);
        }
        if let Some(analysis) = &self.analysis {
            push_json(&mut prompt, "Analysis", analysis);
        }
        if let Some(scoring) = &self.scoring {
            push_json(&mut prompt, "Scoring", scoring);
        }
        if let Some(reports) = &self.deterministic {
            prompt.push_str("# Rule-based findings\n\n");
            prompt.push_str(&format!(
                "safety_score: {}\nhypocrisy_score: {}\ncompliance_score: {}\n",
                reports.behavior.safety_score,
                reports.context.hypocrisy_score,
                reports.compliance.combined_score
            ));
            for detection in reports.behavior.detected() {
                prompt.push_str(&format!(
                    "- {} ({}): {}\n",
                    detection.category.display_name(),
                    detection.severity,
                    detection.evidence.join(" | ")
                ));
            }
            prompt.push('\n');
        }

        prompt.push_str("# Transcript\n\n");
        prompt.push_str(truncate_chars(self.transcript(), MAX_TRANSCRIPT_CHARS));
        prompt
    }
}

fn push_json<T: Serialize>(prompt: &mut String, header: &str, value: &T) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_default();
    prompt.push_str(&format!("# {}\n\n{}\n\n", header, rendered));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_by_name() {
        let reading = ReadingOutputs::merge(vec![
            ("participation", json!({"p": 1})),
            ("structure", json!({"s": 1})),
            ("classification", json!({"c": 1})),
        ]);
        assert_eq!(reading.structure["s"], 1);
        assert_eq!(reading.participation["p"], 1);
        assert_eq!(reading.classification["c"], 1);
    }

    #[test]
    fn test_prompt_grows_with_phases() {
        let mut ctx = PipelineContext::new(
            LessonInput::new("Bom dia, turma.").with_metadata(LessonMetadata {
                subject: Some("Português".into()),
                ..Default::default()
            }),
        );
        let first = ctx.user_prompt();
        assert!(first.contains("**Subject**: Português"));
        assert!(first.ends_with("Bom dia, turma."));
        assert!(!first.contains("# Reading"));

        ctx.reading = Some(ReadingOutputs::default());
        ctx.deterministic = Some(DeterministicReports::analyze("Bom dia, turma."));
        let later = ctx.user_prompt();
        assert!(later.contains("# Reading"));
        assert!(later.contains("safety_score: 100"));
    }

    #[test]
    fn test_transcript_is_truncated() {
        let ctx = PipelineContext::new(LessonInput::new("a".repeat(MAX_TRANSCRIPT_CHARS + 10)));
        let prompt = ctx.user_prompt();
        assert!(prompt.len() < MAX_TRANSCRIPT_CHARS + 100);
    }
}
