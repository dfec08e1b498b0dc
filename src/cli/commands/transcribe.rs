//! Transcribe Command
//!
//! Sends an audio recording to the transcription collaborator.
//!
//! Usage:
//!   lessonaudit transcribe <audio> [--language pt] [-f json] [-o FILE]

use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;
use tracing::info;

use crate::ai::transcription::content_type_for;
use crate::ai::{CallKind, OpenAiTranscriber, Transcriber};
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, Overrides};
use crate::types::{AuditError, Result};

pub fn run(
    audio: &Path,
    language: Option<&str>,
    format: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let bytes = std::fs::read(audio)?;
    if bytes.is_empty() {
        return Err(AuditError::Transcription(format!(
            "Audio file is empty: {}",
            audio.display()
        )));
    }

    let ctx = CommandContext::load(&Overrides::default())?;
    let transcriber = OpenAiTranscriber::new(
        &ctx.provider_config(),
        ctx.config.llm.transcription_model.clone(),
        ctx.config.pipeline.timeouts.for_kind(CallKind::Transcription),
    )?;

    let content_type = content_type_for(audio);
    info!(bytes = bytes.len(), content_type, "Transcribing");

    let rt = Runtime::new()?;
    let transcript = rt.block_on(transcriber.transcribe(bytes, content_type, language))?;

    let rendered = if format == "json" {
        serde_json::to_string_pretty(&transcript)?
    } else {
        transcript.text.clone()
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            Output::new().success(&format!(
                "Transcript written to {} ({} segments)",
                path.display(),
                transcript.segments.len()
            ));
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
