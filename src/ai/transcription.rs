//! Audio transcription
//!
//! Collaborator interface plus an OpenAI `/audio/transcriptions` client
//! requesting `verbose_json` so segments and detected language come back.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::ai::provider::ProviderConfig;
use crate::ai::provider::openai::{DEFAULT_API_BASE, resolve_api_key};
use crate::types::{AuditError, Result};

/// Timed slice of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Transcription result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    pub language: Option<String>,
    #[serde(rename = "duration")]
    pub duration_secs: Option<f64>,
}

/// Transcription collaborator
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        content_type: &str,
        language: Option<&str>,
    ) -> Result<Transcript>;
}

/// Guess a MIME type from a file extension
pub fn content_type_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

fn file_name_for(content_type: &str) -> &'static str {
    match content_type {
        "audio/mpeg" => "audio.mp3",
        "audio/wav" | "audio/x-wav" => "audio.wav",
        "audio/mp4" => "audio.m4a",
        "audio/ogg" => "audio.ogg",
        "audio/webm" => "audio.webm",
        "audio/flac" => "audio.flac",
        _ => "audio.bin",
    }
}

/// OpenAI Whisper-compatible transcription client
pub struct OpenAiTranscriber {
    api_key: SecretString,
    api_base: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTranscriber")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiTranscriber {
    pub fn new(config: &ProviderConfig, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuditError::Transcription(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: resolve_api_key(config.api_key.clone())?,
            api_base: config
                .api_base
                .clone()
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: model.into(),
            timeout,
            client,
        })
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        content_type: &str,
        language: Option<&str>,
    ) -> Result<Transcript> {
        if audio.is_empty() {
            return Err(AuditError::Transcription("Audio payload is empty".to_string()));
        }

        info!(bytes = audio.len(), content_type, "Transcribing audio");

        let part = Part::bytes(audio)
            .file_name(file_name_for(content_type))
            .mime_str(content_type)
            .map_err(|e| AuditError::Transcription(format!("Invalid content type: {}", e)))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.api_base))
            .timeout(self.timeout)
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuditError::timeout("transcription", self.timeout)
                } else {
                    AuditError::Transcription(format!("Request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuditError::Transcription(format!(
                "API error ({}): {}",
                status, body
            )));
        }

        let transcript: Transcript = response
            .json()
            .await
            .map_err(|e| AuditError::Transcription(format!("Failed to parse response: {}", e)))?;

        debug!(
            chars = transcript.text.len(),
            segments = transcript.segments.len(),
            "Transcription complete"
        );
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_verbose_json() {
        let raw = r#"{
            "task": "transcribe",
            "language": "portuguese",
            "duration": 12.5,
            "text": "Bom dia turma.",
            "segments": [{"id": 0, "start": 0.0, "end": 2.1, "text": "Bom dia turma."}]
        }"#;
        let t: Transcript = serde_json::from_str(raw).unwrap();
        assert_eq!(t.text, "Bom dia turma.");
        assert_eq!(t.language.as_deref(), Some("portuguese"));
        assert_eq!(t.duration_secs, Some(12.5));
        assert_eq!(t.segments.len(), 1);
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("aula.MP3")), "audio/mpeg");
        assert_eq!(content_type_for(Path::new("aula.wav")), "audio/wav");
        assert_eq!(content_type_for(Path::new("aula")), "application/octet-stream");
    }
}
