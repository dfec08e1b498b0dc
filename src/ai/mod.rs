//! AI Integration Layer
//!
//! Collaborator interfaces (text generation, transcription, embeddings,
//! vector search) and the plumbing around them: timeouts, retries,
//! semantic caching, response repair and metrics.

pub mod cache;
pub mod curriculum;
pub mod embedding;
pub mod metrics;
pub mod prompt;
pub mod provider;
pub mod timeout;
pub mod transcription;
pub mod validation;
pub mod vector;

pub use cache::{SemanticCache, namespace_for};
pub use curriculum::{Competency, CurriculumMatcher};
pub use embedding::{Embedder, OpenAiEmbedder, SharedEmbedder};
pub use metrics::{MetricsCollector, MetricsSummary, PhaseMetrics, SharedMetrics};
pub use prompt::{PromptBuilder, PromptSection, PromptTemplates};
pub use provider::{
    CachedProvider, ErrorCategory, ErrorClassifier, GenerationRequest, LlmError, LlmProvider,
    LlmResponse, OllamaProvider, OpenAiProvider, ProviderConfig, ResponseMetadata, ResponseTiming,
    RetryConfig, RetryingProvider, SharedProvider, TokenUsage, create_provider,
};
pub use timeout::{CallKind, TimeoutConfig, with_timeout};
pub use transcription::{OpenAiTranscriber, Transcriber, Transcript, TranscriptSegment};
pub use validation::{JsonRepairer, is_parse_failed, parse_or_sentinel, parse_structured};
pub use vector::{InMemoryVectorStore, SharedVectorStore, VectorMatch, VectorStore};
