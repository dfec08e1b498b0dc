//! Scripted provider for tests
//!
//! Replies come from a closure that sees the request and the zero-based call
//! index. Tracks call count, temperatures and peak concurrency.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{GenerationRequest, LlmProvider, LlmResponse, ResponseMetadata, ResponseTiming, TokenUsage};
use crate::types::Result;

type Responder = dyn Fn(&GenerationRequest, usize) -> Result<String> + Send + Sync;

pub(crate) struct MockProvider {
    responder: Box<Responder>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    temperatures: Mutex<Vec<f32>>,
}

impl MockProvider {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&GenerationRequest, usize) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            temperatures: Mutex::new(Vec::new()),
        }
    }

    /// Same text for every call
    pub(crate) fn fixed(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    /// Replies in order, repeating the last one
    pub(crate) fn sequence(texts: Vec<&str>) -> Self {
        let texts: Vec<String> = texts.into_iter().map(String::from).collect();
        Self::new(move |_, call| {
            let idx = call.min(texts.len().saturating_sub(1));
            Ok(texts.get(idx).cloned().unwrap_or_default())
        })
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn temperatures(&self) -> Vec<f32> {
        self.temperatures
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<LlmResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut temps) = self.temperatures.lock() {
            temps.push(request.temperature);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = (self.responder)(request, call);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        reply.map(|text| {
            LlmResponse::with_metrics(
                text,
                TokenUsage::from_openai(10, 5),
                ResponseTiming::from_duration(self.delay),
                ResponseMetadata {
                    model: "mock-model".to_string(),
                    provider: "mock".to_string(),
                    cached: false,
                },
            )
        })
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
