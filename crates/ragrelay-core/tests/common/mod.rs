//! Shared test fixtures: a scriptable in-process provider
#![allow(dead_code)]

use async_trait::async_trait;
use ragrelay_core::{GenerationParams, Provider, RelayError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One scripted outcome for a provider call
pub enum Outcome {
    Answer(String),
    RateLimited,
    Transient,
    Permanent,
    /// Never return until the cancellation token fires
    Hang,
}

/// Scriptable provider that counts calls and records cancellation
pub struct MockProvider {
    calls: AtomicUsize,
    embed_calls: AtomicUsize,
    script: Mutex<VecDeque<Outcome>>,
    embed_script: Mutex<VecDeque<Outcome>>,
    cancelled: AtomicBool,
    delay: Duration,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            embed_script: Mutex::new(VecDeque::new()),
            cancelled: AtomicBool::new(false),
            delay: Duration::ZERO,
        }
    }

    /// Simulated network latency per call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(self, outcomes: Vec<Outcome>) -> Self {
        self.script.lock().unwrap().extend(outcomes);
        self
    }

    pub fn script_embed(self, outcomes: Vec<Outcome>) -> Self {
        self.embed_script.lock().unwrap().extend(outcomes);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn apply(
        &self,
        outcome: Option<Outcome>,
        default_answer: String,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if !self.delay.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(self.delay) => {}
                () = cancel.cancelled() => {
                    self.cancelled.store(true, Ordering::SeqCst);
                    return Err(RelayError::Cancelled);
                }
            }
        }

        match outcome {
            None => Ok(default_answer),
            Some(Outcome::Answer(text)) => Ok(text),
            Some(Outcome::RateLimited) => {
                Err(RelayError::RateLimited("too many requests".into()))
            }
            Some(Outcome::Transient) => Err(RelayError::Transient("connection reset".into())),
            Some(Outcome::Permanent) => Err(RelayError::Permanent("401 unauthorized".into())),
            Some(Outcome::Hang) => {
                cancel.cancelled().await;
                self.cancelled.store(true, Ordering::SeqCst);
                Err(RelayError::Cancelled)
            }
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn invoke_text(
        &self,
        prompt: &str,
        _params: &GenerationParams,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script.lock().unwrap().pop_front();
        self.apply(outcome, format!("answer to: {prompt}"), cancel).await
    }

    async fn embed(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.embed_script.lock().unwrap().pop_front();
        match outcome {
            None => Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect()),
            Some(Outcome::Answer(_)) => Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect()),
            Some(Outcome::RateLimited) => {
                Err(RelayError::RateLimited("too many requests".into()))
            }
            Some(Outcome::Transient) => Err(RelayError::Transient("connection reset".into())),
            Some(Outcome::Permanent) => Err(RelayError::Permanent("401 unauthorized".into())),
            Some(Outcome::Hang) => {
                cancel.cancelled().await;
                self.cancelled.store(true, Ordering::SeqCst);
                Err(RelayError::Cancelled)
            }
        }
    }

    fn deployment(&self) -> &str {
        "mock-chat"
    }

    fn embedding_deployment(&self) -> &str {
        "mock-embed"
    }

    fn embedding_dimensions(&self) -> usize {
        2
    }
}
