//! Scripted extraction backend for deterministic testing.
//!
//! Replies queued with `push_*` are consumed in order; once the script is
//! exhausted every call gets the default reply.
//!
//! ```rust,ignore
//! use fuelscan_inference::mock::MockExtractionBackend;
//!
//! let backend = MockExtractionBackend::new()
//!     .with_output(output)
//!     .with_latency(Duration::from_secs(90));
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use fuelscan_core::{ExtractionBackend, ExtractionError, ExtractionOutput};

type Reply = Result<String, ExtractionError>;

#[derive(Debug)]
struct MockState {
    script: VecDeque<Reply>,
    default_reply: Reply,
    latency: Duration,
    calls: Vec<String>,
}

/// Mock extraction backend with scripted replies and a call log.
#[derive(Clone)]
pub struct MockExtractionBackend {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockExtractionBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(output: &ExtractionOutput) -> String {
    serde_json::to_string(output).unwrap_or_default()
}

impl MockExtractionBackend {
    /// Backend that answers `{}` (an empty extraction) by default.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                script: VecDeque::new(),
                default_reply: Ok("{}".to_string()),
                latency: Duration::ZERO,
                calls: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer every unscripted call with this output.
    pub fn with_output(self, output: ExtractionOutput) -> Self {
        self.state().default_reply = Ok(encode(&output));
        self
    }

    /// Answer every unscripted call with this raw text.
    pub fn with_raw_response(self, text: impl Into<String>) -> Self {
        self.state().default_reply = Ok(text.into());
        self
    }

    /// Fail every unscripted call with this error.
    pub fn with_error(self, error: ExtractionError) -> Self {
        self.state().default_reply = Err(error);
        self
    }

    /// Delay every call. Pairs with `tokio::time::pause` in timeout tests.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = latency;
        self
    }

    /// Queue a one-shot successful reply.
    pub fn push_output(&self, output: ExtractionOutput) {
        self.state().script.push_back(Ok(encode(&output)));
    }

    /// Queue a one-shot failure.
    pub fn push_error(&self, error: ExtractionError) {
        self.state().script.push_back(Err(error));
    }

    /// Image URLs passed to `extract`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }
}

#[async_trait]
impl ExtractionBackend for MockExtractionBackend {
    async fn extract(&self, image_url: &str) -> Result<String, ExtractionError> {
        let (reply, latency) = {
            let mut state = self.state();
            state.calls.push(image_url.to_string());
            let reply = match state.script.pop_front() {
                Some(reply) => reply,
                None => state.default_reply.clone(),
            };
            (reply, state.latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        reply
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelscan_core::InspectionRow;

    #[tokio::test]
    async fn test_default_reply_is_empty_object() {
        let backend = MockExtractionBackend::new();
        assert_eq!(backend.extract("u").await.unwrap(), "{}");
        assert_eq!(backend.calls(), vec!["u".to_string()]);
    }

    #[tokio::test]
    async fn test_script_consumed_before_default() {
        let output = ExtractionOutput {
            element_number: "E1".to_string(),
            rows: vec![InspectionRow::default()],
            outliers: String::new(),
        };
        let backend = MockExtractionBackend::new().with_output(output.clone());
        backend.push_error(ExtractionError::EmptyResponse);

        assert_eq!(
            backend.extract("a").await,
            Err(ExtractionError::EmptyResponse)
        );
        let text = backend.extract("b").await.unwrap();
        let decoded: ExtractionOutput = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, output);
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_uses_tokio_time() {
        let backend = MockExtractionBackend::new().with_latency(Duration::from_secs(30));
        let start = tokio::time::Instant::now();
        backend.extract("u").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(30));
    }
}
