//! Extraction invocation wrapper.
//!
//! Adds the throttle delay and the hard timeout around a backend call and
//! turns the backend's raw text into an [`ExtractionOutput`] or one of the
//! [`ExtractionError`] kinds.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use fuelscan_core::{ExtractionBackend, ExtractionError, ExtractionOutput};

use crate::config::SchedulerConfig;

/// Throttled, time-limited caller of an [`ExtractionBackend`].
#[derive(Clone)]
pub struct ExtractionInvoker {
    backend: Arc<dyn ExtractionBackend>,
    timeout: Duration,
    throttle: Duration,
}

impl ExtractionInvoker {
    pub fn new(
        backend: Arc<dyn ExtractionBackend>,
        timeout: Duration,
        throttle: Duration,
    ) -> Self {
        Self {
            backend,
            timeout,
            throttle,
        }
    }

    pub fn from_config(backend: Arc<dyn ExtractionBackend>, config: &SchedulerConfig) -> Self {
        Self::new(backend, config.timeout(), config.throttle())
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Run one extraction for `image_url`.
    ///
    /// The throttle is a cooperative sleep and is not counted against the
    /// timeout. On expiry the in-flight backend future is dropped.
    pub async fn invoke(&self, image_url: &str) -> Result<ExtractionOutput, ExtractionError> {
        if !self.throttle.is_zero() {
            tokio::time::sleep(self.throttle).await;
        }

        let start = Instant::now();
        let text = tokio::time::timeout(self.timeout, self.backend.extract(image_url))
            .await
            .map_err(|_| ExtractionError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            })??;

        debug!(
            subsystem = "jobs",
            component = "invoker",
            model = self.backend.model_name(),
            response_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Extraction call returned"
        );

        normalize(&text)
    }
}

/// Decode backend text into an extraction output.
///
/// Blank text and decoded outputs with neither rows nor an element number are
/// both reported as [`ExtractionError::EmptyResponse`].
pub fn normalize(text: &str) -> Result<ExtractionOutput, ExtractionError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let output: ExtractionOutput =
        serde_json::from_str(text).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    if output.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelscan_inference::mock::MockExtractionBackend;

    fn invoker(
        backend: MockExtractionBackend,
        timeout_ms: u64,
        throttle_ms: u64,
    ) -> ExtractionInvoker {
        ExtractionInvoker::new(
            Arc::new(backend),
            Duration::from_millis(timeout_ms),
            Duration::from_millis(throttle_ms),
        )
    }

    #[test]
    fn test_normalize_valid_output() {
        let output = normalize(
            r#"  {"elementNumber":"E1","rows":[{"date":"2024-03-01"},{"date":"2024-03-02"}],"outliers":"none"} "#,
        )
        .unwrap();
        assert_eq!(output.element_number, "E1");
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.outliers, "none");
    }

    #[test]
    fn test_normalize_blank_is_empty_response() {
        assert_eq!(normalize(""), Err(ExtractionError::EmptyResponse));
        assert_eq!(normalize("  \n"), Err(ExtractionError::EmptyResponse));
    }

    #[test]
    fn test_normalize_structurally_empty_is_empty_response() {
        assert_eq!(normalize("{}"), Err(ExtractionError::EmptyResponse));
        assert_eq!(
            normalize(r#"{"elementNumber":"","rows":[],"outliers":"page is blank"}"#),
            Err(ExtractionError::EmptyResponse)
        );
    }

    #[test]
    fn test_normalize_rows_without_element_number_is_ok() {
        let output = normalize(r#"{"rows":[{"address":"A1"}]}"#).unwrap();
        assert_eq!(output.rows[0].address, "A1");
    }

    #[test]
    fn test_normalize_schema_mismatch_is_parse_error() {
        assert!(matches!(
            normalize("not json"),
            Err(ExtractionError::Parse(_))
        ));
        assert!(matches!(
            normalize(r#"{"rows": 7}"#),
            Err(ExtractionError::Parse(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_times_out() {
        let backend = MockExtractionBackend::new()
            .with_raw_response(r#"{"elementNumber":"E1"}"#)
            .with_latency(Duration::from_secs(120));
        let invoker = invoker(backend.clone(), 60_000, 0);

        let result = invoker.invoke("https://img/pin.jpg").await;

        assert_eq!(result, Err(ExtractionError::Timeout { after_ms: 60_000 }));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_precedes_call_and_is_not_timed() {
        let backend = MockExtractionBackend::new()
            .with_raw_response(r#"{"elementNumber":"E1"}"#)
            .with_latency(Duration::from_millis(400));
        // Throttle longer than the timeout: the call must still succeed.
        let invoker = invoker(backend, 500, 1_000);

        let start = tokio::time::Instant::now();
        let output = invoker.invoke("https://img/pin.jpg").await.unwrap();

        assert_eq!(output.element_number, "E1");
        assert!(start.elapsed() >= Duration::from_millis(1_400));
    }

    #[tokio::test]
    async fn test_upstream_error_passes_through() {
        let backend = MockExtractionBackend::new().with_error(ExtractionError::Upstream {
            status: Some(503),
            message: "overloaded".to_string(),
        });
        let result = invoker(backend, 1_000, 0).invoke("u").await;
        assert!(matches!(
            result,
            Err(ExtractionError::Upstream {
                status: Some(503),
                ..
            })
        ));
    }
}
