//! Scripted mock provider for tests, demos, and offline runs.
//!
//! The script is consumed one entry per call; once it runs out, the last
//! entry repeats forever. Every request is recorded so callers can assert on
//! the prompts and temperature that were actually sent.

use analyst_core::error::ProviderError;
use analyst_core::provider::{Provider, ProviderRequest, ProviderResponse};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Placeholder assessment returned by [`MockProvider::demo`].
pub const DEMO_RESPONSE: &str = r#"{
  "name": "Demo Startup",
  "summary": "Demo summary; limited data.",
  "market": {"size_estimate": "unknown", "top_markets": [], "competitors": []},
  "product": {"category": "demo", "differentiation": "unknown"},
  "business_model": {"revenue_streams": [], "monetization_risks": []},
  "team": {"founders_count": "unknown", "strengths": [], "gaps": []},
  "risks": [],
  "recommendation": {"invest": "hold", "rationale": "insufficient data"},
  "assumptions": ["demo"]
}"#;

/// A provider that replays a fixed script of outputs and errors.
pub struct MockProvider {
    script: Vec<Result<String, ProviderError>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    /// Replay `script` in order, repeating the last entry once exhausted.
    pub fn scripted(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always return the same text.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::scripted(vec![Ok(text.into())])
    }

    /// Return each text in turn, then keep returning the last one.
    pub fn sequence<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::scripted(texts.into_iter().map(|t| Ok(t.into())).collect())
    }

    /// Always fail with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::scripted(vec![Err(error)])
    }

    /// Always return a schema-valid placeholder assessment.
    pub fn demo() -> Self {
        Self::fixed(DEMO_RESPONSE)
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.recorded().len()
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.recorded().clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.recorded().last().cloned()
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<ProviderRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        let index = {
            let mut requests = self.recorded();
            requests.push(request);
            requests.len() - 1
        };

        debug!(provider = "mock", call = index + 1, "Replaying scripted response");

        let Some(entry) = self.script.get(index).or_else(|| self.script.last()) else {
            return Err(ProviderError::NotConfigured(
                "mock provider has an empty script".into(),
            ));
        };

        entry
            .clone()
            .map(|text| ProviderResponse::text(text, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user: &str) -> ProviderRequest {
        ProviderRequest::new("mock-model", "system", user, 0.1)
    }

    #[tokio::test]
    async fn fixed_repeats_forever() {
        let mock = MockProvider::fixed("{}");
        for _ in 0..3 {
            let resp = mock.complete(request("u")).await.unwrap();
            assert_eq!(resp.text, "{}");
            assert_eq!(resp.model, "mock-model");
        }
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn sequence_then_last_entry_repeats() {
        let mock = MockProvider::sequence(["not-json", "second"]);
        assert_eq!(mock.generate("m", "s", "u", 0.1).await.unwrap(), "not-json");
        assert_eq!(mock.generate("m", "s", "u", 0.1).await.unwrap(), "second");
        assert_eq!(mock.generate("m", "s", "u", 0.1).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn failing_returns_error_every_time() {
        let mock = MockProvider::failing(ProviderError::Network("down".into()));
        for _ in 0..2 {
            let err = mock.complete(request("u")).await.unwrap_err();
            assert_eq!(err, ProviderError::Network("down".into()));
        }
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn scripted_mixes_errors_and_text() {
        let mock = MockProvider::scripted(vec![
            Err(ProviderError::Timeout("slow".into())),
            Ok("ok".into()),
        ]);
        assert!(mock.complete(request("a")).await.is_err());
        assert_eq!(mock.complete(request("b")).await.unwrap().text, "ok");
    }

    #[tokio::test]
    async fn records_requests() {
        let mock = MockProvider::demo();
        mock.complete(request("first")).await.unwrap();
        mock.complete(request("second")).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].user, "first");
        assert_eq!(mock.last_request().unwrap().user, "second");
    }

    #[tokio::test]
    async fn empty_script_is_not_configured() {
        let mock = MockProvider::scripted(vec![]);
        let err = mock.complete(request("u")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn demo_response_is_json() {
        let value: serde_json::Value = serde_json::from_str(DEMO_RESPONSE).unwrap();
        assert_eq!(value["name"], "Demo Startup");
    }
}
