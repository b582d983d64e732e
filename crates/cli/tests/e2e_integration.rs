//! End-to-end integration tests for the startup analyst.
//!
//! These tests wire configuration, provider routing, session memory and the
//! deterministic chain together the same way the binary does, with scripted
//! providers standing in for real LLM backends.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use analyst_chain::{ChainFailure, DeterministicChain, FailureKind, prompts};
use analyst_config::AppConfig;
use analyst_core::error::ProviderError;
use analyst_core::memory::SessionMemory;
use analyst_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use analyst_memory::RollingMemory;
use analyst_providers::{ProviderRouter, build_from_config};
use analyst_schema::{FoundersCount, Invest};

// ── Scripted Provider ────────────────────────────────────────────────────

/// Replays responses in order and captures every request it sees.
struct ScriptedProvider {
    responses: Vec<Result<String, ProviderError>>,
    seen: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ProviderRequest {
        self.seen.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut seen = self.seen.lock().unwrap();
        let index = seen.len().min(self.responses.len() - 1);
        seen.push(request.clone());

        self.responses[index].clone().map(|text| ProviderResponse {
            text,
            model: request.model,
            usage: Some(Usage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            }),
        })
    }
}

fn assessment_json(name: &str, invest: &str, founders: &str) -> String {
    format!(
        r#"{{
  "name": "{name}",
  "summary": "{name} sells compliance software to fintechs; revenue via subscriptions.",
  "market": {{"size_estimate": "> $500M", "top_markets": ["EU", "US"], "competitors": ["unknown"]}},
  "product": {{"category": "regtech", "differentiation": "automated audit trails"}},
  "business_model": {{"revenue_streams": ["subscriptions"], "monetization_risks": ["long sales cycles"]}},
  "team": {{"founders_count": {founders}, "strengths": ["domain expertise"], "gaps": ["go-to-market"]}},
  "risks": ["regulatory change"],
  "recommendation": {{"invest": "{invest}", "rationale": "strong team; early revenue"}},
  "assumptions": ["EU focus inferred from description"]
}}"#
    )
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn chain_with(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    memory: Arc<RollingMemory>,
) -> DeterministicChain {
    DeterministicChain::from_config(&config.chain, provider, memory, config.effective_model())
}

// ── Config → Router → Chain ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_default_config_runs_against_demo_provider() {
    let config = AppConfig::default();
    let router = build_from_config(&config);
    let provider = router.default().unwrap();
    let memory = Arc::new(RollingMemory::new(config.memory.capacity));

    let chain = chain_with(&config, provider, memory.clone());
    let assessment = chain.run("A demo startup", Some("demo")).await.unwrap();

    assert_eq!(assessment.name, "Demo Startup");
    assert_eq!(assessment.team.founders_count, FoundersCount::Unknown);
    assert_eq!(memory.get_recent(Some("demo")).await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn e2e_config_file_drives_retry_budget_and_policy() {
    let file = write_config(
        r#"
default_model = "analyst-small"

[chain]
max_retries = 0
invest_policy = "coerce_to_hold"

[memory]
capacity = 2
"#,
    );
    let config = AppConfig::load_from(file.path()).unwrap();

    let provider = Arc::new(ScriptedProvider::new(vec![Ok(assessment_json(
        "LedgerLoop",
        "strong yes",
        "3",
    ))]));
    let memory = Arc::new(RollingMemory::new(config.memory.capacity));
    let chain = chain_with(&config, provider.clone(), memory.clone());

    let assessment = chain.run("LedgerLoop description", Some("s")).await.unwrap();
    assert_eq!(assessment.recommendation.invest, Invest::Hold);
    assert_eq!(assessment.team.founders_count, FoundersCount::Count(3));
    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.request(0).model, "analyst-small");
    assert_eq!(memory.capacity(), 2);
}

#[tokio::test(start_paused = true)]
async fn e2e_router_with_registered_provider() {
    let scripted = Arc::new(ScriptedProvider::new(vec![
        Err(ProviderError::RateLimited {
            retry_after_secs: 1,
        }),
        Ok(assessment_json("Acme Market", "yes", "\"unknown\"")),
    ]));

    let mut router = ProviderRouter::new("scripted");
    router.register("scripted", scripted.clone());
    let config = AppConfig::default();
    let chain = chain_with(
        &config,
        router.default().unwrap(),
        Arc::new(RollingMemory::new(4)),
    );

    let assessment = chain.run("Acme Market", None).await.unwrap();
    assert_eq!(assessment.recommendation.invest, Invest::Yes);
    assert_eq!(scripted.calls(), 2);
    // Transport failures retry with the same prompt
    assert_eq!(scripted.request(0).user, scripted.request(1).user);
}

// ── Retry Behavior ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn e2e_fenced_output_is_corrected() {
    let valid = assessment_json("Acme Market", "hold", "2");
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(format!("```json\n{valid}\n```")),
        Ok(valid.clone()),
    ]));
    let chain = chain_with(
        &AppConfig::default(),
        provider.clone(),
        Arc::new(RollingMemory::new(4)),
    );

    let assessment = chain.run("Acme Market", None).await.unwrap();
    assert_eq!(assessment.name, "Acme Market");
    assert_eq!(provider.calls(), 2);
    assert!(provider.request(1).user.starts_with(prompts::JSON_CORRECTION));
}

#[tokio::test(start_paused = true)]
async fn e2e_failure_payload_shape() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(
        r#"{"name": "Acme", "summary": "   "}"#.to_string(),
    )]));
    let chain = chain_with(
        &AppConfig::default(),
        provider.clone(),
        Arc::new(RollingMemory::new(4)),
    );

    let failure = chain.run("Acme", Some("s")).await.unwrap_err();
    assert_eq!(failure.kind(), FailureKind::ValidationFailed);
    assert_eq!(provider.calls(), 3);

    let json = serde_json::to_value(&failure).unwrap();
    assert_eq!(json["kind"], "validation_failed");
    assert_eq!(json["attempt"], 3);
    let issues = json["validation"]["issues"].as_array().unwrap();
    assert!(issues.iter().any(|i| i["path"] == "summary" && i["problem"] == "empty"));
    assert!(issues.iter().any(|i| i["path"] == "market" && i["problem"] == "missing"));
}

#[tokio::test(start_paused = true)]
async fn e2e_exhausted_transport_errors() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(
        ProviderError::AuthenticationFailed("Invalid API key".into()),
    )]));
    let chain = chain_with(
        &AppConfig::default(),
        provider.clone(),
        Arc::new(RollingMemory::new(4)),
    );

    let failure = chain.run("Acme", None).await.unwrap_err();
    assert!(matches!(
        failure,
        ChainFailure::LlmCallFailed { ref detail, attempt: 3 } if detail.contains("Invalid API key")
    ));
}

// ── Memory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_memory_rolls_over_across_turns() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(assessment_json(
        "Acme Market",
        "hold",
        "2",
    ))]));
    let memory = Arc::new(RollingMemory::new(4));
    let chain = chain_with(&AppConfig::default(), provider.clone(), memory.clone());

    for turn in 1..=3 {
        chain.run(&format!("turn {turn}"), Some("s")).await.unwrap();
    }

    let recent = memory.get_recent(Some("s")).await;
    assert_eq!(recent.len(), 4);
    assert_eq!(recent[0], "USER: turn 2");
    assert_eq!(recent[2], "USER: turn 3");
    assert!(recent[3].starts_with("ASSISTANT_SUMMARY: Acme Market sells"));

    // The third prompt saw the first two turns
    let third = provider.request(2).user;
    assert!(third.starts_with("RECENT_CONVERSATION:\n- USER: turn 1\n"));
    assert!(third.contains("- USER: turn 2\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn e2e_concurrent_sessions_stay_isolated() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(assessment_json(
        "Acme Market",
        "no",
        "1",
    ))]));
    let memory = Arc::new(RollingMemory::new(4));
    let chain = Arc::new(
        chain_with(&AppConfig::default(), provider, memory.clone())
            .with_backoff(Duration::ZERO, Duration::ZERO),
    );

    let mut handles = Vec::new();
    for i in 0..8 {
        let chain = chain.clone();
        handles.push(tokio::spawn(async move {
            let session = format!("session-{i}");
            chain.run(&format!("input {i}"), Some(&session)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for i in 0..8 {
        let recent = memory.get_recent(Some(&format!("session-{i}"))).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0], format!("USER: input {i}"));
    }
    assert_eq!(memory.session_count().await, 8);
}

#[tokio::test]
async fn e2e_system_prompt_is_stable() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(assessment_json(
        "Acme Market",
        "hold",
        "2",
    ))]));
    let chain = chain_with(
        &AppConfig::default(),
        provider.clone(),
        Arc::new(RollingMemory::new(4)),
    );

    chain.run("one", None).await.unwrap();
    chain.run("two", None).await.unwrap();

    let system = provider.request(0).system;
    assert_eq!(system, provider.request(1).system);
    assert!(system.starts_with("SYSTEM: Begin system instructions."));
    assert!(system.contains("\"invest\": \"yes/no/hold\""));
}
