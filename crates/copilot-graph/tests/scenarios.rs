//! End-to-end runs with a scripted model and in-memory market data

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use copilot_core::Error;
use copilot_graph::{
    ChatService, ConversationState, NodeName, Orchestrator, OrchestratorConfig, StreamEvent,
};
use copilot_llm::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Role, ToolCall,
};
use copilot_market::indicators::sma_values;
use copilot_market::{
    FETCH_MARKET_DATA, FetchMarketDataTool, MarketConfig, MarketDataSource, MarketError,
    OhlcvPoint, SeriesRequest,
};
use copilot_tools::ToolRegistry;
use futures::StreamExt;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Provider replaying a fixed list of assistant messages
struct ScriptedProvider {
    replies: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> copilot_llm::Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .map(CompletionResponse::from_message)
            .ok_or_else(|| LLMError::ProviderError("script exhausted".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Market source serving a fixed series, or failing like a dropped connection
struct InMemorySource {
    series: Option<Vec<OhlcvPoint>>,
    requests: Mutex<Vec<SeriesRequest>>,
}

impl InMemorySource {
    fn new(series: Option<Vec<OhlcvPoint>>) -> Arc<Self> {
        Arc::new(Self {
            series,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MarketDataSource for InMemorySource {
    async fn fetch_series(&self, request: &SeriesRequest) -> copilot_market::Result<Vec<OhlcvPoint>> {
        self.requests.lock().unwrap().push(request.clone());
        self.series
            .clone()
            .ok_or_else(|| MarketError::YahooFinanceError("network unreachable".to_string()))
    }
}

fn week_of_bars() -> Vec<OhlcvPoint> {
    let start = (Utc::now() - Duration::days(7)).timestamp();
    [64_200.0, 64_950.0, 63_800.0, 65_400.0, 66_100.0, 65_700.0, 67_050.0]
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            OhlcvPoint::new(close - 300.0, close + 500.0, close - 700.0, close, 2.5e10, start + 86_400 * i as i64)
                .unwrap()
        })
        .collect()
}

fn orchestrator(provider: Arc<ScriptedProvider>, series: Option<Vec<OhlcvPoint>>) -> Orchestrator {
    orchestrator_over(provider, InMemorySource::new(series))
}

fn orchestrator_over(provider: Arc<ScriptedProvider>, source: Arc<InMemorySource>) -> Orchestrator {
    let tool = FetchMarketDataTool::new(source, Arc::new(MarketConfig::default()));
    let registry = ToolRegistry::builder().register(Arc::new(tool)).build().unwrap();
    Orchestrator::new(provider, Arc::new(registry), OrchestratorConfig::default()).unwrap()
}

fn week_ago() -> NaiveDate {
    (Utc::now() - Duration::days(7)).date_naive()
}

fn fetch_btc_week() -> Message {
    let start = week_ago().format("%Y-%m-%d").to_string();
    Message::assistant_with_tool_calls(
        None,
        vec![ToolCall::new(
            "call_btc",
            FETCH_MARKET_DATA,
            json!({"symbol": "BTC", "timeStart": start}),
        )],
    )
}

fn visited(snapshots: &[copilot_graph::Snapshot]) -> Vec<NodeName> {
    snapshots.iter().map(|s| s.node).collect()
}

#[tokio::test]
async fn scenario_trend_question_runs_analysis() {
    let provider = ScriptedProvider::new(vec![fetch_btc_week()]);
    let source = InMemorySource::new(Some(week_of_bars()));
    let orchestrator = orchestrator_over(provider.clone(), source.clone());

    let snapshots: Vec<_> = orchestrator
        .stream(ConversationState::from_human("What's the trend for BTC over the last week?"))
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(
        visited(&snapshots),
        vec![
            NodeName::Reception,
            NodeName::ToolExecution,
            NodeName::Analysis,
            NodeName::Terminal
        ]
    );
    assert_eq!(provider.request_count(), 1);

    // the model's tool arguments reached the source
    let fetched = source.requests.lock().unwrap().clone();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].symbol, "BTC");
    assert_eq!(fetched[0].start, week_ago().and_time(NaiveTime::MIN).and_utc());
    assert!(fetched[0].end > fetched[0].start);

    let analysis = &snapshots[2];
    assert_eq!(analysis.state.market_series().len(), 7);
    let chunk = analysis.chunk.as_deref().unwrap();
    assert!(chunk.contains("Recommendation:"));

    let last = snapshots.last().unwrap();
    let answer = last.state.last_message().and_then(Message::text).unwrap();
    assert_eq!(answer, chunk);
    assert!(!answer.contains("FINAL ANSWER"));
}

#[tokio::test]
async fn scenario_off_topic_question_is_declined() {
    let provider = ScriptedProvider::new(vec![Message::assistant(
        "FINAL ANSWER: I'm sorry, I can only help with trading questions.",
    )]);
    let outcome = orchestrator(provider, None)
        .run(ConversationState::from_human("What's your favorite color?"))
        .await
        .unwrap();

    assert_eq!(outcome.answer, "I'm sorry, I can only help with trading questions.");
    assert_eq!(outcome.visits, 2);
    assert!(outcome.state.market_series().is_empty());
}

#[test]
fn scenario_sma_of_five_closes() {
    let sma = sma_values(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
    assert_eq!(sma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
}

#[tokio::test]
async fn scenario_failed_fetch_returns_to_reception() {
    let provider = ScriptedProvider::new(vec![
        fetch_btc_week(),
        Message::assistant("FINAL ANSWER: I couldn't retrieve BTC prices right now."),
    ]);
    let snapshots: Vec<_> = orchestrator(provider.clone(), None)
        .stream(ConversationState::from_human("What's the trend for BTC over the last week?"))
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(
        visited(&snapshots),
        vec![
            NodeName::Reception,
            NodeName::ToolExecution,
            NodeName::Reception,
            NodeName::Terminal
        ]
    );

    let tool_result = snapshots[1].state.last_message().unwrap();
    assert_eq!(tool_result.role(), Role::Tool);
    assert!(tool_result.is_error());
    let payload: Value = serde_json::from_str(tool_result.text().unwrap()).unwrap();
    assert_eq!(payload["error"], "Failed to fetch market data");
    assert!(payload["message"].as_str().unwrap().contains("network unreachable"));

    // the model saw the error payload on its second turn
    let requests = provider.requests.lock().unwrap();
    let second = &requests[1];
    assert!(second.messages.last().is_some_and(Message::is_error));
    assert!(snapshots.iter().all(|s| s.state.market_series().is_empty()));
}

#[tokio::test]
async fn sender_tracks_the_node_that_ran() {
    let provider = ScriptedProvider::new(vec![fetch_btc_week()]);
    let snapshots: Vec<_> = orchestrator(provider, Some(week_of_bars()))
        .stream(ConversationState::from_human("BTC this week?"))
        .map(Result::unwrap)
        .collect()
        .await;

    let mut previous_len = 1;
    for snapshot in &snapshots {
        assert!(snapshot.state.sender().is(snapshot.node));
        assert!(snapshot.state.messages().len() > previous_len);
        previous_len = snapshot.state.messages().len();
    }
}

#[tokio::test]
async fn provider_failure_aborts_the_run() {
    let provider = ScriptedProvider::new(Vec::new());
    let err = orchestrator(provider, None)
        .run(ConversationState::from_human("BTC?"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Capability(_)));
}

#[tokio::test]
async fn endless_clarification_hits_the_ceiling() {
    let replies = (0..20)
        .map(|_| Message::assistant("What time period do you want me to consider?"))
        .collect();
    let provider = ScriptedProvider::new(replies);
    let err = orchestrator(provider, None)
        .run(ConversationState::from_human("BTC?"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "runaway_conversation");
}

#[tokio::test]
async fn chat_stream_emits_content_then_done() {
    let provider = ScriptedProvider::new(vec![fetch_btc_week()]);
    let service = ChatService::new(orchestrator(provider, Some(week_of_bars())));

    let events: Vec<_> = service
        .chat_stream("What's the trend for BTC over the last week?")
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], StreamEvent::Content { content } if content.contains("Recommendation:")));
    assert_eq!(events[1], StreamEvent::done());
}

#[tokio::test]
async fn chat_stream_reports_errors() {
    let service = ChatService::new(orchestrator(ScriptedProvider::new(Vec::new()), None));

    let events: Vec<_> = service.chat_stream("BTC?").collect().await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error { .. }));

    let events: Vec<_> = service.chat_stream("  ").collect().await;
    assert!(matches!(&events[..], [StreamEvent::Error { .. }]));
}

#[tokio::test]
async fn history_is_resubmitted_by_the_caller() {
    let provider = ScriptedProvider::new(vec![Message::assistant("FINAL ANSWER: Noted.")]);
    let outcome = orchestrator(provider.clone(), None)
        .run_with_history(
            vec![
                Message::human("Is ETH a buy?"),
                Message::assistant("What time period do you want me to consider?"),
            ],
            "The last month",
        )
        .await
        .unwrap();

    assert_eq!(outcome.answer, "Noted.");
    assert_eq!(provider.requests.lock().unwrap()[0].messages.len(), 3);
}
