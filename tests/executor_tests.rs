//! Tests for the streaming turn executor.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{test_agent_set, tool_call, MockTools, RecordingTransport, ScriptedCompletion, StreamStep};
use conclave::prelude::*;
use conclave::service::Notifier;

struct Harness {
    completion: Arc<ScriptedCompletion>,
    tools: Arc<MockTools>,
    transport: Arc<RecordingTransport>,
    executor: StreamingTurnExecutor,
    session: Arc<Session>,
}

fn harness_with(tools: MockTools, config: OrchestratorConfig) -> Harness {
    let completion = Arc::new(ScriptedCompletion::new());
    let tools = Arc::new(tools);
    let transport = Arc::new(RecordingTransport::new());
    let executor = StreamingTurnExecutor::new(
        completion.clone(),
        tools.clone(),
        Notifier::new(transport.clone()),
        config,
    );
    let session = Arc::new(Session::new(test_agent_set(), "planner").unwrap());
    Harness {
        completion,
        tools,
        transport,
        executor,
        session,
    }
}

fn harness() -> Harness {
    harness_with(MockTools::new(), OrchestratorConfig::default())
}

#[tokio::test]
async fn streams_deltas_and_commits_one_turn() {
    let h = harness();
    h.completion.queue_stream(vec![
        StreamStep::Event(CompletionEvent::ContentDelta { text: "Hel".into() }),
        StreamStep::Event(CompletionEvent::ContentDelta { text: "lo".into() }),
        StreamStep::Event(CompletionEvent::Finish {
            reason: FinishReason::Stop,
            signal: None,
        }),
    ]);

    let agent = h.session.agent("planner").unwrap();
    agent.log().append(Turn::user("hi"));

    let result = h
        .executor
        .run_turn(&h.session, &agent, agent.log().snapshot())
        .await
        .unwrap();

    assert_eq!(result.content, "Hello");
    assert_eq!(result.finish_reason, FinishReason::Stop);

    // Exactly one committed agent turn after the user turn.
    let log = agent.log().snapshot();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].role, Role::Agent);
    assert_eq!(log[1].content, "Hello");

    // Each delta was forwarded as its own chunk, plus exactly one final.
    assert_eq!(h.transport.streamed_text(), "Hello");
    assert_eq!(h.transport.final_chunks(), 1);

    // The request carried the agent's configuration.
    let requests = h.completion.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "test:multi");
    assert_eq!(requests[0].system_prompt.as_deref(), Some("You plan."));
    assert_eq!(requests[0].turns.len(), 1);
}

#[tokio::test]
async fn rejects_empty_snapshot() {
    let h = harness();
    let agent = h.session.agent("planner").unwrap();
    let err = h
        .executor
        .run_turn(&h.session, &agent, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConclaveError::InvalidState(_)));
    assert_eq!(h.completion.calls(), 0);
}

#[tokio::test]
async fn executes_tool_calls_in_request_order() {
    let h = harness_with(
        MockTools::new()
            .with_result("read_file", serde_json::json!({ "content": "data" }))
            .with_result("list_dir", serde_json::json!(["a", "b"])),
        OrchestratorConfig::default(),
    );
    h.completion.queue_stream(vec![
        StreamStep::Event(CompletionEvent::ToolCallRequested {
            call: tool_call("c1", "read_file"),
        }),
        StreamStep::Event(CompletionEvent::ToolCallRequested {
            call: tool_call("c2", "list_dir"),
        }),
        StreamStep::Event(CompletionEvent::Finish {
            reason: FinishReason::Stop,
            signal: None,
        }),
    ]);

    let agent = h.session.agent("planner").unwrap();
    agent.log().append(Turn::user("look around"));

    let result = h
        .executor
        .run_turn(&h.session, &agent, agent.log().snapshot())
        .await
        .unwrap();

    assert_eq!(result.tool_calls.len(), 2);
    assert_eq!(result.tool_results.len(), 2);
    assert_eq!(result.tool_results[0].tool_call_id, "c1");
    assert_eq!(result.tool_results[1].tool_call_id, "c2");
    assert!(!result.tool_results[0].is_error);

    let invocations = h.tools.invocations();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0].call.name, "read_file");
    assert_eq!(invocations[0].agent_id, "planner");
    assert_eq!(invocations[0].session_id, h.session.id());

    // Tool dispatch notifications were emitted.
    let dispatched: Vec<_> = h
        .transport
        .payloads()
        .into_iter()
        .filter(|p| matches!(p, NotificationPayload::TurnToolCall { .. }))
        .collect();
    assert_eq!(dispatched.len(), 2);
}

#[tokio::test]
async fn tool_failure_is_folded_into_the_turn() {
    let h = harness_with(
        MockTools::new().with_failure("deploy", "permission denied"),
        OrchestratorConfig::default(),
    );
    h.completion.queue_stream(vec![
        StreamStep::Event(CompletionEvent::ToolCallRequested {
            call: tool_call("c1", "deploy"),
        }),
        StreamStep::Event(CompletionEvent::Finish {
            reason: FinishReason::ToolCall,
            signal: None,
        }),
    ]);

    let agent = h.session.agent("planner").unwrap();
    agent.log().append(Turn::user("ship it"));

    // The failure does not abort the turn.
    let result = h
        .executor
        .run_turn(&h.session, &agent, agent.log().snapshot())
        .await
        .unwrap();

    assert_eq!(result.tool_results.len(), 1);
    assert!(result.tool_results[0].is_error);
    let error_text = result.tool_results[0].result["error"].as_str().unwrap();
    assert!(error_text.contains("permission denied"));

    // The turn (calls and error result included) was committed.
    assert_eq!(agent.log().len(), 2);
}

#[tokio::test]
async fn model_error_mid_stream_commits_nothing() {
    let h = harness();
    h.completion.queue_stream(vec![
        StreamStep::Event(CompletionEvent::ContentDelta {
            text: "partial ".into(),
        }),
        StreamStep::Error(ModelServiceErrorKind::Network, "connection reset".into()),
    ]);

    let agent = h.session.agent("planner").unwrap();
    agent.log().append(Turn::user("hi"));

    let err = h
        .executor
        .run_turn(&h.session, &agent, agent.log().snapshot())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConclaveError::ModelService {
            kind: ModelServiceErrorKind::Network,
            ..
        }
    ));

    // Partial content was streamed, but no turn was committed and no final
    // chunk was sent.
    assert_eq!(agent.log().len(), 1);
    assert_eq!(h.transport.streamed_text(), "partial ");
    assert_eq!(h.transport.final_chunks(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_expiry_commits_a_timeout_turn() {
    let h = harness_with(
        MockTools::new(),
        OrchestratorConfig {
            turn_timeout: Duration::from_secs(5),
            ..OrchestratorConfig::default()
        },
    );
    h.completion.queue_stream(vec![
        StreamStep::Event(CompletionEvent::ContentDelta {
            text: "thinking".into(),
        }),
        StreamStep::Stall,
    ]);

    let agent = h.session.agent("planner").unwrap();
    agent.log().append(Turn::user("hi"));

    let result = h
        .executor
        .run_turn(&h.session, &agent, agent.log().snapshot())
        .await
        .unwrap();

    assert_eq!(result.finish_reason, FinishReason::Timeout);
    assert_eq!(result.content, "thinking");

    let log = agent.log().snapshot();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].finish_reason, Some(FinishReason::Timeout));
    assert_eq!(h.transport.final_chunks(), 1);
}

#[tokio::test(start_paused = true)]
async fn per_agent_timeout_overrides_default() {
    // scribe declares no timeout override, planner neither; give planner
    // one through a dedicated set.
    let set = AgentSetConfig::default().with_agent(
        "sprinter",
        AgentDefinition {
            model: "test:fast".into(),
            system_prompt: None,
            capabilities: ModelCapabilities {
                timeout_secs: Some(1),
                ..ModelCapabilities::default()
            },
        },
    );
    let completion = Arc::new(ScriptedCompletion::new());
    let transport = Arc::new(RecordingTransport::new());
    let executor = StreamingTurnExecutor::new(
        completion.clone(),
        Arc::new(MockTools::new()),
        Notifier::new(transport.clone()),
        OrchestratorConfig {
            turn_timeout: Duration::from_secs(3600),
            ..OrchestratorConfig::default()
        },
    );
    let session = Arc::new(Session::new(set, "sprinter").unwrap());

    completion.queue_stream(vec![StreamStep::Stall]);
    let agent = session.agent("sprinter").unwrap();
    agent.log().append(Turn::user("hurry"));

    // Elapses at the 1s agent override, not the 1h default.
    let result = executor
        .run_turn(&session, &agent, agent.log().snapshot())
        .await
        .unwrap();
    assert_eq!(result.finish_reason, FinishReason::Timeout);
}

#[tokio::test]
async fn session_teardown_cancels_the_run() {
    let h = harness();
    h.completion.queue_stream(vec![StreamStep::Stall]);

    let agent = h.session.agent("planner").unwrap();
    agent.log().append(Turn::user("hi"));

    h.session.close();
    let err = h
        .executor
        .run_turn(&h.session, &agent, agent.log().snapshot())
        .await
        .unwrap_err();
    assert!(matches!(err, ConclaveError::Canceled));
    assert_eq!(agent.log().len(), 1);
}
