use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use repograph_core::agent::{AgentError, AgentOrchestrator, TOOL_NAME};
use repograph_core::config::DEFAULT_AGENT_SYSTEM_PROMPT;
use repograph_core::gateway::{GatewayError, QueryExecutor};
use repograph_core::graph::Record;
use repograph_core::llm::{LlmError, Message, ModelTurn, ToolCall, ToolDeclaration, ToolModel};

/// Model fake that replays scripted turns and records each conversation
/// state it was shown.
struct FakeModel {
    turns: Mutex<VecDeque<ModelTurn>>,
    histories: Mutex<Vec<Vec<Message>>>,
}

impl FakeModel {
    fn with_turns(turns: Vec<ModelTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            histories: Mutex::new(Vec::new()),
        }
    }

    fn calls_made(&self) -> usize {
        self.histories.lock().unwrap().len()
    }

    fn history_at(&self, index: usize) -> Vec<Message> {
        self.histories.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ToolModel for FakeModel {
    async fn generate(
        &self,
        system: &str,
        tools: &[ToolDeclaration],
        history: &[Message],
    ) -> Result<ModelTurn, LlmError> {
        assert_eq!(system, DEFAULT_AGENT_SYSTEM_PROMPT);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, TOOL_NAME);

        self.histories.lock().unwrap().push(history.to_vec());
        Ok(self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ModelTurn {
                text: Some("done".to_string()),
                tool_calls: Vec::new(),
            }))
    }
}

/// Gateway fake that records queries and replays scripted outcomes.
#[derive(Default)]
struct FakeGateway {
    queries: Mutex<Vec<String>>,
    outcomes: Mutex<VecDeque<Result<Vec<Record>, GatewayError>>>,
}

impl FakeGateway {
    fn with_outcomes(outcomes: Vec<Result<Vec<Record>, GatewayError>>) -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            outcomes: Mutex::new(outcomes.into()),
        }
    }

    fn seen(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for FakeGateway {
    async fn execute(
        &self,
        query: &str,
        _params: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Vec<Record>, GatewayError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn text_turn(text: &str) -> ModelTurn {
    ModelTurn {
        text: Some(text.to_string()),
        tool_calls: Vec::new(),
    }
}

fn query_turn(query: &str) -> ModelTurn {
    ModelTurn {
        text: None,
        tool_calls: vec![ToolCall {
            name: TOOL_NAME.to_string(),
            args: json!({ "query": query }),
        }],
    }
}

fn orchestrator(
    model: Arc<FakeModel>,
    gateway: Arc<FakeGateway>,
    max_rounds: usize,
) -> AgentOrchestrator {
    AgentOrchestrator::new(model, gateway, DEFAULT_AGENT_SYSTEM_PROMPT, max_rounds)
}

mod loop_behavior {
    use super::*;

    #[tokio::test]
    async fn test_final_answer_without_tool_calls() {
        let model = Arc::new(FakeModel::with_turns(vec![text_turn("Three modules.")]));
        let gateway = Arc::new(FakeGateway::default());

        let answer = orchestrator(model.clone(), gateway.clone(), 8)
            .answer("how many modules?")
            .await
            .unwrap();

        assert_eq!(answer, "Three modules.");
        assert_eq!(model.calls_made(), 1);
        assert!(gateway.seen().is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let query = "MATCH (d:Developer)-[:WROTE]->(m:Module) \
                     WHERE m.file_path ENDS WITH 'auth.py' RETURN d.name, d.email";
        let model = Arc::new(FakeModel::with_turns(vec![
            query_turn(query),
            text_turn("auth.py was written by Alice."),
        ]));

        let mut row = Record::new();
        row.insert("d.name".to_string(), json!("Alice"));
        row.insert("d.email".to_string(), json!("alice@example.com"));
        let gateway = Arc::new(FakeGateway::with_outcomes(vec![Ok(vec![row])]));

        let answer = orchestrator(model.clone(), gateway.clone(), 8)
            .answer("who wrote auth.py?")
            .await
            .unwrap();

        assert_eq!(answer, "auth.py was written by Alice.");
        assert_eq!(gateway.seen(), vec![query.to_string()]);

        // The second model turn saw the tool result with the rows
        let history = model.history_at(1);
        let Message::ToolResult { name, content } = history.last().unwrap() else {
            panic!("expected a tool result at the end of the conversation");
        };
        assert_eq!(name, TOOL_NAME);
        assert_eq!(content["results"][0]["d.name"], json!("Alice"));
    }

    #[tokio::test]
    async fn test_file_name_property_is_rewritten() {
        let model = Arc::new(FakeModel::with_turns(vec![
            query_turn("MATCH (m:Module) WHERE m.file_name ENDS WITH 'auth.py' RETURN m"),
            text_turn("found it"),
        ]));
        let gateway = Arc::new(FakeGateway::default());

        orchestrator(model, gateway.clone(), 8)
            .answer("which module is auth.py?")
            .await
            .unwrap();

        assert_eq!(
            gateway.seen(),
            vec!["MATCH (m:Module) WHERE m.file_path ENDS WITH 'auth.py' RETURN m".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_yields_error_result_without_execution() {
        let model = Arc::new(FakeModel::with_turns(vec![
            ModelTurn {
                text: None,
                tool_calls: vec![ToolCall {
                    name: "delete_everything".to_string(),
                    args: json!({}),
                }],
            },
            text_turn("sorry"),
        ]));
        let gateway = Arc::new(FakeGateway::default());

        orchestrator(model.clone(), gateway.clone(), 8)
            .answer("?")
            .await
            .unwrap();

        assert!(gateway.seen().is_empty());
        let history = model.history_at(1);
        let Message::ToolResult { content, .. } = history.last().unwrap() else {
            panic!("expected a tool result");
        };
        assert!(content["error"]
            .as_str()
            .unwrap()
            .contains("Unknown tool"));
    }
}

mod failure_handling {
    use super::*;

    #[tokio::test]
    async fn test_validation_failure_is_fed_back_and_recoverable() {
        let model = Arc::new(FakeModel::with_turns(vec![
            query_turn("MERGE (n) RETURN n"),
            query_turn("MATCH (n) RETURN count(n)"),
            text_turn("There is one node."),
        ]));
        let gateway = Arc::new(FakeGateway::with_outcomes(vec![
            Err(GatewayError::Validation(
                "Write operations are not allowed in read-only mode.".to_string(),
            )),
            Ok(Vec::new()),
        ]));

        let answer = orchestrator(model.clone(), gateway.clone(), 8)
            .answer("how many nodes?")
            .await
            .unwrap();

        // The refusal did not abort the question
        assert_eq!(answer, "There is one node.");
        assert_eq!(gateway.seen().len(), 2);

        let history = model.history_at(1);
        let Message::ToolResult { content, .. } = history.last().unwrap() else {
            panic!("expected a tool result");
        };
        assert!(content["error"]
            .as_str()
            .unwrap()
            .contains("read-only"));
    }

    #[tokio::test]
    async fn test_round_limit_bounds_the_loop() {
        // Model keeps asking for queries forever
        let turns: Vec<ModelTurn> = (0..10)
            .map(|_| query_turn("MATCH (n) RETURN n"))
            .collect();
        let model = Arc::new(FakeModel::with_turns(turns));
        let gateway = Arc::new(FakeGateway::default());

        let result = orchestrator(model.clone(), gateway, 3).answer("loop?").await;

        assert!(matches!(result, Err(AgentError::RoundLimit(3))));
        assert_eq!(model.calls_made(), 3);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_before_the_next_round() {
        let model = Arc::new(FakeModel::with_turns(vec![text_turn("never seen")]));
        let gateway = Arc::new(FakeGateway::default());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = orchestrator(model.clone(), gateway, 8)
            .answer_with_cancellation("?", &cancel)
            .await;

        assert!(matches!(result, Err(AgentError::Cancelled)));
        assert_eq!(model.calls_made(), 0);
    }

    #[tokio::test]
    async fn test_model_error_is_fatal_to_the_question() {
        struct BrokenModel;

        #[async_trait]
        impl ToolModel for BrokenModel {
            async fn generate(
                &self,
                _system: &str,
                _tools: &[ToolDeclaration],
                _history: &[Message],
            ) -> Result<ModelTurn, LlmError> {
                Err(LlmError::MissingApiKey)
            }
        }

        let gateway = Arc::new(FakeGateway::default());
        let agent = AgentOrchestrator::new(
            Arc::new(BrokenModel),
            gateway,
            DEFAULT_AGENT_SYSTEM_PROMPT,
            8,
        );

        let result = agent.answer("?").await;
        assert!(matches!(result, Err(AgentError::Model(_))));
    }
}
