//! End-to-end runs over small graphs with mock collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use genflow::{
    parse_flow, CollaboratorError, CollaboratorRegistry, FieldSpec, FieldType, FlowExecutor,
    FlowFormat, Graph, GraphError, LlmClient, LlmRequest, LlmResponse, LlmUsage, NodeState,
    RecordSchema, RunStatus, SchemaRegistry, ToolClient,
};

/// Replies with a fixed JSON value and small usage numbers.
struct FixedLlm {
    reply: Value,
}

#[async_trait]
impl LlmClient for FixedLlm {
    async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse, CollaboratorError> {
        Ok(LlmResponse {
            value: self.reply.clone(),
            usage: Some(LlmUsage {
                prompt_tokens: 5,
                completion_tokens: 5,
                total_tokens: 10,
            }),
        })
    }
}

const FETCH_SUMMARIZE_FLOW: &str = r#"
version: "0.1.0"
name: fetch-summarize
nodes:
  - name: fetch
    type: function
    function: fetch_text
    outputs: [text]
  - name: summarize
    type: prompt
    template: "Summarize: {{ text }}"
    inputs:
      text:
        from: [fetch, text]
    output_schema: summary
"#;

fn summary_schemas() -> SchemaRegistry {
    let mut schemas = SchemaRegistry::new();
    schemas
        .register(RecordSchema::new(
            "summary",
            vec![FieldSpec::required("summary", FieldType::String)],
        ))
        .unwrap();
    schemas
}

#[tokio::test]
async fn fetch_then_summarize_succeeds() {
    let flow = parse_flow(FETCH_SUMMARIZE_FLOW, FlowFormat::Yaml).unwrap();

    let mut collaborators = CollaboratorRegistry::new();
    collaborators.register_fn("fetch_text", |_| Ok(json!({ "text": "hello world" })));
    collaborators.register_llm(
        "default",
        Arc::new(FixedLlm {
            reply: json!({ "summary": "a short greeting" }),
        }),
    );
    let collaborators = Arc::new(collaborators);
    let schemas = Arc::new(summary_schemas());

    let graph = Graph::build(&flow, &collaborators, &schemas).unwrap();
    let executor = FlowExecutor::new(collaborators, schemas);
    let report = executor.run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.output("fetch", "text"), Some(&json!("hello world")));
    let summary = report
        .output("summarize", "summary")
        .and_then(|v| v.as_str())
        .unwrap();
    assert!(!summary.is_empty());
    assert_eq!(report.usage.total_tokens, 10);
}

#[tokio::test]
async fn failing_fetch_skips_summarize() {
    let flow = parse_flow(FETCH_SUMMARIZE_FLOW, FlowFormat::Yaml).unwrap();

    let mut collaborators = CollaboratorRegistry::new();
    collaborators.register_fn("fetch_text", |_| {
        Err(CollaboratorError::FunctionFailed(
            "file does not exist".into(),
        ))
    });
    collaborators.register_llm(
        "default",
        Arc::new(FixedLlm {
            reply: json!({ "summary": "never used" }),
        }),
    );
    let collaborators = Arc::new(collaborators);
    let schemas = Arc::new(summary_schemas());

    let graph = Graph::build(&flow, &collaborators, &schemas).unwrap();
    let executor = FlowExecutor::new(collaborators, schemas);
    let report = executor.run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.state("fetch"), Some(NodeState::Failed));
    assert!(report
        .record("fetch")
        .unwrap()
        .error
        .as_deref()
        .unwrap()
        .contains("file does not exist"));
    assert_eq!(report.state("summarize"), Some(NodeState::Skipped));
    assert!(report.output("summarize", "summary").is_none());
}

#[tokio::test]
async fn llm_reply_missing_required_field_fails_node() {
    let flow = parse_flow(FETCH_SUMMARIZE_FLOW, FlowFormat::Yaml).unwrap();

    let mut collaborators = CollaboratorRegistry::new();
    collaborators.register_fn("fetch_text", |_| Ok(json!({ "text": "hello world" })));
    collaborators.register_llm(
        "default",
        Arc::new(FixedLlm {
            reply: json!({}),
        }),
    );
    let collaborators = Arc::new(collaborators);
    let schemas = Arc::new(summary_schemas());

    let graph = Graph::build(&flow, &collaborators, &schemas).unwrap();
    let executor = FlowExecutor::new(collaborators, schemas);
    let report = executor.run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    let record = report.record("summarize").unwrap();
    assert_eq!(record.state, NodeState::Failed);
    // The mismatch names the absent field.
    let error = record.error.as_deref().unwrap();
    assert!(error.contains("summary"));
    assert!(error.contains("missing"));
    // Only one attempt: a schema mismatch is not transient.
    assert_eq!(record.attempts, 1);
}

#[tokio::test]
async fn independent_branch_survives_unrelated_failure() {
    let flow_text = r#"
version: "0.1.0"
name: two-branches
nodes:
  - name: works
    type: function
    function: works
    outputs: [value]
  - name: breaks
    type: function
    function: breaks
    outputs: [value]
"#;
    let flow = parse_flow(flow_text, FlowFormat::Yaml).unwrap();

    let mut collaborators = CollaboratorRegistry::new();
    collaborators.register_fn("works", |_| Ok(json!({ "value": 99 })));
    collaborators.register_fn("breaks", |_| {
        Err(CollaboratorError::FunctionFailed("boom".into()))
    });
    let collaborators = Arc::new(collaborators);
    let schemas = Arc::new(SchemaRegistry::new());

    let graph = Graph::build(&flow, &collaborators, &schemas).unwrap();
    let executor = FlowExecutor::new(collaborators, schemas);
    let report = executor.run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.state("breaks"), Some(NodeState::Failed));
    assert_eq!(report.state("works"), Some(NodeState::Succeeded));
    assert_eq!(report.output("works", "value"), Some(&json!(99)));
}

#[tokio::test]
async fn tool_node_feeds_prompt_node() {
    struct SearchTool;
    #[async_trait]
    impl ToolClient for SearchTool {
        async fn invoke(&self, arguments: Value) -> Result<Value, CollaboratorError> {
            let query = arguments
                .get("query")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            Ok(json!({ "results": [format!("result for {}", query)] }))
        }
    }

    let flow_text = r#"
version: "0.1.0"
name: search-then-digest
inputs: [query]
nodes:
  - name: search
    type: tool
    tool: web_search
    inputs:
      query:
        from: [inputs, query]
    outputs: [results]
  - name: digest
    type: prompt
    template: "Digest: {% for r in results %}{{ r }}{% endfor %}"
    inputs:
      results:
        from: [search, results]
    outputs: [text]
"#;
    let flow = parse_flow(flow_text, FlowFormat::Yaml).unwrap();

    let mut collaborators = CollaboratorRegistry::new();
    collaborators.register_tool("web_search", Arc::new(SearchTool));
    collaborators.register_llm(
        "default",
        Arc::new(FixedLlm {
            reply: json!("a digest of the results"),
        }),
    );
    let collaborators = Arc::new(collaborators);
    let schemas = Arc::new(SchemaRegistry::new());

    let graph = Graph::build(&flow, &collaborators, &schemas).unwrap();
    let executor = FlowExecutor::new(collaborators, schemas);

    let mut inputs = HashMap::new();
    inputs.insert("query".to_string(), json!("product launches"));
    let report = executor.run(&graph, inputs).await.unwrap();

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(
        report.output("search", "results"),
        Some(&json!(["result for product launches"]))
    );
    assert_eq!(
        report.output("digest", "text"),
        Some(&json!("a digest of the results"))
    );
}

#[tokio::test]
async fn unregistered_collaborator_fails_build() {
    let flow = parse_flow(FETCH_SUMMARIZE_FLOW, FlowFormat::Yaml).unwrap();

    // fetch_text is registered but the default LLM client is not.
    let mut collaborators = CollaboratorRegistry::new();
    collaborators.register_fn("fetch_text", |_| Ok(json!({ "text": "x" })));

    let err = Graph::build(&flow, &collaborators, &summary_schemas()).unwrap_err();
    assert!(matches!(
        err,
        GraphError::UnknownCollaborator {
            kind: "llm client",
            ..
        }
    ));
}

#[tokio::test]
async fn transient_llm_failure_retries_to_success() {
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyLlm {
        calls: AtomicU32,
    }
    #[async_trait]
    impl LlmClient for FlakyLlm {
        async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse, CollaboratorError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(CollaboratorError::RateLimited { retry_after: None });
            }
            Ok(LlmResponse {
                value: json!({ "summary": "second time lucky" }),
                usage: None,
            })
        }
    }

    let flow = parse_flow(FETCH_SUMMARIZE_FLOW, FlowFormat::Yaml).unwrap();

    let mut collaborators = CollaboratorRegistry::new();
    collaborators.register_fn("fetch_text", |_| Ok(json!({ "text": "hello world" })));
    collaborators.register_llm(
        "default",
        Arc::new(FlakyLlm {
            calls: AtomicU32::new(0),
        }),
    );
    let collaborators = Arc::new(collaborators);
    let schemas = Arc::new(summary_schemas());

    let graph = Graph::build(&flow, &collaborators, &schemas).unwrap();
    let executor = FlowExecutor::new(collaborators, schemas).with_config(genflow::ExecutorConfig {
        retry: genflow::RetryPolicy {
            max_attempts: 2,
            base_interval_ms: 1,
            backoff: genflow::Backoff::Fixed,
            max_interval_ms: 5,
            jitter: false,
        },
        ..genflow::ExecutorConfig::default()
    });

    let report = executor.run(&graph, HashMap::new()).await.unwrap();
    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.record("summarize").unwrap().attempts, 2);
    assert_eq!(
        report.output("summarize", "summary"),
        Some(&json!("second time lucky"))
    );
}

#[tokio::test]
async fn diamond_flow_joins_both_branches() {
    let flow_text = r#"
version: "0.1.0"
name: diamond
nodes:
  - name: seed
    type: function
    function: seed
    outputs: [value]
  - name: left
    type: function
    function: double
    inputs:
      value:
        from: [seed, value]
    outputs: [value]
  - name: right
    type: function
    function: triple
    inputs:
      value:
        from: [seed, value]
    outputs: [value]
  - name: join
    type: function
    function: add
    inputs:
      a:
        from: [left, value]
      b:
        from: [right, value]
    outputs: [total]
"#;
    let flow = parse_flow(flow_text, FlowFormat::Yaml).unwrap();

    let mut collaborators = CollaboratorRegistry::new();
    collaborators.register_fn("seed", |_| Ok(json!({ "value": 5 })));
    collaborators.register_fn("double", |inputs| {
        let v = inputs["value"].as_i64().unwrap_or(0);
        Ok(json!({ "value": v * 2 }))
    });
    collaborators.register_fn("triple", |inputs| {
        let v = inputs["value"].as_i64().unwrap_or(0);
        Ok(json!({ "value": v * 3 }))
    });
    collaborators.register_fn("add", |inputs| {
        let a = inputs["a"].as_i64().unwrap_or(0);
        let b = inputs["b"].as_i64().unwrap_or(0);
        Ok(json!({ "total": a + b }))
    });
    let collaborators = Arc::new(collaborators);
    let schemas = Arc::new(SchemaRegistry::new());

    let graph = Graph::build(&flow, &collaborators, &schemas).unwrap();
    let executor = FlowExecutor::new(collaborators, schemas);
    let report = executor.run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.output("join", "total"), Some(&json!(25)));
}
