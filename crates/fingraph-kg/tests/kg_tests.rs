//! Tests for fingraph-kg: pruning, validation, store, and the full pipeline
//! driven by a scripted mock provider

use fingraph_core::*;
use fingraph_kg::*;
use fingraph_llm::{LlmProvider, MockBehavior, MockProvider};
use std::sync::Arc;

const COMPANY_X_TEXT: &str = "Company X reported revenue of 100 million in FY24.";

const COMPANY_X_GRAPH: &str = r#"{
  "entities": {"E1": {"name": "Company X", "type": "COMPANY", "properties": {}}},
  "measurements": {"M1": {"metric": "REVENUE", "value": 100, "unit": "million", "period": "FY24"}},
  "facts": [{"subject": "E1", "predicate": "HAS_MEASUREMENT", "object": "M1"}]
}"#;

const COMPANY_X_TRIPLETS: &str = "(Company X, REPORTED_REVENUE, 100 million in FY24)";

fn graph_from(json: &str) -> KnowledgeGraph {
    serde_json::from_str(json).unwrap()
}

fn pipeline_with(mock: Arc<MockProvider>, config: &FingraphConfig) -> KnowledgePipeline {
    let provider: Arc<dyn LlmProvider> = mock;
    let store = GraphStore::new(MemoryCache::new(), config.conversation.max_turns);
    KnowledgePipeline::new(config, Some(provider), Arc::new(store))
}

/// Answers from the last user turn the way a grounded model would.
fn company_x_answerer() -> MockBehavior {
    MockBehavior::handler(|req| {
        let question = req.messages.last().map(|m| m.content.to_lowercase()).unwrap_or_default();
        if question.contains("revenue") {
            Ok("Company X reported revenue of 100 million in FY24.".to_string())
        } else {
            Ok(NOT_FOUND_ANSWER.to_string())
        }
    })
}

fn company_x_mock() -> Arc<MockProvider> {
    Arc::new(MockProvider::sequence(vec![
        MockBehavior::text(COMPANY_X_GRAPH),
        MockBehavior::text(COMPANY_X_TRIPLETS),
        company_x_answerer(),
        company_x_answerer(),
        company_x_answerer(),
    ]))
}

// ===========================================================================
// Pruning
// ===========================================================================

#[test]
fn prune_removes_unreferenced_nodes() {
    let g = graph_from(
        r#"{
          "entities": {
            "E1": {"name": "Jio-bp", "type": "COMPANY"},
            "E2": {"name": "Mobility Station Network", "type": "ASSET_NETWORK"},
            "E3": {"name": "India", "type": "GEOGRAPHY"}
          },
          "measurements": {
            "M1": {"metric": "COUNT", "value": 1916, "unit": "stations"},
            "M2": {"metric": "DEMAND", "value": 185, "unit": "MMT", "period": "CY24"}
          },
          "facts": [
            {"subject": "E1", "predicate": "OWNS", "object": "E2"},
            {"subject": "E2", "predicate": "HAS_MEASUREMENT", "object": "M1"}
          ]
        }"#,
    );
    let pruned = prune_isolated_nodes(g);
    let entities: Vec<&str> = pruned.graph.entities.keys().map(NodeId::as_str).collect();
    let measurements: Vec<&str> = pruned.graph.measurements.keys().map(NodeId::as_str).collect();
    assert_eq!(entities, vec!["E1", "E2"]);
    assert_eq!(measurements, vec!["M1"]);
    assert_eq!(pruned.removed_entities, vec![NodeId::entity(3)]);
    assert_eq!(pruned.removed_measurements, vec![NodeId::measurement(2)]);
    assert_eq!(pruned.graph.facts.len(), 2);
}

#[test]
fn prune_with_no_facts_empties_both_maps() {
    let g = graph_from(
        r#"{
          "entities": {"E1": {"name": "Company X", "type": "COMPANY"}},
          "measurements": {"M1": {"metric": "REVENUE", "value": 100, "unit": "million"}},
          "facts": []
        }"#,
    );
    let pruned = prune_isolated_nodes(g);
    assert!(pruned.graph.entities.is_empty());
    assert!(pruned.graph.measurements.is_empty());
    assert_eq!(pruned.removed_count(), 2);
}

#[test]
fn prune_is_idempotent() {
    let once = prune_isolated_nodes(graph_from(COMPANY_X_GRAPH)).graph;
    let twice = prune_isolated_nodes(once.clone()).graph;
    assert_eq!(once, twice);
}

#[test]
fn pruned_nodes_are_all_reachable() {
    let g = graph_from(
        r#"{
          "entities": {
            "E1": {"name": "A", "type": "COMPANY"},
            "E2": {"name": "B", "type": "COMPANY"},
            "E3": {"name": "C", "type": "COMPANY"}
          },
          "measurements": {
            "M1": {"metric": "REVENUE", "value": 1, "unit": "USD"},
            "M2": {"metric": "PROFIT", "value": 2, "unit": "USD"}
          },
          "facts": [
            {"subject": "E1", "predicate": "ACQUIRED", "object": "E3"},
            {"subject": "E3", "predicate": "REPORTED_PROFIT", "object": "M2"}
          ]
        }"#,
    );
    let pruned = prune_isolated_nodes(g);
    let referenced = pruned.graph.referenced_ids();
    for id in pruned.graph.entities.keys().chain(pruned.graph.measurements.keys()) {
        assert!(referenced.contains(id), "{id} is unreachable");
    }
}

#[test]
fn prune_reports_dangling_without_fabricating() {
    let g = graph_from(
        r#"{
          "entities": {"E1": {"name": "Company X", "type": "COMPANY"}},
          "measurements": {},
          "facts": [
            {"subject": "E1", "predicate": "REPORTED_REVENUE", "object": "M7"},
            {"subject": "E1", "predicate": "OWNS", "object": "E9"}
          ]
        }"#,
    );
    let pruned = prune_isolated_nodes(g);
    assert_eq!(pruned.dangling, vec![NodeId::entity(9), NodeId::measurement(7)]);
    assert!(!pruned.graph.contains(&NodeId::measurement(7)));
    assert!(!pruned.graph.contains(&NodeId::entity(9)));
    assert_eq!(pruned.graph.entities.len(), 1);
    assert_eq!(pruned.graph.facts.len(), 2);
}

// ===========================================================================
// Graph parsing and validation
// ===========================================================================

#[test]
fn parse_tolerates_surrounding_whitespace() {
    let parsed = parse_graph(&format!("\n  {COMPANY_X_GRAPH}\n")).unwrap();
    assert!(parsed.unexpected_keys.is_empty());
    assert!(validate_graph(&parsed).is_clean());
}

#[test]
fn parse_rejects_prose_and_fences() {
    for text in [
        "Here is the graph you asked for.",
        "```json\n{\"entities\": {}, \"measurements\": {}, \"facts\": []}\n```",
        "[1, 2, 3]",
    ] {
        let err = parse_graph(text).unwrap_err();
        assert_eq!(err.kind(), "model_output_invalid", "{text}");
        assert_eq!(err.stage(), Some(Stage::Extraction));
    }
}

#[test]
fn parse_rejects_missing_keys() {
    let err = parse_graph(r#"{"entities": {}, "facts": []}"#).unwrap_err();
    assert!(err.to_string().contains("measurements"), "{err}");
}

#[test]
fn validate_collects_findings() {
    let parsed = parse_graph(
        r#"{
          "entities": {
            "E1": {"name": "Company X", "type": "CORPORATION"},
            "E2": {"name": "185", "type": "MARKET"},
            "X3": {"name": "Y", "type": "COMPANY"}
          },
          "measurements": {"M1": {"metric": "VIBES", "value": 1, "unit": "u"}},
          "facts": [
            {"subject": "E1", "predicate": "is_owner_of", "object": "E2"},
            {"subject": "E1", "predicate": "OWNS", "object": "E5"}
          ],
          "notes": "extra"
        }"#,
    )
    .unwrap();
    let report = validate_graph(&parsed);
    let f = &report.findings;
    assert!(f.contains(&Finding::UnexpectedTopLevelKey("notes".into())));
    assert!(f.contains(&Finding::UnknownEntityType {
        id: NodeId::entity(1),
        entity_type: "CORPORATION".into()
    }));
    assert!(f.contains(&Finding::NumericEntityName {
        id: NodeId::entity(2),
        name: "185".into()
    }));
    assert!(f.contains(&Finding::MalformedEntityId(NodeId::new("X3"))));
    assert!(f.contains(&Finding::UnknownMetric {
        id: NodeId::measurement(1),
        metric: "VIBES".into()
    }));
    assert!(f.contains(&Finding::UnknownPredicate {
        fact: 0,
        predicate: "is_owner_of".into()
    }));
    assert_eq!(report.dangling().collect::<Vec<_>>(), vec![&NodeId::entity(5)]);
}

#[test]
fn schema_drift_in_measurements_is_a_finding() {
    let parsed = parse_graph(
        r#"{
          "entities": {"E1": {"name": "Company X", "type": "COMPANY"}},
          "measurements": {"M1": {"metric": "REVENUE", "value": "100 million", "period": "FY24"}},
          "facts": [{"subject": "E1", "predicate": "REPORTED_REVENUE", "object": "M1"}]
        }"#,
    )
    .unwrap();
    let m1 = &parsed.graph.measurements[&NodeId::measurement(1)];
    assert_eq!(m1.value, MeasurementValue::Text("100 million".into()));
    assert_eq!(m1.unit, "");
    assert_eq!(m1.literal(), "100 million in FY24");

    let report = validate_graph(&parsed);
    assert_eq!(
        report.findings,
        vec![
            Finding::NonNumericValue {
                id: NodeId::measurement(1),
                value: "100 million".into()
            },
            Finding::MissingUnit(NodeId::measurement(1)),
        ]
    );
}

// ===========================================================================
// Resolved triplets
// ===========================================================================

#[test]
fn clean_triplets_have_no_findings() {
    let text = "(Company X, REPORTED_REVENUE, 100 million in FY24)\n(Jio-bp, OWNS, Mobility Station Network)\n";
    assert!(check_triplets(text).is_empty());
    let parsed = parse_triplets(text);
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].to_string(), COMPANY_X_TRIPLETS);
}

#[test]
fn empty_resolver_output_is_clean() {
    for text in ["", "\n", "  \r\n"] {
        assert!(check_triplets(text).is_empty(), "{text:?}");
        assert!(parse_triplets(text).is_empty());
    }
}

#[test]
fn triplet_checks_flag_contract_breaks() {
    let text = "(Company X, HAS_MEASUREMENT, 100 million)\n\n(E1, OWNS, Mobility Station Network)\nCompany X owns things.\n(A, INVENTED_LINK, B)";
    let findings = check_triplets(text);
    assert!(findings.contains(&TripletFinding::GenericPredicate {
        line: 1,
        predicate: "HAS_MEASUREMENT".into()
    }));
    assert!(findings.contains(&TripletFinding::BlankLine { line: 2 }));
    assert!(findings.contains(&TripletFinding::RawIdentifier {
        line: 3,
        id: "E1".into()
    }));
    assert!(matches!(findings[3], TripletFinding::Malformed { line: 4, .. }));
    assert!(findings.contains(&TripletFinding::UnregisteredPredicate {
        line: 5,
        predicate: "INVENTED_LINK".into()
    }));
}

// ===========================================================================
// Visualization
// ===========================================================================

#[test]
fn visual_graph_matches_pruned_graph() {
    let visual = build_visual_graph(&graph_from(COMPANY_X_GRAPH));
    assert_eq!(visual.nodes.len(), 2);
    assert_eq!(visual.edges.len(), 1);

    let e1 = visual.node(&NodeId::entity(1)).unwrap();
    assert_eq!(e1.label, "Company X");
    assert_eq!(e1.group, "COMPANY");
    assert_eq!(e1.shape, "dot");

    let m1 = visual.node(&NodeId::measurement(1)).unwrap();
    assert_eq!(m1.label, "REVENUE: 100 million");
    assert_eq!(m1.node_type, VisualNodeType::Measurement);
    assert_eq!(m1.properties["period"], "FY24");

    let json = serde_json::to_value(&visual).unwrap();
    assert_eq!(json["edges"][0]["from"], "E1");
    assert_eq!(json["edges"][0]["arrows"], "to");
    assert_eq!(json["nodes"][0]["node_type"], "ENTITY");
    assert!((e1.x.abs().max(m1.x.abs()) - 1000.0).abs() < 1e-6);
}

// ===========================================================================
// GraphStore
// ===========================================================================

#[tokio::test]
async fn file_cache_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let cache = FileCache::new(dir.path().join("nested").join("last_kg.json"));
    assert!(cache.load().await.unwrap().is_none());
}

#[tokio::test]
async fn file_cache_corrupt_file_is_cache_io() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("last_kg.json");
    std::fs::write(&path, "not json").unwrap();
    let err = FileCache::new(&path).load().await.unwrap_err();
    assert_eq!(err.kind(), "cache_io");
}

#[tokio::test]
async fn file_cache_survives_new_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("last_kg.json");
    let record = CachedGraph::new(graph_from(COMPANY_X_GRAPH), VisualGraph::default(), COMPANY_X_TRIPLETS);

    let first = GraphStore::new(FileCache::new(&path), 0);
    first.replace_graph(&record).await.unwrap();
    first.append_conversation([ConversationTurn::user("q")]).await;

    let second = GraphStore::new(FileCache::new(&path), 0);
    assert_eq!(second.read().await.unwrap(), Some(record));
    assert!(second.read_conversation().await.is_empty());
    assert!(!path.with_file_name("last_kg.json.tmp").exists());

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    for key in ["kg", "visual_graph_nodes", "factual_triples"] {
        assert!(raw.get(key).is_some(), "missing {key}");
    }
}

#[tokio::test]
async fn read_conversation_returns_a_copy() {
    let store = GraphStore::in_memory();
    store.append_conversation([ConversationTurn::user("q")]).await;
    let mut copy = store.read_conversation().await;
    copy.clear();
    assert_eq!(store.read_conversation().await.len(), 1);
}

#[tokio::test]
async fn stale_exchange_is_not_appended() {
    let store = GraphStore::in_memory();
    let record = CachedGraph::new(KnowledgeGraph::default(), VisualGraph::default(), "");
    store.replace_graph(&record).await.unwrap();
    let ctx = store.query_context().await.unwrap();

    store.replace_graph(&record).await.unwrap();
    let appended = store
        .append_exchange(ctx.generation, ConversationTurn::user("q"), ConversationTurn::assistant("a"))
        .await;
    assert!(!appended);
    assert!(store.read_conversation().await.is_empty());
}

#[tokio::test]
async fn query_context_without_graph_is_no_graph() {
    let store = GraphStore::in_memory();
    assert!(store.query_context().await.unwrap_err().is_no_graph());
}

// ===========================================================================
// Pipeline
// ===========================================================================

#[tokio::test]
async fn company_x_end_to_end() {
    let mock = company_x_mock();
    let pipeline = pipeline_with(mock.clone(), &FingraphConfig::default());

    let record = pipeline.generate(COMPANY_X_TEXT).await.unwrap();
    let e1 = &record.kg.entities[&NodeId::entity(1)];
    assert_eq!(e1.name, "Company X");
    assert_eq!(e1.entity_type, "COMPANY");
    let m1 = &record.kg.measurements[&NodeId::measurement(1)];
    assert_eq!(m1.metric, "REVENUE");
    assert_eq!(m1.period.as_deref(), Some("FY24"));
    assert_eq!(record.kg.facts, vec![Fact::new("E1", "HAS_MEASUREMENT", "M1")]);
    assert_eq!(record.factual_triples, COMPANY_X_TRIPLETS);

    let answer = pipeline.query("What was the revenue?").await.unwrap();
    assert!(answer.contains("100 million") && answer.contains("FY24"), "{answer}");

    let answer = pipeline.query("What is the CEO's name?").await.unwrap();
    assert_eq!(answer, NOT_FOUND_ANSWER);

    let requests = mock.requests().await;
    assert_eq!(requests.len(), 4);
    for req in &requests {
        assert_eq!(req.temperature, Some(0.3));
    }
    assert_eq!(requests[0].model, "gpt-4o");
    assert!(requests[0].system().unwrap().contains(COMPANY_X_TEXT));
    assert!(requests[1].system().unwrap().contains("\"REVENUE\""));
    assert_eq!(requests[2].model, "gpt-4o-mini");
    assert!(requests[2].system().unwrap().contains(COMPANY_X_TRIPLETS));
}

#[tokio::test]
async fn query_sends_prior_turns_in_order() {
    let mock = company_x_mock();
    let pipeline = pipeline_with(mock.clone(), &FingraphConfig::default());
    pipeline.generate(COMPANY_X_TEXT).await.unwrap();

    pipeline.query("What was the revenue?").await.unwrap();
    pipeline.query("Who is the CEO?").await.unwrap();

    let last = mock.last_request().await.unwrap();
    let roles: Vec<&str> = last.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(last.messages[1].content, "What was the revenue?");
    assert_eq!(last.messages[3].content, "Who is the CEO?");
}

#[tokio::test]
async fn query_grows_conversation_by_two() {
    let pipeline = pipeline_with(company_x_mock(), &FingraphConfig::default());
    pipeline.generate(COMPANY_X_TEXT).await.unwrap();

    pipeline.query("What was the revenue?").await.unwrap();
    let turns = pipeline.conversation().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0], ConversationTurn::user("What was the revenue?"));
    assert_eq!(turns[1].role, Role::Assistant);

    pipeline.query("And the CEO?").await.unwrap();
    assert_eq!(pipeline.conversation().await.len(), 4);
}

#[tokio::test]
async fn generate_resets_conversation() {
    let mock = Arc::new(MockProvider::sequence(vec![
        MockBehavior::text(COMPANY_X_GRAPH),
        MockBehavior::text(COMPANY_X_TRIPLETS),
        company_x_answerer(),
        MockBehavior::text(COMPANY_X_GRAPH),
        MockBehavior::text(COMPANY_X_TRIPLETS),
    ]));
    let pipeline = pipeline_with(mock, &FingraphConfig::default());
    pipeline.generate(COMPANY_X_TEXT).await.unwrap();
    pipeline.query("What was the revenue?").await.unwrap();
    assert_eq!(pipeline.conversation().await.len(), 2);

    pipeline.generate(COMPANY_X_TEXT).await.unwrap();
    assert!(pipeline.conversation().await.is_empty());
}

#[tokio::test]
async fn clear_conversation_keeps_graph() {
    let pipeline = pipeline_with(company_x_mock(), &FingraphConfig::default());
    pipeline.generate(COMPANY_X_TEXT).await.unwrap();
    pipeline.query("What was the revenue?").await.unwrap();

    pipeline.clear_conversation().await;
    assert!(pipeline.conversation().await.is_empty());
    assert!(pipeline.last_graph().await.unwrap().is_some());
}

#[tokio::test]
async fn conversation_bound_drops_oldest_exchange() {
    let mut config = FingraphConfig::default();
    config.conversation.max_turns = 4;
    let pipeline = pipeline_with(company_x_mock(), &config);
    pipeline.generate(COMPANY_X_TEXT).await.unwrap();

    for q in ["first revenue?", "second?", "third?"] {
        pipeline.query(q).await.unwrap();
    }
    let turns = pipeline.conversation().await;
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].content, "second?");
}

#[tokio::test]
async fn bound_of_one_still_keeps_the_last_exchange() {
    let mut config = FingraphConfig::default();
    config.conversation.max_turns = 1;
    let pipeline = pipeline_with(company_x_mock(), &config);
    pipeline.generate(COMPANY_X_TEXT).await.unwrap();

    pipeline.query("first revenue?").await.unwrap();
    let turns = pipeline.conversation().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].role, Role::Assistant);

    pipeline.query("second?").await.unwrap();
    let turns = pipeline.conversation().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, "second?");
}

#[tokio::test]
async fn query_before_generate_is_no_graph() {
    let mock = Arc::new(MockProvider::texts(["unused"]));
    let pipeline = pipeline_with(mock.clone(), &FingraphConfig::default());
    let err = pipeline.query("What was the revenue?").await.unwrap_err();
    assert!(err.is_no_graph());
    assert_eq!(mock.call_count().await, 0);
    assert!(pipeline.conversation().await.is_empty());
}

#[tokio::test]
async fn failed_query_leaves_conversation_untouched() {
    let mock = Arc::new(MockProvider::sequence(vec![
        MockBehavior::text(COMPANY_X_GRAPH),
        MockBehavior::text(COMPANY_X_TRIPLETS),
        MockBehavior::Unavailable("connection refused".into()),
    ]));
    let pipeline = pipeline_with(mock, &FingraphConfig::default());
    pipeline.generate(COMPANY_X_TEXT).await.unwrap();

    let err = pipeline.query("What was the revenue?").await.unwrap_err();
    assert_eq!(err.kind(), "model_unavailable");
    assert_eq!(err.stage(), Some(Stage::Query));
    assert!(pipeline.conversation().await.is_empty());
}

#[tokio::test]
async fn non_json_extraction_fails_without_touching_cache() {
    let mock = Arc::new(MockProvider::texts(["Sure! Here is your graph."]));
    let pipeline = pipeline_with(mock.clone(), &FingraphConfig::default());
    let err = pipeline.generate(COMPANY_X_TEXT).await.unwrap_err();
    assert_eq!(err.kind(), "model_output_invalid");
    assert_eq!(mock.call_count().await, 1);
    assert!(pipeline.last_graph().await.unwrap().is_none());
}

#[tokio::test]
async fn resolution_failure_reports_resolution_stage() {
    let mock = Arc::new(MockProvider::sequence(vec![
        MockBehavior::text(COMPANY_X_GRAPH),
        MockBehavior::Unavailable("timeout".into()),
    ]));
    let pipeline = pipeline_with(mock, &FingraphConfig::default());
    let err = pipeline.generate(COMPANY_X_TEXT).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Resolution));
    assert!(pipeline.last_graph().await.unwrap().is_none());
}

#[tokio::test]
async fn extraction_ids_are_stable_for_a_fixed_response() {
    let mock = Arc::new(MockProvider::constant(MockBehavior::handler(|req| {
        if req.system().is_some_and(|s| s.contains("KNOWLEDGE GRAPH:")) {
            Ok(COMPANY_X_TRIPLETS.to_string())
        } else {
            Ok(COMPANY_X_GRAPH.to_string())
        }
    })));
    let pipeline = pipeline_with(mock, &FingraphConfig::default());
    let a = pipeline.generate(COMPANY_X_TEXT).await.unwrap();
    let b = pipeline.generate(COMPANY_X_TEXT).await.unwrap();
    assert_eq!(a.kg, b.kg);
    assert_eq!(
        a.kg.entities.keys().collect::<Vec<_>>(),
        b.kg.entities.keys().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn permissive_mode_keeps_flawed_output() {
    let flawed = r#"{"entities": {"E1": {"name": "Company X", "type": "CORPORATION"}},
        "measurements": {"M1": {"metric": "REVENUE", "value": 100, "unit": "million"}},
        "facts": [{"subject": "E1", "predicate": "HAS_MEASUREMENT", "object": "M1"}]}"#;
    let mock = Arc::new(MockProvider::texts([flawed, "(Company X, HAS_MEASUREMENT, 100 million)"]));
    let pipeline = pipeline_with(mock, &FingraphConfig::default());
    let record = pipeline.generate(COMPANY_X_TEXT).await.unwrap();
    assert_eq!(record.kg.entities[&NodeId::entity(1)].entity_type, "CORPORATION");
}

#[tokio::test]
async fn strict_mode_rejects_flawed_output() {
    let mut config = FingraphConfig::default();
    config.validation.mode = ValidationMode::Strict;

    let dangling = r#"{"entities": {"E1": {"name": "Company X", "type": "COMPANY"}},
        "measurements": {}, "facts": [{"subject": "E1", "predicate": "OWNS", "object": "E2"}]}"#;
    let mock = Arc::new(MockProvider::texts([dangling]));
    let err = pipeline_with(mock, &config).generate(COMPANY_X_TEXT).await.unwrap_err();
    assert_eq!(err.kind(), "model_output_invalid");
    assert_eq!(err.stage(), Some(Stage::Extraction));

    let mock = Arc::new(MockProvider::texts([COMPANY_X_GRAPH, "(Company X, HAS_MEASUREMENT, 100 million)"]));
    let err = pipeline_with(mock, &config).generate(COMPANY_X_TEXT).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Resolution));
}

#[tokio::test]
async fn strict_mode_accepts_clean_output() {
    let mut config = FingraphConfig::default();
    config.validation.mode = ValidationMode::Strict;
    let mock = Arc::new(MockProvider::texts([COMPANY_X_GRAPH, COMPANY_X_TRIPLETS]));
    let record = pipeline_with(mock, &config).generate(COMPANY_X_TEXT).await.unwrap();
    assert_eq!(record.kg.facts.len(), 1);
    assert_eq!(record.factual_triples, COMPANY_X_TRIPLETS);
}

#[tokio::test]
async fn strict_mode_generates_an_empty_graph() {
    let mut config = FingraphConfig::default();
    config.validation.mode = ValidationMode::Strict;
    let no_facts = r#"{"entities": {"E1": {"name": "Company X", "type": "COMPANY"}},
        "measurements": {}, "facts": []}"#;
    let mock = Arc::new(MockProvider::texts([no_facts, ""]));
    let pipeline = pipeline_with(mock.clone(), &config);

    let record = pipeline.generate("Company X exists.").await.unwrap();
    assert!(record.kg.is_empty());
    assert_eq!(record.factual_triples, "");
    assert!(record.visual_graph_nodes.nodes.is_empty());
    assert_eq!(mock.call_count().await, 2);
    assert_eq!(pipeline.last_graph().await.unwrap(), Some(record));
}

#[tokio::test]
async fn string_measurement_values_pass_permissive_and_fail_strict() {
    let drifted = r#"{"entities": {"E1": {"name": "Company X", "type": "COMPANY"}},
        "measurements": {"M1": {"metric": "REVENUE", "value": "100 million", "period": "FY24"}},
        "facts": [{"subject": "E1", "predicate": "REPORTED_REVENUE", "object": "M1"}]}"#;

    let mock = Arc::new(MockProvider::texts([drifted, COMPANY_X_TRIPLETS]));
    let record = pipeline_with(mock, &FingraphConfig::default())
        .generate(COMPANY_X_TEXT)
        .await
        .unwrap();
    let m1 = &record.kg.measurements[&NodeId::measurement(1)];
    assert_eq!(m1.value.to_string(), "100 million");
    let node = record.visual_graph_nodes.node(&NodeId::measurement(1)).unwrap();
    assert_eq!(node.label, "REVENUE: 100 million");

    let mut config = FingraphConfig::default();
    config.validation.mode = ValidationMode::Strict;
    let mock = Arc::new(MockProvider::texts([drifted]));
    let err = pipeline_with(mock, &config).generate(COMPANY_X_TEXT).await.unwrap_err();
    assert_eq!(err.kind(), "model_output_invalid");
    assert_eq!(err.stage(), Some(Stage::Extraction));
    assert!(err.to_string().contains("not a number"), "{err}");
}

#[tokio::test]
async fn no_provider_is_configuration_error() {
    let pipeline = KnowledgePipeline::new(&FingraphConfig::default(), None, Arc::new(GraphStore::in_memory()));
    assert!(!pipeline.model_ready());
    assert_eq!(pipeline.generate(COMPANY_X_TEXT).await.unwrap_err().kind(), "configuration");
    assert_eq!(pipeline.query("anything").await.unwrap_err().kind(), "configuration");
    pipeline.clear_conversation().await;
    assert!(pipeline.allowed_types().entity_types.contains(&"COMPANY"));
}

#[tokio::test]
async fn empty_inputs_are_invalid() {
    let pipeline = pipeline_with(company_x_mock(), &FingraphConfig::default());
    assert_eq!(pipeline.generate("  \n").await.unwrap_err().kind(), "invalid_input");
    pipeline.generate(COMPANY_X_TEXT).await.unwrap();
    assert_eq!(pipeline.query("   ").await.unwrap_err().kind(), "invalid_input");
}
