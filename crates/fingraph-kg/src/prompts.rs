//! System instructions for the three model-invoking stages

use fingraph_core::registry::{self, GENERIC_PREDICATES, HAS_MEASUREMENT};
use fingraph_core::{Entity, Fact, KnowledgeGraph, Measurement, NodeId};

/// Fixed user turn sent with the extraction instruction.
pub const EXTRACTION_USER_TURN: &str =
    "Please extract the knowledge graph from the provided text context.";

/// Fixed user turn sent with the resolution instruction.
pub const RESOLUTION_USER_TURN: &str =
    "Please extract the factual triplets from the provided knowledge graph.";

/// The literal reply the query engine must give when the triplets cannot answer.
pub const NOT_FOUND_ANSWER: &str = "Answer cannot be found from the provided data.";

fn bullet_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A worked example: source text and the graph it should produce.
pub fn worked_examples() -> Vec<(&'static str, KnowledgeGraph)> {
    let mut ethylene = KnowledgeGraph::default();
    ethylene.entities.insert(
        NodeId::entity(1),
        Entity::new("Global Ethylene Market", "MARKET").with_property("region", "Global"),
    );
    ethylene.entities.insert(
        NodeId::entity(2),
        Entity::new("Jio-bp", "COMPANY").with_property("country", "India"),
    );
    ethylene.entities.insert(
        NodeId::entity(3),
        Entity::new("Mobility Station Network", "ASSET_NETWORK").with_property("operator", "Jio-bp"),
    );
    ethylene.measurements.insert(
        NodeId::measurement(1),
        Measurement::new("DEMAND", 185u64, "MMT").with_period("CY24"),
    );
    ethylene.measurements.insert(
        NodeId::measurement(2),
        Measurement::new("COUNT", 1916u64, "stations"),
    );
    ethylene.facts = vec![
        Fact::new("E1", HAS_MEASUREMENT, "M1"),
        Fact::new("E2", "OWNS", "E3"),
        Fact::new("E3", HAS_MEASUREMENT, "M2"),
    ];

    let mut revenue = KnowledgeGraph::default();
    revenue
        .entities
        .insert(NodeId::entity(1), Entity::new("Company X", "COMPANY"));
    revenue.measurements.insert(
        NodeId::measurement(1),
        Measurement::new("REVENUE", 100u64, "million").with_period("FY24"),
    );
    revenue.facts = vec![Fact::new("E1", "REPORTED_REVENUE", "M1")];

    vec![
        (
            "Global ethylene demand was 185 MMT in CY24. Jio-bp operates 1,916 mobility stations across India.",
            ethylene,
        ),
        ("Company X reported revenue of 100 million in FY24.", revenue),
    ]
}

fn rendered_examples() -> String {
    worked_examples()
        .into_iter()
        .enumerate()
        .map(|(i, (text, graph))| {
            let json = serde_json::to_string_pretty(&graph).unwrap_or_default();
            format!("Example {}\nInput text:\n{}\nOutput:\n{}", i + 1, text, json)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Instruction for turning raw text into a schema-constrained graph.
pub fn extraction_prompt(text: &str) -> String {
    format!(
        r#"You are an information extraction system for financial documents.
Read the text below and produce a knowledge graph of entities, measurements and facts.
Respond with one JSON object and nothing else.

OUTPUT CONTRACT
The JSON object has exactly three top-level keys and no others:
{{"entities": {{}}, "measurements": {{}}, "facts": []}}

ENTITIES
"entities": {{"E<n>": {{"name": "string", "type": "ENTITY_TYPE", "properties": {{"key": "value"}}}}}}
- An entity is a real-world object: a company, market, product, segment, person or place.
- An entity name never contains a number, metric, percentage or time period.
- Each entity is declared once and reused by every fact that mentions it.
- If a concept fits none of the allowed entity types, do not create an entity for it.
Allowed entity types:
{entity_types}

MEASUREMENTS
"measurements": {{"M<n>": {{"metric": "METRIC_TYPE", "value": number, "unit": "string", "period": "string", "source": "string"}}}}
- Every number and every time-bound quantity is a measurement.
- metric, value and unit are required. value is a JSON number.
- period is required whenever the text states one. source is optional.
- "185 MMT in CY24" is a measurement with value 185, unit "MMT", period "CY24", never a string.
Allowed metric types:
{metric_types}
Metric selection:
- "demand was 185 MMT" uses DEMAND
- "demand increased by 2.2%" uses GROWTH_RATE, not DEMAND
- "price was 21 cpg" uses PRICE
- "capacity addition of 4.6 MMT" uses CAPACITY

FACTS
"facts": [{{"subject": "E<n>", "predicate": "PREDICATE", "object": "E<n> | M<n>"}}]
- subject and object are identifiers declared in entities or measurements.
- Free-text objects are forbidden.
- Link an entity to a measurement with {has_measurement}.
- Revenue predicates are only for monetary revenue figures.
- Use EXTRACTED_FROM_DOCUMENT and EXTRACTED_FROM_PAGE for provenance when the text names its source.
- If a relation cannot be expressed with an allowed predicate, leave it out.
Allowed predicates (uppercase, exactly as written):
{predicates}

IDENTIFIERS
- Entities are numbered E1, E2, E3 in order of first appearance in the text.
- Measurements are numbered M1, M2, M3 in order of extraction.
- The same text always yields the same identifiers.

FORBIDDEN
- Numbers, metrics or periods inside entities.
- Free-text quantities anywhere outside a measurement.
- Predicates that are invented, paraphrased or lower-case.
- Facts that reference undeclared identifiers.
- Facts not explicitly stated in the text.
- Explanations, comments, markdown or code fences such as ```json.

{examples}

TEXT:
<<<
{text}
>>>"#,
        entity_types = bullet_list(registry::ENTITY_TYPES),
        metric_types = bullet_list(registry::METRIC_TYPES),
        predicates = registry::PREDICATE_TYPES.join(", "),
        has_measurement = HAS_MEASUREMENT,
        examples = rendered_examples(),
        text = text,
    )
}

/// Instruction for flattening a pruned graph into readable triplets.
pub fn resolution_prompt(graph_json: &str) -> String {
    let concrete: Vec<&str> = registry::concrete_predicates().collect();
    format!(
        r#"You are an information extraction system for financial documents.
Turn the knowledge graph below into factual triplets.

KNOWLEDGE GRAPH:
{graph_json}

RULES
- Output only triplets already present in the graph. Invent nothing, infer nothing.
- SUBJECT and OBJECT are human-readable names or values, never identifiers such as E1 or M1.
- Replace every measurement identifier with its value, unit and period: "value unit in period".
  Wrong: (Company X, {has_measurement}, M1)
  Right: (Company X, REPORTED_REVENUE, 100 million in FY24)
- {generic} link nodes inside the graph only. Replace each with a concrete predicate
  chosen from the measurement's metric type. They must never appear in the output.
- Concrete predicates:
{concrete}

OUTPUT FORMAT
- Plain text, one triplet per line: (SUBJECT, PREDICATE, OBJECT)
- No JSON, no markdown, no explanations.
- No blank lines and no trailing punctuation.

Examples:
(Jio-bp, OWNS, Mobility Station Network)
(Jio-bp, OPERATES_IN, India)
(Company X, REPORTED_PROFIT, 12 million in FY24)
(XYZ Global Holdings Limited, REPORTED_REVENUE, INR 1,146,000,000,000 in FY 2024-25)"#,
        graph_json = graph_json,
        has_measurement = HAS_MEASUREMENT,
        generic = GENERIC_PREDICATES.join(" and "),
        concrete = concrete.join(", "),
    )
}

/// Instruction binding the query model to the cached triplets.
pub fn query_prompt(triplets: &str) -> String {
    format!(
        r#"You are a factual query engine. You answer only from the triplets of a financial document given below.
Each line is (SUBJECT, PREDICATE, OBJECT).

RULES
- Do not use outside knowledge.
- Do not make anything up.
- If the triplets do not contain the answer, reply exactly: {not_found}

FACTUAL TRIPLES:
{triplets}

When answering:
- Cite the entities and values you relied on.
- Include values, units and periods for measurements.
- Explain relationships plainly when asked about them."#,
        not_found = NOT_FOUND_ANSWER,
        triplets = triplets,
    )
}
