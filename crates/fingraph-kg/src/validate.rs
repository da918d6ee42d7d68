//! Mechanical checks on model output
//!
//! Non-JSON output or missing top-level keys is always an error. Drift
//! inside the graph (string values, missing units, unknown types) is
//! reported as findings and the caller's `ValidationMode` decides whether
//! findings are fatal.

use fingraph_core::registry;
use fingraph_core::{Error, KnowledgeGraph, NodeId, Result, Stage};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub const REQUIRED_KEYS: [&str; 3] = ["entities", "measurements", "facts"];

/// A graph parsed from model text, plus any top-level keys it should not have had.
#[derive(Clone, Debug)]
pub struct ParsedGraph {
    pub graph: KnowledgeGraph,
    pub unexpected_keys: Vec<String>,
}

/// Parse the extraction response. Only surrounding whitespace is tolerated.
pub fn parse_graph(text: &str) -> Result<ParsedGraph> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|e| {
        Error::output_invalid(Stage::Extraction, format!("response is not valid JSON: {e}"))
    })?;
    let Value::Object(mut object) = value else {
        return Err(Error::output_invalid(
            Stage::Extraction,
            "response is not a JSON object",
        ));
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|k| !object.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(Error::output_invalid(
            Stage::Extraction,
            format!("missing required top-level keys: {}", missing.join(", ")),
        ));
    }

    let mut core = Map::new();
    for key in REQUIRED_KEYS {
        if let Some(v) = object.remove(key) {
            core.insert(key.to_string(), v);
        }
    }
    let unexpected_keys: Vec<String> = object.keys().cloned().collect();

    let graph: KnowledgeGraph = serde_json::from_value(Value::Object(core)).map_err(|e| {
        Error::output_invalid(Stage::Extraction, format!("response does not match the graph schema: {e}"))
    })?;

    Ok(ParsedGraph {
        graph,
        unexpected_keys,
    })
}

/// One structural problem in an extracted graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Finding {
    UnexpectedTopLevelKey(String),
    MalformedEntityId(NodeId),
    MalformedMeasurementId(NodeId),
    UnknownEntityType { id: NodeId, entity_type: String },
    UnknownMetric { id: NodeId, metric: String },
    NonNumericValue { id: NodeId, value: String },
    MissingUnit(NodeId),
    NumericEntityName { id: NodeId, name: String },
    UnknownPredicate { fact: usize, predicate: String },
    DanglingReference { fact: usize, id: NodeId },
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::UnexpectedTopLevelKey(k) => write!(f, "unexpected top-level key '{k}'"),
            Finding::MalformedEntityId(id) => write!(f, "entity id '{id}' is not of the form E<n>"),
            Finding::MalformedMeasurementId(id) => {
                write!(f, "measurement id '{id}' is not of the form M<n>")
            }
            Finding::UnknownEntityType { id, entity_type } => {
                write!(f, "entity {id} has unknown type '{entity_type}'")
            }
            Finding::UnknownMetric { id, metric } => {
                write!(f, "measurement {id} has unknown metric '{metric}'")
            }
            Finding::NonNumericValue { id, value } => {
                write!(f, "measurement {id} value '{value}' is not a number")
            }
            Finding::MissingUnit(id) => write!(f, "measurement {id} has no unit"),
            Finding::NumericEntityName { id, name } => {
                write!(f, "entity {id} name '{name}' is a numeric quantity")
            }
            Finding::UnknownPredicate { fact, predicate } => {
                write!(f, "fact #{fact} uses unknown predicate '{predicate}'")
            }
            Finding::DanglingReference { fact, id } => {
                write!(f, "fact #{fact} references undeclared node '{id}'")
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn summary(&self) -> String {
        self.findings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn dangling(&self) -> impl Iterator<Item = &NodeId> {
        self.findings.iter().filter_map(|f| match f {
            Finding::DanglingReference { id, .. } => Some(id),
            _ => None,
        })
    }
}

fn numeric_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\s$€£¥₹]*[-+]?\d[\d,.\s]*(%|[kKmMbB]n?)?\s*$").expect("valid regex")
    })
}

/// Check ID patterns, registry membership and referential integrity.
pub fn validate_graph(parsed: &ParsedGraph) -> ValidationReport {
    let graph = &parsed.graph;
    let mut findings: Vec<Finding> = parsed
        .unexpected_keys
        .iter()
        .cloned()
        .map(Finding::UnexpectedTopLevelKey)
        .collect();

    for (id, entity) in &graph.entities {
        if !(id.is_entity() && id.is_well_formed()) {
            findings.push(Finding::MalformedEntityId(id.clone()));
        }
        if !registry::is_entity_type(&entity.entity_type) {
            findings.push(Finding::UnknownEntityType {
                id: id.clone(),
                entity_type: entity.entity_type.clone(),
            });
        }
        if numeric_name().is_match(&entity.name) {
            findings.push(Finding::NumericEntityName {
                id: id.clone(),
                name: entity.name.clone(),
            });
        }
    }

    for (id, m) in &graph.measurements {
        if !(id.is_measurement() && id.is_well_formed()) {
            findings.push(Finding::MalformedMeasurementId(id.clone()));
        }
        if !registry::is_metric_type(&m.metric) {
            findings.push(Finding::UnknownMetric {
                id: id.clone(),
                metric: m.metric.clone(),
            });
        }
        if !m.value.is_number() {
            findings.push(Finding::NonNumericValue {
                id: id.clone(),
                value: m.value.to_string(),
            });
        }
        if m.unit.trim().is_empty() {
            findings.push(Finding::MissingUnit(id.clone()));
        }
    }

    for (i, fact) in graph.facts.iter().enumerate() {
        if !registry::is_predicate(&fact.predicate) {
            findings.push(Finding::UnknownPredicate {
                fact: i,
                predicate: fact.predicate.clone(),
            });
        }
        for id in [&fact.subject, &fact.object] {
            if !graph.contains(id) {
                findings.push(Finding::DanglingReference {
                    fact: i,
                    id: id.clone(),
                });
            }
        }
    }

    ValidationReport { findings }
}

// ============================================================
// Resolved triplets
// ============================================================

/// One `(SUBJECT, PREDICATE, OBJECT)` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTriplet {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl std::fmt::Display for ResolvedTriplet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

fn predicate_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid regex"))
}

impl ResolvedTriplet {
    /// Parse one line. Subjects and objects may themselves contain commas,
    /// so the predicate is located as a registered predicate segment first,
    /// then as any upper-case token.
    pub fn parse(line: &str) -> Option<Self> {
        let inner = line.trim().strip_prefix('(')?.strip_suffix(')')?;
        let parts: Vec<&str> = inner.split(", ").collect();
        if parts.len() < 3 {
            return None;
        }
        let middle = 1..parts.len() - 1;
        let at = middle
            .clone()
            .find(|&i| registry::is_predicate(parts[i].trim()))
            .or_else(|| middle.clone().find(|&i| predicate_token().is_match(parts[i].trim())))?;

        let subject = parts[..at].join(", ").trim().to_string();
        let object = parts[at + 1..].join(", ").trim().to_string();
        if subject.is_empty() || object.is_empty() {
            return None;
        }
        Some(Self {
            subject,
            predicate: parts[at].trim().to_string(),
            object,
        })
    }
}

/// Parse every well-formed line, skipping the rest.
pub fn parse_triplets(text: &str) -> Vec<ResolvedTriplet> {
    text.lines().filter_map(ResolvedTriplet::parse).collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TripletFinding {
    BlankLine { line: usize },
    Malformed { line: usize, text: String },
    GenericPredicate { line: usize, predicate: String },
    UnregisteredPredicate { line: usize, predicate: String },
    RawIdentifier { line: usize, id: String },
}

impl std::fmt::Display for TripletFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TripletFinding::BlankLine { line } => write!(f, "line {line} is blank"),
            TripletFinding::Malformed { line, text } => {
                write!(f, "line {line} is not a (SUBJECT, PREDICATE, OBJECT) triplet: {text}")
            }
            TripletFinding::GenericPredicate { line, predicate } => {
                write!(f, "line {line} uses generic predicate {predicate}")
            }
            TripletFinding::UnregisteredPredicate { line, predicate } => {
                write!(f, "line {line} uses unregistered predicate {predicate}")
            }
            TripletFinding::RawIdentifier { line, id } => {
                write!(f, "line {line} leaves raw identifier {id} unresolved")
            }
        }
    }
}

/// Check resolver output against the triplet text contract. Line numbers are 1-based.
/// Empty output is clean: a graph without facts resolves to no lines.
pub fn check_triplets(text: &str) -> Vec<TripletFinding> {
    let mut findings = Vec::new();
    if text.trim().is_empty() {
        return findings;
    }
    let body = text.trim_end_matches(['\n', '\r']);
    for (i, raw) in body.split('\n').enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            findings.push(TripletFinding::BlankLine { line });
            continue;
        }
        let Some(t) = ResolvedTriplet::parse(trimmed) else {
            findings.push(TripletFinding::Malformed {
                line,
                text: trimmed.to_string(),
            });
            continue;
        };
        if registry::is_generic_predicate(&t.predicate) {
            findings.push(TripletFinding::GenericPredicate {
                line,
                predicate: t.predicate.clone(),
            });
        } else if !registry::is_predicate(&t.predicate) {
            findings.push(TripletFinding::UnregisteredPredicate {
                line,
                predicate: t.predicate.clone(),
            });
        }
        for side in [&t.subject, &t.object] {
            if NodeId::new(side.as_str()).is_well_formed() {
                findings.push(TripletFinding::RawIdentifier {
                    line,
                    id: side.clone(),
                });
            }
        }
    }
    findings
}
