//! Core types for fingraph: the knowledge graph model and conversation turns

use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

pub const ENTITY_PREFIX: char = 'E';
pub const MEASUREMENT_PREFIX: char = 'M';

/// Identifier of a graph node: `E<n>` for entities, `M<n>` for measurements.
///
/// Ordering is by prefix, then by numeric suffix, then by the raw text, so
/// `E2` sorts before `E10` and maps keyed by `NodeId` iterate in assignment
/// order.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

/// Which map a node identifier points into, judged by its prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Entity,
    Measurement,
}

impl NodeId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn entity(n: u64) -> Self {
        Self(format!("{ENTITY_PREFIX}{n}"))
    }

    pub fn measurement(n: u64) -> Self {
        Self(format!("{MEASUREMENT_PREFIX}{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix-based classification. `E7x` is still an entity reference here;
    /// use [`NodeId::is_well_formed`] for the strict pattern.
    pub fn kind(&self) -> Option<NodeKind> {
        match self.0.chars().next()? {
            ENTITY_PREFIX => Some(NodeKind::Entity),
            MEASUREMENT_PREFIX => Some(NodeKind::Measurement),
            _ => None,
        }
    }

    pub fn is_entity(&self) -> bool {
        self.kind() == Some(NodeKind::Entity)
    }

    pub fn is_measurement(&self) -> bool {
        self.kind() == Some(NodeKind::Measurement)
    }

    /// The `n` of `E<n>` / `M<n>`, if the suffix is a positive integer.
    pub fn ordinal(&self) -> Option<u64> {
        let mut chars = self.0.chars();
        chars.next()?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().filter(|n| *n >= 1)
    }

    pub fn is_well_formed(&self) -> bool {
        self.kind().is_some() && self.ordinal().is_some()
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        let prefix = |id: &NodeId| id.0.chars().next();
        prefix(self)
            .cmp(&prefix(other))
            .then_with(|| {
                self.ordinal()
                    .unwrap_or(u64::MAX)
                    .cmp(&other.ordinal().unwrap_or(u64::MAX))
            })
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A real-world object: company, market, product, segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default, deserialize_with = "scalar_string_map")]
    pub properties: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A measurement's value as the model wrote it. Numbers are expected;
/// strings such as `"100 million"` and other JSON are kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl MeasurementValue {
    pub fn is_number(&self) -> bool {
        matches!(self, MeasurementValue::Number(_))
    }
}

impl Default for MeasurementValue {
    fn default() -> Self {
        MeasurementValue::Other(serde_json::Value::Null)
    }
}

impl std::fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasurementValue::Number(n) => write!(f, "{n}"),
            MeasurementValue::Text(s) => f.write_str(s),
            MeasurementValue::Other(serde_json::Value::Null) => Ok(()),
            MeasurementValue::Other(v) => write!(f, "{v}"),
        }
    }
}

impl From<serde_json::Number> for MeasurementValue {
    fn from(n: serde_json::Number) -> Self {
        MeasurementValue::Number(n)
    }
}

impl From<u64> for MeasurementValue {
    fn from(n: u64) -> Self {
        MeasurementValue::Number(n.into())
    }
}

impl From<i64> for MeasurementValue {
    fn from(n: i64) -> Self {
        MeasurementValue::Number(n.into())
    }
}

impl From<f64> for MeasurementValue {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(MeasurementValue::Number)
            .unwrap_or_default()
    }
}

impl From<&str> for MeasurementValue {
    fn from(s: &str) -> Self {
        MeasurementValue::Text(s.to_string())
    }
}

impl From<String> for MeasurementValue {
    fn from(s: String) -> Self {
        MeasurementValue::Text(s)
    }
}

/// Numeric or time-bound information. Never an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub metric: String,
    #[serde(default)]
    pub value: MeasurementValue,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Measurement {
    pub fn new(metric: impl Into<String>, value: impl Into<MeasurementValue>, unit: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
            unit: unit.into(),
            period: None,
            source: None,
        }
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    /// `value unit`, either part omitted when empty.
    pub fn quantity(&self) -> String {
        format!("{} {}", self.value, self.unit).trim().to_string()
    }

    /// `value unit [in period]`, the literal form used in resolved triplets.
    pub fn literal(&self) -> String {
        let mut out = self.quantity();
        if let Some(period) = &self.period {
            out.push_str(" in ");
            out.push_str(period);
        }
        out.trim().to_string()
    }
}

/// A directed labeled edge between two node identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub subject: NodeId,
    pub predicate: String,
    pub object: NodeId,
}

impl Fact {
    pub fn new(subject: impl Into<NodeId>, predicate: impl Into<String>, object: impl Into<NodeId>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

/// The extracted graph: two node maps plus the fact list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub entities: BTreeMap<NodeId, Entity>,
    pub measurements: BTreeMap<NodeId, Measurement>,
    pub facts: Vec<Fact>,
}

impl KnowledgeGraph {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.measurements.is_empty() && self.facts.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.entities.len() + self.measurements.len()
    }

    /// Whether `id` is declared in either node map.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.entities.contains_key(id) || self.measurements.contains_key(id)
    }

    /// Every identifier used as a subject or object by any fact.
    pub fn referenced_ids(&self) -> BTreeSet<&NodeId> {
        self.facts
            .iter()
            .flat_map(|f| [&f.subject, &f.object])
            .collect()
    }

    /// Human-readable label for a node: entity name or measurement literal.
    pub fn label(&self, id: &NodeId) -> Option<String> {
        if let Some(e) = self.entities.get(id) {
            return Some(e.name.clone());
        }
        self.measurements.get(id).map(Measurement::literal)
    }
}

/// Conversation role. System instructions are never stored in a conversation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of the query dialogue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Accepts a JSON object whose values are strings, numbers or booleans and
/// stringifies the non-string scalars. `null` values are dropped.
fn scalar_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw: Option<BTreeMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    let mut out = BTreeMap::new();
    for (key, value) in raw.unwrap_or_default() {
        match value {
            serde_json::Value::Null => {}
            serde_json::Value::String(s) => {
                out.insert(key, s);
            }
            serde_json::Value::Number(n) => {
                out.insert(key, n.to_string());
            }
            serde_json::Value::Bool(b) => {
                out.insert(key, b.to_string());
            }
            other => {
                return Err(D::Error::custom(format!(
                    "property '{key}' must be a scalar, got {other}"
                )))
            }
        }
    }
    Ok(out)
}
