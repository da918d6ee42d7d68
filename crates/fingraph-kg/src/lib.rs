//! fingraph-kg - extraction, triplet resolution, conversational query and the graph store

pub mod extractor;
pub mod invoke;
pub mod pipeline;
pub mod prompts;
pub mod prune;
pub mod query;
pub mod resolver;
pub mod store;
pub mod validate;
pub mod visual;

pub use extractor::{Extraction, Extractor};
pub use invoke::{invoke, map_llm_error, ModelCall};
pub use pipeline::KnowledgePipeline;
pub use prompts::NOT_FOUND_ANSWER;
pub use prune::{prune_isolated_nodes, Pruned};
pub use query::QueryEngine;
pub use resolver::{Resolution, TripletResolver};
pub use store::{CacheBackend, CachedGraph, FileCache, GraphStore, MemoryCache, QueryContext};
pub use validate::{
    check_triplets, parse_graph, parse_triplets, validate_graph, Finding, ParsedGraph, ResolvedTriplet,
    TripletFinding, ValidationReport,
};
pub use visual::{build_visual_graph, spring_layout, VisualEdge, VisualGraph, VisualNode, VisualNodeType};
