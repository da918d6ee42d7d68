//! vis-network payload derived from a pruned graph
//!
//! Positions come from a Fruchterman–Reingold force layout seeded on a
//! circle, so the same graph always lays out the same way.

use fingraph_core::{KnowledgeGraph, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const LAYOUT_K: f64 = 2.0;
pub const LAYOUT_ITERATIONS: usize = 100;
pub const LAYOUT_SCALE: f64 = 1000.0;
const FONT_SIZE: u32 = 32;
const NODE_SIZE: u32 = 50;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualGraph {
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<VisualEdge>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VisualNodeType {
    Entity,
    Measurement,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub size: u32,
}

impl Font {
    fn node() -> Self {
        Self {
            color: Some("black".into()),
            size: FONT_SIZE,
        }
    }

    fn edge() -> Self {
        Self {
            color: None,
            size: FONT_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualNode {
    pub id: NodeId,
    pub label: String,
    pub group: String,
    pub node_type: VisualNodeType,
    pub properties: serde_json::Value,
    pub shape: String,
    pub size: u32,
    pub x: f64,
    pub y: f64,
    pub font: Font,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualEdge {
    pub arrows: String,
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
    pub font: Font,
    pub smooth: bool,
}

impl VisualGraph {
    pub fn node(&self, id: &NodeId) -> Option<&VisualNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

/// Build the payload. Only declared nodes become visual nodes; every fact
/// becomes an edge, and dangling endpoints still take part in the layout.
pub fn build_visual_graph(graph: &KnowledgeGraph) -> VisualGraph {
    let mut order: Vec<&NodeId> = graph
        .entities
        .keys()
        .chain(graph.measurements.keys())
        .collect();
    for fact in &graph.facts {
        for id in [&fact.subject, &fact.object] {
            if !order.contains(&id) {
                order.push(id);
            }
        }
    }
    let index: HashMap<&NodeId, usize> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let edges: Vec<(usize, usize)> = graph
        .facts
        .iter()
        .filter_map(|f| Some((*index.get(&f.subject)?, *index.get(&f.object)?)))
        .collect();
    let positions = spring_layout(order.len(), &edges, LAYOUT_K, LAYOUT_ITERATIONS);
    let at = |id: &NodeId| {
        index
            .get(id)
            .map(|&i| positions[i])
            .unwrap_or([0.0, 0.0])
    };

    let mut nodes = Vec::with_capacity(graph.node_count());
    for (id, entity) in &graph.entities {
        let [x, y] = at(id);
        nodes.push(VisualNode {
            id: id.clone(),
            label: entity.name.clone(),
            group: entity.entity_type.clone(),
            node_type: VisualNodeType::Entity,
            properties: serde_json::to_value(&entity.properties).unwrap_or_default(),
            shape: "dot".into(),
            size: NODE_SIZE,
            x: x * LAYOUT_SCALE,
            y: y * LAYOUT_SCALE,
            font: Font::node(),
        });
    }
    for (id, m) in &graph.measurements {
        let [x, y] = at(id);
        nodes.push(VisualNode {
            id: id.clone(),
            label: format!("{}: {}", m.metric, m.quantity()),
            group: "MEASUREMENT".into(),
            node_type: VisualNodeType::Measurement,
            properties: serde_json::to_value(m).unwrap_or_default(),
            shape: "box".into(),
            size: NODE_SIZE,
            x: x * LAYOUT_SCALE,
            y: y * LAYOUT_SCALE,
            font: Font::node(),
        });
    }

    let edges = graph
        .facts
        .iter()
        .map(|f| VisualEdge {
            arrows: "to".into(),
            from: f.subject.clone(),
            to: f.object.clone(),
            label: f.predicate.clone(),
            font: Font::edge(),
            smooth: false,
        })
        .collect();

    VisualGraph { nodes, edges }
}

// ============================================================
// Force layout
// ============================================================

const MIN_DISTANCE: f64 = 0.01;
const CONVERGENCE: f64 = 1e-4;

/// Fruchterman–Reingold on `n` nodes. Edges are treated as undirected.
/// Output is centred on the origin with the largest coordinate at ±1.
pub fn spring_layout(n: usize, edges: &[(usize, usize)], k: f64, iterations: usize) -> Vec<[f64; 2]> {
    match n {
        0 => return Vec::new(),
        1 => return vec![[0.0, 0.0]],
        _ => {}
    }

    let mut adjacency = vec![vec![0.0_f64; n]; n];
    for &(a, b) in edges {
        if a != b {
            adjacency[a][b] = 1.0;
            adjacency[b][a] = 1.0;
        }
    }

    let mut pos: Vec<[f64; 2]> = (0..n)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / n as f64;
            [theta.cos(), theta.sin()]
        })
        .collect();

    let mut t = span(&pos) * 0.1;
    let dt = t / (iterations as f64 + 1.0);

    for _ in 0..iterations {
        let mut moved = 0.0;
        let mut step = vec![[0.0_f64; 2]; n];
        for i in 0..n {
            let mut disp = [0.0_f64; 2];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let delta = [pos[i][0] - pos[j][0], pos[i][1] - pos[j][1]];
                let d = delta[0].hypot(delta[1]).max(MIN_DISTANCE);
                let force = k * k / (d * d) - adjacency[i][j] * d / k;
                disp[0] += delta[0] * force;
                disp[1] += delta[1] * force;
            }
            let len = disp[0].hypot(disp[1]).max(MIN_DISTANCE);
            step[i] = [disp[0] * t / len, disp[1] * t / len];
            moved += step[i][0].hypot(step[i][1]);
        }
        for (p, s) in pos.iter_mut().zip(&step) {
            p[0] += s[0];
            p[1] += s[1];
        }
        t -= dt;
        if moved / (n as f64) < CONVERGENCE {
            break;
        }
    }

    rescale(&mut pos);
    pos
}

fn span(pos: &[[f64; 2]]) -> f64 {
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for p in pos {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    (max_x - min_x).max(max_y - min_y)
}

fn rescale(pos: &mut [[f64; 2]]) {
    let n = pos.len() as f64;
    let cx = pos.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pos.iter().map(|p| p[1]).sum::<f64>() / n;
    let mut lim = 0.0_f64;
    for p in pos.iter_mut() {
        p[0] -= cx;
        p[1] -= cy;
        lim = lim.max(p[0].abs()).max(p[1].abs());
    }
    if lim > 0.0 {
        for p in pos.iter_mut() {
            p[0] /= lim;
            p[1] /= lim;
        }
    }
}
