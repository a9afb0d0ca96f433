//! Read-only collaborators queried by the layout engine.
//!
//! The engine never mutates a [`Graph`] or a [`Viewport`]; it only reads topology, existing
//! coordinates and the visible area. [`MemoryGraph`] and [`FixedViewport`] are plain-data
//! implementations for hosts that do not already have their own model.

use crate::error::{Error, Result};
use crate::geometry::{Point, Size};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Opaque identifier: equality and hashing only, no ordering is assumed.
pub trait Identifier: Clone + Eq + Hash + Debug {}

impl<T> Identifier for T where T: Clone + Eq + Hash + Debug {}

/// Coordinates stored on a node. Either axis may be unset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl NodePosition {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }

    pub fn unset() -> Self {
        Self::default()
    }

    /// The point, if both axes are set.
    pub fn point(&self) -> Option<Point> {
        Some(Point::new(self.x?, self.y?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePorts<P> {
    pub from: P,
    pub to: P,
}

pub trait Graph {
    type NodeId: Identifier;
    type EdgeId: Identifier;
    type PortId: Identifier;

    fn node_ids(&self) -> Vec<Self::NodeId>;
    fn node(&self, id: &Self::NodeId) -> Option<NodePosition>;
    fn edge_ids(&self) -> Vec<Self::EdgeId>;
    fn edge(&self, id: &Self::EdgeId) -> Option<EdgePorts<Self::PortId>>;
    /// Owning node of a port.
    fn port(&self, id: &Self::PortId) -> Option<Self::NodeId>;
}

pub trait Viewport {
    fn dimensions(&self) -> Size;
    fn to_content_coords(&self, viewport_point: Point) -> Point;

    /// Center of the visible area, in content coordinates.
    fn visual_center(&self) -> Point {
        let size = self.dimensions();
        self.to_content_coords(Point::new(size.width / 2.0, size.height / 2.0))
    }
}

/// A viewport with a fixed size, pan offset and zoom.
///
/// `content = offset + viewport / zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FixedViewport {
    pub width: f64,
    pub height: f64,
    pub offset: Point,
    pub zoom: f64,
}

impl FixedViewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

impl Default for FixedViewport {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            offset: Point::default(),
            zoom: 1.0,
        }
    }
}

impl Viewport for FixedViewport {
    fn dimensions(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    fn to_content_coords(&self, viewport_point: Point) -> Point {
        let zoom = if self.zoom != 0.0 { self.zoom } else { 1.0 };
        Point::new(
            self.offset.x + viewport_point.x / zoom,
            self.offset.y + viewport_point.y / zoom,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub node: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
}

/// Owned, string-keyed graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryGraph {
    pub nodes: Vec<Node>,
    pub ports: Vec<Port>,
    pub edges: Vec<Edge>,
    #[serde(skip)]
    index: Option<GraphIndex>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct GraphIndex {
    nodes: IndexMap<String, usize>,
    ports: IndexMap<String, usize>,
    edges: IndexMap<String, usize>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: impl Into<String>, position: NodePosition) -> &mut Self {
        self.nodes.push(Node {
            id: id.into(),
            x: position.x,
            y: position.y,
        });
        self.index = None;
        self
    }

    pub fn add_port(&mut self, id: impl Into<String>, node: impl Into<String>) -> &mut Self {
        self.ports.push(Port {
            id: id.into(),
            node: node.into(),
        });
        self.index = None;
        self
    }

    pub fn add_edge(
        &mut self,
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> &mut Self {
        self.edges.push(Edge {
            id: id.into(),
            from: from.into(),
            to: to.into(),
        });
        self.index = None;
        self
    }

    /// Adds an edge between two nodes through fresh ports named `{edge}:from` / `{edge}:to`.
    pub fn connect(
        &mut self,
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> &mut Self {
        let id = id.into();
        let from = format!("{id}:from");
        let to = format!("{id}:to");
        self.add_port(from.clone(), source);
        self.add_port(to.clone(), target);
        self.add_edge(id, from, to)
    }

    /// Builds the id lookup tables. Lookups fall back to a linear scan until this is called, and
    /// whenever direct edits to `nodes`, `ports` or `edges` have left a table out of date.
    pub fn reindex(&mut self) -> &mut Self {
        let mut index = GraphIndex::default();
        for (i, n) in self.nodes.iter().enumerate() {
            index.nodes.entry(n.id.clone()).or_insert(i);
        }
        for (i, p) in self.ports.iter().enumerate() {
            index.ports.entry(p.id.clone()).or_insert(i);
        }
        for (i, e) in self.edges.iter().enumerate() {
            index.edges.entry(e.id.clone()).or_insert(i);
        }
        self.index = Some(index);
        self
    }

    /// Checks that ids are unique and that every edge resolves to two existing nodes.
    pub fn validate(&self) -> Result<()> {
        let mut nodes: rustc_hash::FxHashSet<&str> = rustc_hash::FxHashSet::default();
        for n in &self.nodes {
            if !nodes.insert(n.id.as_str()) {
                return Err(Error::DuplicateId {
                    kind: "node",
                    id: n.id.clone(),
                });
            }
        }
        let mut ports: rustc_hash::FxHashMap<&str, &str> = rustc_hash::FxHashMap::default();
        for p in &self.ports {
            if ports.insert(p.id.as_str(), p.node.as_str()).is_some() {
                return Err(Error::DuplicateId {
                    kind: "port",
                    id: p.id.clone(),
                });
            }
        }
        let mut edges: rustc_hash::FxHashSet<&str> = rustc_hash::FxHashSet::default();
        for e in &self.edges {
            if !edges.insert(e.id.as_str()) {
                return Err(Error::DuplicateId {
                    kind: "edge",
                    id: e.id.clone(),
                });
            }
            for port_id in [e.from.as_str(), e.to.as_str()] {
                let Some(&node_id) = ports.get(port_id) else {
                    return Err(Error::MissingPort {
                        edge_id: e.id.clone(),
                        port_id: port_id.to_string(),
                    });
                };
                if !nodes.contains(node_id) {
                    return Err(Error::MissingNode {
                        port_id: port_id.to_string(),
                        node_id: node_id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Copies computed coordinates back onto the stored nodes.
    pub fn apply_positions<'a>(
        &mut self,
        positions: impl IntoIterator<Item = (&'a String, &'a Point)>,
    ) {
        let lookup: rustc_hash::FxHashMap<&str, Point> = positions
            .into_iter()
            .map(|(id, p)| (id.as_str(), *p))
            .collect();
        for n in &mut self.nodes {
            if let Some(p) = lookup.get(n.id.as_str()) {
                n.x = Some(p.x);
                n.y = Some(p.y);
            }
        }
    }

    // The fields are public, so a cached slot may be stale: a hit is only trusted if its id
    // still matches, otherwise the lookup falls back to a scan.
    fn find_node(&self, id: &str) -> Option<&Node> {
        self.index
            .as_ref()
            .and_then(|index| index.nodes.get(id))
            .and_then(|&i| self.nodes.get(i))
            .filter(|n| n.id == id)
            .or_else(|| self.nodes.iter().find(|n| n.id == id))
    }

    fn find_port(&self, id: &str) -> Option<&Port> {
        self.index
            .as_ref()
            .and_then(|index| index.ports.get(id))
            .and_then(|&i| self.ports.get(i))
            .filter(|p| p.id == id)
            .or_else(|| self.ports.iter().find(|p| p.id == id))
    }

    fn find_edge(&self, id: &str) -> Option<&Edge> {
        self.index
            .as_ref()
            .and_then(|index| index.edges.get(id))
            .and_then(|&i| self.edges.get(i))
            .filter(|e| e.id == id)
            .or_else(|| self.edges.iter().find(|e| e.id == id))
    }
}

impl Graph for MemoryGraph {
    type NodeId = String;
    type EdgeId = String;
    type PortId = String;

    fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    fn node(&self, id: &String) -> Option<NodePosition> {
        self.find_node(id).map(|n| NodePosition { x: n.x, y: n.y })
    }

    fn edge_ids(&self) -> Vec<String> {
        self.edges.iter().map(|e| e.id.clone()).collect()
    }

    fn edge(&self, id: &String) -> Option<EdgePorts<String>> {
        self.find_edge(id).map(|e| EdgePorts {
            from: e.from.clone(),
            to: e.to.clone(),
        })
    }

    fn port(&self, id: &String) -> Option<String> {
        self.find_port(id).map(|p| p.node.clone())
    }
}
