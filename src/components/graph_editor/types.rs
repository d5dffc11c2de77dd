use std::borrow::Borrow;
use std::fmt;
use std::ops::{Add, Sub};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Node type used for movement placeholders of groups that are not rendered.
pub const DUMMY_NODE_TYPE: &str = "dummy";

/// Identity of a node or group. Integer ids are kept in their string form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Borrow<str> for NodeId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<&str> for NodeId {
	fn from(id: &str) -> Self {
		Self(id.to_owned())
	}
}

impl From<String> for NodeId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<&NodeId> for NodeId {
	fn from(id: &NodeId) -> Self {
		id.clone()
	}
}

macro_rules! node_id_from_int {
	($($t:ty),*) => {
		$(impl From<$t> for NodeId {
			fn from(id: $t) -> Self {
				Self(id.to_string())
			}
		})*
	};
}

node_id_from_int!(i32, i64, u32, u64, usize);

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn length(self) -> f64 {
		(self.x * self.x + self.y * self.y).sqrt()
	}

	pub fn distance(self, other: Point) -> f64 {
		(self - other).length()
	}
}

impl Add for Point {
	type Output = Point;

	fn add(self, rhs: Point) -> Point {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl Sub for Point {
	type Output = Point;

	fn sub(self, rhs: Point) -> Point {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}

/// Axis aligned box; `x`/`y` is the top left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Rect {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
		Self {
			x,
			y,
			width,
			height,
		}
	}

	pub fn from_center(center: Point, width: f64, height: f64) -> Self {
		Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
	}

	pub fn center(&self) -> Point {
		Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
	}

	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
	}

	pub fn translate(&self, by: Point) -> Rect {
		Rect::new(self.x + by.x, self.y + by.y, self.width, self.height)
	}
}

/// A graph node. `x`/`y` is the visual centre.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: NodeId,
	pub x: f64,
	pub y: f64,
	pub node_type: String,
	pub dynamic_template: Option<String>,
	pub attributes: Map<String, Value>,
}

impl Node {
	pub fn new(id: impl Into<NodeId>, x: f64, y: f64) -> Self {
		Self {
			id: id.into(),
			x,
			y,
			node_type: String::from("default"),
			dynamic_template: None,
			attributes: Map::new(),
		}
	}

	/// Stand-in carrying a drag for a group id without a rendered node.
	pub fn placeholder(id: NodeId, at: Point) -> Self {
		let mut node = Self::new(id, at.x, at.y);
		node.node_type = DUMMY_NODE_TYPE.to_owned();
		node
	}

	pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
		self.node_type = node_type.into();
		self
	}

	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}

	pub fn is_placeholder(&self) -> bool {
		self.node_type == DUMMY_NODE_TYPE
	}

	pub fn position(&self) -> Point {
		Point::new(self.x, self.y)
	}

	pub fn set_position(&mut self, p: Point) {
		self.x = p.x;
		self.y = p.y;
	}

	/// Attribute rendered as text; numbers and booleans are stringified.
	pub fn attribute_text(&self, key: &str) -> Option<String> {
		match self.attributes.get(key)? {
			Value::String(s) => Some(s.clone()),
			Value::Null => None,
			other => Some(other.to_string()),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
	pub source: NodeId,
	pub target: NodeId,
	pub edge_type: String,
	pub marker_end: Option<String>,
}

impl Edge {
	pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			edge_type: String::from("default"),
			marker_end: Some(String::from("arrow")),
		}
	}
}

/// Plain node/edge lists handed to the component.
#[derive(Clone, Debug, Default)]
pub struct GraphData {
	pub nodes: Vec<Node>,
	pub edges: Vec<Edge>,
}

/// Node store in render order plus the edge list.
#[derive(Clone, Debug, Default)]
pub struct Graph {
	nodes: IndexMap<NodeId, Node>,
	edges: Vec<Edge>,
}

impl Graph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces a node, returning the replaced one.
	pub fn add_node(&mut self, node: Node) -> Option<Node> {
		self.nodes.insert(node.id.clone(), node)
	}

	/// Removes a node and every edge attached to it.
	pub fn remove_node(&mut self, id: &str) -> Option<Node> {
		let removed = self.nodes.shift_remove(id)?;
		self.edges
			.retain(|e| e.source.as_str() != id && e.target.as_str() != id);
		Some(removed)
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.get(id)
	}

	pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
		self.nodes.get_mut(id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.nodes.contains_key(id)
	}

	/// Nodes in render order (later nodes are drawn on top).
	pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> {
		self.nodes.values()
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn add_edge(&mut self, edge: Edge) {
		self.edges.push(edge);
	}

	pub fn remove_edge(&mut self, source: &str, target: &str) -> Option<Edge> {
		let idx = self
			.edges
			.iter()
			.position(|e| e.source.as_str() == source && e.target.as_str() == target)?;
		Some(self.edges.remove(idx))
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}
}

impl From<GraphData> for Graph {
	fn from(data: GraphData) -> Self {
		let mut graph = Graph::new();
		for node in data.nodes {
			graph.add_node(node);
		}
		for edge in data.edges {
			graph.add_edge(edge);
		}
		graph
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn integer_and_string_ids_share_one_key_space() {
		assert_eq!(NodeId::from(42), NodeId::from("42"));
		assert_eq!(NodeId::from(7usize).as_str(), "7");
	}

	#[test]
	fn removing_a_node_drops_attached_edges_and_keeps_order() {
		let mut graph = Graph::from(GraphData {
			nodes: vec![Node::new("a", 0.0, 0.0), Node::new("b", 1.0, 0.0), Node::new("c", 2.0, 0.0)],
			edges: vec![Edge::new("a", "b"), Edge::new("b", "c"), Edge::new("a", "c")],
		});
		assert!(graph.remove_node("b").is_some());
		let ids: Vec<_> = graph.nodes().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["a", "c"]);
		assert_eq!(graph.edges().len(), 1);
		assert!(graph.remove_node("b").is_none());
	}

	#[test]
	fn attribute_text_stringifies_scalars() {
		let node = Node::new(1, 0.0, 0.0)
			.with_attribute("title", "hello")
			.with_attribute("count", 3);
		assert_eq!(node.attribute_text("title").as_deref(), Some("hello"));
		assert_eq!(node.attribute_text("count").as_deref(), Some("3"));
		assert_eq!(node.attribute_text("missing"), None);
	}

	#[test]
	fn rect_center_and_contains() {
		let r = Rect::from_center(Point::new(10.0, 10.0), 4.0, 2.0);
		assert_eq!(r.center(), Point::new(10.0, 10.0));
		assert!(r.contains(Point::new(11.5, 10.5)));
		assert!(!r.contains(Point::new(12.5, 10.0)));
	}
}
