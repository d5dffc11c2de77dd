use std::rc::Rc;

use log::{debug, info};

use super::behaviour::GroupBehaviour;
use super::config::EditorConfig;
use super::error::HookError;
use super::events::{EventSink, EventSource, GraphEvent};
use super::geometry::{LinkHandle, nearest_handle};
use super::grouping::{GroupingManager, Membership};
use super::movement::{BeforeMove, NodeMovementInformation};
use super::text_wrap::{TextMeasure, TextWrapper, WrapOutcome};
use super::types::{Edge, Graph, GraphData, Node, NodeId, Point, Rect};

/// Consumer veto point called before every drag gesture.
pub type BeforeNodeMoveHook =
	Rc<dyn Fn(&NodeMovementInformation, &Graph) -> Result<BeforeMove, HookError>>;

#[derive(Clone, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

/// Everything one editor instance owns: nodes, group structure, view and
/// pending events.
pub struct GraphEditor {
	pub graph: Graph,
	pub grouping: GroupingManager,
	pub config: EditorConfig,
	pub transform: ViewTransform,
	pub on_before_node_move: Option<BeforeNodeMoveHook>,
	pub width: f64,
	pub height: f64,
	pub(super) events: Vec<GraphEvent>,
	text: TextWrapper,
}

impl GraphEditor {
	pub fn new(data: GraphData, config: EditorConfig, width: f64, height: f64) -> Self {
		let graph = Graph::from(data);
		info!(
			"graph editor created with {} nodes and {} edges",
			graph.node_count(),
			graph.edges().len()
		);
		Self {
			graph,
			grouping: GroupingManager::new(),
			config,
			transform: ViewTransform::default(),
			on_before_node_move: None,
			width,
			height,
			events: Vec::new(),
			text: TextWrapper::new(),
		}
	}

	/// Drains the events emitted since the last call, oldest first.
	pub fn take_events(&mut self) -> Vec<GraphEvent> {
		std::mem::take(&mut self.events)
	}

	pub(super) fn emit(&mut self, event: GraphEvent) {
		self.events.emit(event);
	}

	// --- coordinates and hit testing ---

	pub fn graph_point_to_client_point(&self, p: Point) -> Point {
		Point::new(
			p.x * self.transform.k + self.transform.x,
			p.y * self.transform.k + self.transform.y,
		)
	}

	pub fn client_point_to_graph_point(&self, p: Point) -> Point {
		Point::new(
			(p.x - self.transform.x) / self.transform.k,
			(p.y - self.transform.y) / self.transform.k,
		)
	}

	/// Ids of the nodes rendered under a client point, topmost first.
	pub fn nodes_under_point(&self, client: Point) -> Vec<NodeId> {
		let p = self.client_point_to_graph_point(client);
		self.graph
			.nodes()
			.rev()
			.filter(|node| !node.is_placeholder())
			.filter(|node| {
				self.config
					.template_for(node)
					.is_some_and(|t| t.shape.contains(p - node.position()))
			})
			.map(|node| node.id.clone())
			.collect()
	}

	pub fn node_at_position(&self, client: Point) -> Option<NodeId> {
		self.nodes_under_point(client).into_iter().next()
	}

	/// Absolute box of a drop zone of `group`'s template.
	pub fn drop_zone_bbox(&self, group: &NodeId, zone: &str) -> Option<Rect> {
		let node = self.graph.node(group.as_str())?;
		self.config.drop_zone_bbox(node, zone)
	}

	pub fn link_handles(&self, node: &Node) -> Vec<LinkHandle> {
		self.config
			.template_for(node)
			.map(|t| t.shape.link_handles())
			.unwrap_or_default()
	}

	/// Start and end point of an edge, using the handles facing each other.
	pub fn edge_points(&self, edge: &Edge) -> Option<(Point, Point)> {
		let source = self.graph.node(edge.source.as_str())?;
		let target = self.graph.node(edge.target.as_str())?;
		let start = nearest_handle(&self.link_handles(source), source.position(), target.position())
			.map_or(source.position(), |h| source.position() + h.position());
		let end = nearest_handle(&self.link_handles(target), target.position(), start)
			.map_or(target.position(), |h| target.position() + h.position());
		Some((start, end))
	}

	// --- view ---

	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.transform.x += dx;
		self.transform.y += dy;
	}

	/// Zooms by `factor` keeping the client point `at` fixed.
	pub fn zoom_at(&mut self, at: Point, factor: f64) {
		let new_k = (self.transform.k * factor).clamp(self.config.zoom_min, self.config.zoom_max);
		let ratio = new_k / self.transform.k;
		self.transform.x = at.x - (at.x - self.transform.x) * ratio;
		self.transform.y = at.y - (at.y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	// --- nodes and groups ---

	pub fn add_node(&mut self, node: Node) {
		self.graph.add_node(node);
	}

	/// Removes the node and its edges. Group membership is keyed by id and
	/// outlives the node; use [`Self::clear_groups_of`] to drop it too.
	pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
		self.text.forget(id.as_str());
		self.graph.remove_node(id.as_str())
	}

	/// Drops every group membership and the behaviour of `id`.
	pub fn clear_groups_of(&mut self, id: &NodeId, source: EventSource) {
		self.grouping
			.clear_node(&self.graph, &mut self.events, id, source);
	}

	pub fn set_group_behaviour_of(&mut self, id: impl Into<NodeId>, behaviour: GroupBehaviour) {
		self.grouping.set_group_behaviour_of(id, behaviour);
	}

	pub fn mark_as_tree_root(&mut self, id: &NodeId) -> bool {
		self.grouping.mark_as_tree_root(id)
	}

	pub fn add_node_to_group(
		&mut self,
		parent: &NodeId,
		child: &NodeId,
		position: Option<Point>,
		source: EventSource,
	) -> Membership {
		self.grouping
			.add_node_to_group(&self.graph, &mut self.events, parent, child, position, source)
	}

	pub fn remove_node_from_group(
		&mut self,
		parent: &NodeId,
		child: &NodeId,
		source: EventSource,
	) -> Membership {
		self.grouping
			.remove_node_from_group(&self.graph, &mut self.events, parent, child, source)
	}

	pub fn join_tree_of_parent(&mut self, child: &NodeId, parent: &NodeId, source: EventSource) -> bool {
		self.grouping
			.join_tree_of_parent(&mut self.events, child, parent, source)
	}

	// --- edges ---

	/// Endpoints a new edge `source -> target` really attaches to once groups
	/// capturing either end and their delegates had their say.
	pub fn resolve_edge_endpoints(&self, source: &NodeId, target: &NodeId) -> Edge {
		let mut edge = Edge::new(source, target);

		let source_group = self
			.grouping
			.get_group_capturing_outgoing_edge(&self.graph, source);
		if &source_group != source {
			edge.source = self
				.grouping
				.delegate_outgoing_edge_source(&self.graph, &source_group, &edge)
				.unwrap_or(source_group);
		}

		let target_group = self
			.grouping
			.get_group_capturing_incoming_edge(&self.graph, target);
		if &target_group != target {
			edge.target = self
				.grouping
				.delegate_incoming_edge_target(&self.graph, &target_group, &edge)
				.unwrap_or(target_group);
		}
		debug!("edge {source} -> {target} resolved to {} -> {}", edge.source, edge.target);
		edge
	}

	/// Adds an edge between the resolved endpoints and returns it.
	pub fn create_edge(&mut self, source: &NodeId, target: &NodeId) -> Edge {
		let edge = self.resolve_edge_endpoints(source, target);
		self.graph.add_edge(edge.clone());
		edge
	}

	// --- text ---

	/// Wraps the text of `id` per its template. `None` when the node has no
	/// text to show.
	pub fn layout_text(
		&mut self,
		id: &NodeId,
		measure: &dyn TextMeasure,
		force: bool,
	) -> Option<WrapOutcome> {
		let node = self.graph.node(id.as_str())?;
		let spec = self.config.template_for(node)?.text.as_ref()?.spec_for(node)?;
		Some(self.text.wrap(id.as_str(), &spec, measure, force))
	}
}
