//! Per-group capability record. Every capability defaults to disabled; an
//! optional `*_for` decision function overrides the plain flag per node.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::warn;

use super::error::HookError;
use super::types::{Edge, Graph, Node, NodeId, Point};

/// Arguments handed to group hooks and decision functions.
pub struct HookContext<'a> {
	pub group_id: &'a NodeId,
	pub child_id: &'a NodeId,
	pub group_node: Option<&'a Node>,
	pub child_node: Option<&'a Node>,
	pub graph: &'a Graph,
	/// Graph point the child was dropped at; only set for joins.
	pub position: Option<Point>,
}

impl<'a> HookContext<'a> {
	pub fn new(graph: &'a Graph, group_id: &'a NodeId, child_id: &'a NodeId) -> Self {
		Self {
			group_id,
			child_id,
			group_node: graph.node(group_id.as_str()),
			child_node: graph.node(child_id.as_str()),
			graph,
			position: None,
		}
	}

	pub fn with_position(mut self, position: Option<Point>) -> Self {
		self.position = position;
		self
	}
}

pub struct EdgeContext<'a> {
	pub group_id: &'a NodeId,
	pub group_node: Option<&'a Node>,
	pub edge: &'a Edge,
	pub graph: &'a Graph,
}

/// Yes/no answer for one group/child pair.
pub type Decision = Rc<dyn Fn(&HookContext<'_>) -> Result<bool, HookError>>;

/// Lifecycle callback; `Ok(true)` asks for a full re-render.
pub type GroupHook = Rc<dyn Fn(&HookContext<'_>) -> Result<bool, HookError>>;

/// Picks the node an edge end is moved to. The returned id is not checked.
pub type EdgeDelegate = Rc<dyn Fn(&EdgeContext<'_>) -> Result<NodeId, HookError>>;

/// Fixed position a group dictates for one of its children.
#[derive(Clone, Debug, PartialEq)]
pub enum ChildPosition {
	/// Offset from the group node's centre.
	Offset(Point),
	/// Centre of a named drop zone of the group's template.
	DropZone(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupHookKind {
	BeforeNodeMove,
	NodeMoveStart,
	NodeMoveEnd,
	NodeJoinedGroup,
	NodeLeftGroup,
}

#[derive(Clone, Default)]
pub struct GroupBehaviour {
	pub move_children_along_group: bool,
	pub capture_child_movement: bool,
	pub capture_child_movement_for: Option<Decision>,
	pub capture_dragged_nodes: bool,
	pub capture_dragged_nodes_for: Option<Decision>,
	pub allow_dragged_nodes_leaving_group: bool,
	pub allow_dragged_nodes_leaving_group_for: Option<Decision>,
	pub allow_free_positioning: bool,
	pub capture_outgoing_edges: bool,
	pub capture_outgoing_edges_for: Option<Decision>,
	pub capture_incoming_edges: bool,
	pub capture_incoming_edges_for: Option<Decision>,
	pub delegate_outgoing_edge_source_to_node: Option<EdgeDelegate>,
	pub delegate_incoming_edge_target_to_node: Option<EdgeDelegate>,
	pub child_node_positions: HashMap<NodeId, ChildPosition>,
	pub occupied_drop_zones: HashMap<String, NodeId>,
	pub before_node_move: Option<GroupHook>,
	pub on_node_move_start: Option<GroupHook>,
	pub on_node_move_end: Option<GroupHook>,
	pub after_node_joined_group: Option<GroupHook>,
	pub after_node_left_group: Option<GroupHook>,
}

impl fmt::Debug for GroupBehaviour {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GroupBehaviour")
			.field("move_children_along_group", &self.move_children_along_group)
			.field("capture_child_movement", &self.capture_child_movement)
			.field("capture_dragged_nodes", &self.capture_dragged_nodes)
			.field(
				"allow_dragged_nodes_leaving_group",
				&self.allow_dragged_nodes_leaving_group,
			)
			.field("allow_free_positioning", &self.allow_free_positioning)
			.field("capture_outgoing_edges", &self.capture_outgoing_edges)
			.field("capture_incoming_edges", &self.capture_incoming_edges)
			.field("child_node_positions", &self.child_node_positions)
			.field("occupied_drop_zones", &self.occupied_drop_zones)
			.finish_non_exhaustive()
	}
}

impl GroupBehaviour {
	pub fn hook(&self, kind: GroupHookKind) -> Option<&GroupHook> {
		match kind {
			GroupHookKind::BeforeNodeMove => self.before_node_move.as_ref(),
			GroupHookKind::NodeMoveStart => self.on_node_move_start.as_ref(),
			GroupHookKind::NodeMoveEnd => self.on_node_move_end.as_ref(),
			GroupHookKind::NodeJoinedGroup => self.after_node_joined_group.as_ref(),
			GroupHookKind::NodeLeftGroup => self.after_node_left_group.as_ref(),
		}
	}
}

/// Runs the decision function if present, falling back to `flag` when it
/// is absent or fails.
pub(super) fn decide(
	flag: bool,
	decision: Option<&Decision>,
	ctx: &HookContext<'_>,
	what: &str,
) -> bool {
	let Some(decision) = decision else {
		return flag;
	};
	match decision(ctx) {
		Ok(answer) => answer,
		Err(err) => {
			warn!(
				"{what} decision for group {} / node {} failed: {err}",
				ctx.group_id, ctx.child_id
			);
			flag
		}
	}
}

/// Runs a lifecycle hook; failures count as "no re-render requested".
pub(super) fn run_hook(hook: Option<&GroupHook>, ctx: &HookContext<'_>, kind: GroupHookKind) -> bool {
	let Some(hook) = hook else {
		return false;
	};
	match hook(ctx) {
		Ok(full_render) => full_render,
		Err(err) => {
			warn!(
				"{kind:?} hook of group {} for node {} failed: {err}",
				ctx.group_id, ctx.child_id
			);
			false
		}
	}
}
