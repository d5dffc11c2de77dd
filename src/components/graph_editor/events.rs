use super::types::{Node, NodeId, Point};

/// What triggered a change. Informational only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventSource {
	#[default]
	Internal,
	Api,
	UserInteraction,
}

/// Notifications emitted by grouping and movement. None of them is cancelable.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
	NodeJoinedGroup {
		parent: NodeId,
		child: NodeId,
		parent_node: Option<Node>,
		child_node: Option<Node>,
		source: EventSource,
	},
	NodeLeftGroup {
		parent: NodeId,
		child: NodeId,
		parent_node: Option<Node>,
		child_node: Option<Node>,
		source: EventSource,
	},
	TreeDepthChanged {
		node: NodeId,
		old_depth: usize,
		new_depth: usize,
		source: EventSource,
	},
	TreeChanged {
		node: NodeId,
		old_parent: Option<NodeId>,
		new_parent: Option<NodeId>,
		source: EventSource,
	},
	NodePositionChanged {
		node: NodeId,
		position: Point,
		source: EventSource,
	},
	NodeMoveStart {
		node: NodeId,
		source: EventSource,
	},
	NodeMoveEnd {
		node: NodeId,
		source: EventSource,
	},
}

/// Receiver for [`GraphEvent`]s; fire and forget.
pub trait EventSink {
	fn emit(&mut self, event: GraphEvent);
}

impl EventSink for Vec<GraphEvent> {
	fn emit(&mut self, event: GraphEvent) {
		self.push(event);
	}
}

/// Sink that drops everything, for callers not interested in events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEvents;

impl EventSink for NoEvents {
	fn emit(&mut self, _event: GraphEvent) {}
}
