use std::rc::Rc;

use svg_graph_editor::components::graph_editor::config::NodeTemplate;
use svg_graph_editor::components::graph_editor::error::HookError;
use svg_graph_editor::components::graph_editor::geometry::NodeShape;
use svg_graph_editor::components::graph_editor::{
	BeforeMove, EditorConfig, EventSource, Graph, GraphData, GraphEditor, GraphEvent,
	GroupBehaviour, HookContext, Node, NodeId, NodeMovementInformation, Point, RenderRequest,
};

fn id(s: &str) -> NodeId {
	NodeId::from(s)
}

fn config() -> EditorConfig {
	let mut config = EditorConfig::default();
	config.templates.insert(
		String::from("lane"),
		NodeTemplate {
			shape: NodeShape::Rect {
				width: 300.0,
				height: 200.0,
			},
			..NodeTemplate::default()
		},
	);
	config
}

fn board() -> GraphEditor {
	let nodes = vec![
		Node::new("todo", 0.0, 0.0).with_type("lane"),
		Node::new("done", 600.0, 0.0).with_type("lane"),
		Node::new("card", 40.0, 0.0),
		Node::new("note", 80.0, 40.0),
	];
	let mut editor = GraphEditor::new(GraphData { nodes, edges: Vec::new() }, config(), 1200.0, 800.0);
	let lane = GroupBehaviour {
		move_children_along_group: true,
		capture_dragged_nodes: true,
		allow_dragged_nodes_leaving_group: true,
		allow_free_positioning: true,
		..GroupBehaviour::default()
	};
	editor.set_group_behaviour_of("todo", lane.clone());
	editor.set_group_behaviour_of("done", lane);
	editor.mark_as_tree_root(&id("todo"));
	editor.mark_as_tree_root(&id("done"));
	for child in ["card", "note"] {
		editor.add_node_to_group(&id("todo"), &id(child), None, EventSource::Api);
		editor.join_tree_of_parent(&id(child), &id("todo"), EventSource::Api);
	}
	editor.take_events();
	editor
}

fn position(editor: &GraphEditor, node: &str) -> Point {
	editor.graph.node(node).map(Node::position).expect("node exists")
}

#[test]
fn moving_a_card_between_lanes() {
	let mut editor = board();
	let mut info = editor.drag_start(&id("card"), 40.0, 0.0).expect("not vetoed");

	// Still inside "todo": nothing structural happens.
	assert_eq!(editor.drag(&mut info, 100.0, 50.0), RenderRequest::PositionOnly);
	// Over "done": leave "todo", then join "done" in the same step.
	assert_eq!(editor.drag(&mut info, 620.0, 10.0), RenderRequest::Full);
	assert_eq!(editor.drag_end(info), RenderRequest::PositionOnly);

	assert_eq!(editor.grouping.get_tree_parent_of(&id("card")), Some(&id("done")));
	assert!(editor.grouping.get_parents_of(&id("card")).contains(&id("done")));
	assert!(!editor.grouping.get_parents_of(&id("card")).contains(&id("todo")));
	assert_eq!(editor.grouping.get_tree_root_of(&id("card")), Some(&id("done")));
	assert_eq!(position(&editor, "card"), Point::new(620.0, 10.0));

	let structural: Vec<String> = editor
		.take_events()
		.into_iter()
		.filter_map(|e| match e {
			GraphEvent::NodeLeftGroup { parent, child, .. } => Some(format!("{child} left {parent}")),
			GraphEvent::NodeJoinedGroup { parent, child, .. } => {
				Some(format!("{child} joined {parent}"))
			}
			_ => None,
		})
		.collect();
	assert_eq!(structural, ["card left todo", "card joined done"]);
}

#[test]
fn dragging_a_lane_carries_its_cards() {
	let mut editor = board();
	let mut info = editor.drag_start(&id("todo"), 0.0, 0.0).expect("not vetoed");
	assert_eq!(
		info.children.as_ref().map(|c| c.len()),
		Some(2),
		"both cards travel with the lane"
	);
	editor.drag(&mut info, 0.0, 300.0);
	editor.drag_end(info);

	assert_eq!(position(&editor, "todo"), Point::new(0.0, 300.0));
	assert_eq!(position(&editor, "card"), Point::new(40.0, 300.0));
	assert_eq!(position(&editor, "note"), Point::new(80.0, 340.0));
	assert_eq!(editor.grouping.get_tree_parent_of(&id("card")), Some(&id("todo")));
}

#[test]
fn captured_cards_drag_their_lane() {
	let mut editor = board();
	let mut todo = editor.grouping.get_group_behaviour_of(&id("todo"));
	todo.capture_child_movement_for = Some(Rc::new(
		|ctx: &HookContext<'_>| -> Result<bool, HookError> { Ok(ctx.child_id.as_str() == "note") },
	));
	editor.set_group_behaviour_of("todo", todo);

	let info = editor.drag_start(&id("note"), 80.0, 40.0).expect("not vetoed");
	assert_eq!(info.node.id, id("todo"));
	assert_eq!(info.grabbed, id("note"));
	assert_eq!(info.offset, Point::new(80.0, 40.0));
	editor.drag_end(info);

	let info = editor.drag_start(&id("card"), 40.0, 0.0).expect("not vetoed");
	assert_eq!(info.node.id, id("card"));
}

#[test]
fn vetoed_gestures_change_nothing() {
	let mut editor = board();
	editor.on_before_node_move = Some(Rc::new(
		|info: &NodeMovementInformation, _: &Graph| -> Result<BeforeMove, HookError> {
			Ok(if info.grabbed.as_str() == "card" {
				BeforeMove::Veto
			} else {
				BeforeMove::Proceed
			})
		},
	));
	assert!(editor.drag_start(&id("card"), 40.0, 0.0).is_none());
	assert!(editor.take_events().is_empty());
	assert!(editor.drag_start(&id("note"), 80.0, 40.0).is_some());
}

#[test]
fn depth_follows_nested_lanes() {
	let mut editor = board();
	let mut info = editor.drag_start(&id("todo"), 0.0, 0.0).expect("not vetoed");
	// Drop the whole lane onto the other one.
	editor.drag(&mut info, 600.0, 0.0);
	editor.drag_end(info);

	assert_eq!(editor.grouping.get_tree_parent_of(&id("todo")), Some(&id("done")));
	assert_eq!(editor.grouping.get_tree_depth_of(&id("todo")), 1);
	assert_eq!(editor.grouping.get_tree_depth_of(&id("card")), 2);
	assert_eq!(editor.grouping.get_tree_root_of(&id("note")), Some(&id("done")));

	// "done" may not now be dropped into its own descendant.
	let mut info = editor.drag_start(&id("done"), 600.0, 0.0).expect("not vetoed");
	editor.drag(&mut info, 640.0, 0.0);
	assert!(editor.grouping.get_parents_of(&id("done")).is_empty());
}

#[test]
fn dropping_onto_a_card_joins_its_lane() {
	let mut editor = board();
	editor.add_node(Node::new("new", 900.0, 600.0));
	let mut info = editor.drag_start(&id("new"), 900.0, 600.0).expect("not vetoed");

	// "card" is drawn above "todo" and captures nothing itself.
	assert_eq!(editor.nodes_under_point(Point::new(40.0, 0.0))[0], id("card"));
	assert_eq!(editor.drag(&mut info, 40.0, 0.0), RenderRequest::Full);
	editor.drag_end(info);

	assert_eq!(editor.grouping.get_tree_parent_of(&id("new")), Some(&id("todo")));
	assert!(editor.grouping.get_parents_of(&id("new")).contains(&id("todo")));
	assert!(!editor.grouping.get_parents_of(&id("new")).contains(&id("card")));
}
