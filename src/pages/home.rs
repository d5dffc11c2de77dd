use std::sync::Arc;

use leptos::prelude::*;
use log::warn;

use crate::components::graph_editor::{
	ChildPosition, Edge, EditorConfig, EditorSetup, EventSource, GraphData, GraphEditor,
	GraphEditorCanvas, GraphEvent, GroupBehaviour, Node, NodeId,
};

const SAMPLE_CONFIG: &str = r#"{
	"templates": {
		"group": {
			"shape": { "type": "rect", "width": 240, "height": 160 },
			"dropZones": [
				{ "id": "left", "x": -110, "y": -30, "width": 60, "height": 60 },
				{ "id": "right", "x": 50, "y": -30, "width": 60, "height": 60 }
			],
			"text": { "y": -64, "width": 220, "lineHeight": 16 }
		},
		"task": {
			"shape": { "type": "circle", "radius": 28 },
			"text": {
				"width": 48, "height": 48, "lineHeight": 12, "centerY": 0,
				"lineProfiles": [
					{ "widths": [40] },
					{ "widths": [34, 48, 34] },
					{ "widths": [34, 48, 34], "scale": 0.75 }
				]
			}
		}
	}
}"#;

/// Sample graph: a group with two slots, a free-form container and a few
/// loose tasks.
fn sample_data() -> GraphData {
	let task = |id: &str, x: f64, y: f64, title: &str| {
		Node::new(id, x, y).with_type("task").with_attribute("title", title)
	};
	GraphData {
		nodes: vec![
			Node::new("pipeline", 200.0, 200.0)
				.with_type("group")
				.with_attribute("title", "Pipeline with two fixed slots"),
			Node::new("backlog", 560.0, 200.0)
				.with_type("group")
				.with_attribute("title", "Backlog (drop tasks here)"),
			task("build", 120.0, 200.0, "Build"),
			task("deploy", 280.0, 200.0, "Deploy to staging"),
			task("review", 200.0, 420.0, "Review the pull request before merging"),
			task("docs", 380.0, 420.0, "Docs"),
		],
		edges: vec![
			Edge::new("build", "deploy"),
			Edge::new("review", "build"),
			Edge::new("docs", "backlog"),
		],
	}
}

fn sample_setup(editor: &mut GraphEditor) {
	let mut pipeline = GroupBehaviour {
		move_children_along_group: true,
		capture_outgoing_edges: true,
		..GroupBehaviour::default()
	};
	pipeline
		.child_node_positions
		.insert(NodeId::from("build"), ChildPosition::DropZone(String::from("left")));
	pipeline
		.child_node_positions
		.insert(NodeId::from("deploy"), ChildPosition::DropZone(String::from("right")));
	editor.set_group_behaviour_of("pipeline", pipeline);

	editor.set_group_behaviour_of(
		"backlog",
		GroupBehaviour {
			move_children_along_group: true,
			capture_dragged_nodes: true,
			allow_dragged_nodes_leaving_group: true,
			allow_free_positioning: true,
			..GroupBehaviour::default()
		},
	);

	let pipeline = NodeId::from("pipeline");
	editor.mark_as_tree_root(&pipeline);
	for (child, zone) in [("build", "left"), ("deploy", "right")] {
		let child = NodeId::from(child);
		editor.add_node_to_group(&pipeline, &child, None, EventSource::Api);
		editor.join_tree_of_parent(&child, &pipeline, EventSource::Api);
		editor.grouping.occupy_drop_zone(&pipeline, zone, &child);
	}
	editor.mark_as_tree_root(&NodeId::from("backlog"));
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let graph_data = Signal::derive(sample_data);
	let config = EditorConfig::from_json(SAMPLE_CONFIG).unwrap_or_else(|err| {
		warn!("sample config rejected, using defaults: {err}");
		EditorConfig::default()
	});
	let setup: EditorSetup = Arc::new(sample_setup);
	let (last_event, set_last_event) = signal(String::new());
	let on_event = move |event: GraphEvent| {
		let text = match event {
			GraphEvent::NodeJoinedGroup { parent, child, .. } => format!("{child} joined {parent}"),
			GraphEvent::NodeLeftGroup { parent, child, .. } => format!("{child} left {parent}"),
			GraphEvent::NodeMoveEnd { node, .. } => format!("{node} dropped"),
			_ => return,
		};
		set_last_event.set(text);
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<GraphEditorCanvas
					data=graph_data
					config=config
					setup=setup
					on_event=on_event
					fullscreen=true
				/>
				<div class="graph-overlay">
					<h1>"Graph Editor"</h1>
					<p class="subtitle">
						"Drag tasks into the backlog and out again. Scroll to zoom. Drag background to pan."
					</p>
					<p class="last-event">{move || last_event.get()}</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
