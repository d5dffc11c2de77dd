use std::collections::HashMap;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, SvgTextContentElement};

use super::geometry::NodeShape;
use super::state::GraphEditor;
use super::text_wrap::{TextMeasure, WrapOutcome, WrappedText};
use super::types::{Node, NodeId};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

fn create(document: &Document, tag: &str) -> Result<Element, JsValue> {
	document.create_element_ns(Some(SVG_NS), tag)
}

/// Measures strings with a hidden `<text>` element, so widths match the
/// fonts the browser actually uses.
pub struct SvgTextMeasure {
	probe: SvgTextContentElement,
}

impl SvgTextMeasure {
	pub fn new(document: &Document, svg: &Element) -> Result<Self, JsValue> {
		let probe = create(document, "text")?;
		probe.set_attribute("class", "node-text")?;
		probe.set_attribute("visibility", "hidden")?;
		svg.append_child(&probe)?;
		let probe = probe.dyn_into::<SvgTextContentElement>().map_err(JsValue::from)?;
		Ok(Self { probe })
	}
}

impl TextMeasure for SvgTextMeasure {
	fn measure_width(&self, text: &str) -> f64 {
		self.probe.set_text_content(Some(text));
		self.probe.get_computed_text_length() as f64
	}
}

struct NodeElements {
	group: Element,
	shape: Element,
	text: Element,
}

/// Retained SVG tree of one editor. Node groups are keyed by id and kept
/// across renders; edges are rebuilt on every full render.
pub struct SvgScene {
	document: Document,
	viewport: Element,
	edge_layer: Element,
	node_layer: Element,
	nodes: HashMap<NodeId, NodeElements>,
	edges: Vec<Element>,
}

impl SvgScene {
	pub fn new(svg: &Element, marker_size: f64) -> Result<Self, JsValue> {
		let document = svg
			.owner_document()
			.ok_or_else(|| JsValue::from_str("svg element is not attached to a document"))?;

		let defs = create(&document, "defs")?;
		let marker = create(&document, "marker")?;
		for (name, value) in [
			("id", String::from("arrow")),
			("viewBox", String::from("0 0 10 10")),
			("refX", String::from("10")),
			("refY", String::from("5")),
			("markerWidth", marker_size.to_string()),
			("markerHeight", marker_size.to_string()),
			("orient", String::from("auto-start-reverse")),
		] {
			marker.set_attribute(name, &value)?;
		}
		let tip = create(&document, "path")?;
		tip.set_attribute("d", "M 0 0 L 10 5 L 0 10 z")?;
		marker.append_child(&tip)?;
		defs.append_child(&marker)?;
		svg.append_child(&defs)?;

		let viewport = create(&document, "g")?;
		let edge_layer = create(&document, "g")?;
		let node_layer = create(&document, "g")?;
		edge_layer.set_attribute("class", "edges")?;
		node_layer.set_attribute("class", "nodes")?;
		viewport.append_child(&edge_layer)?;
		viewport.append_child(&node_layer)?;
		svg.append_child(&viewport)?;

		Ok(Self {
			document,
			viewport,
			edge_layer,
			node_layer,
			nodes: HashMap::new(),
			edges: Vec::new(),
		})
	}

	pub fn apply_view(&self, editor: &GraphEditor) -> Result<(), JsValue> {
		let t = &editor.transform;
		self.viewport.set_attribute(
			"transform",
			&format!("translate({} {}) scale({})", t.x, t.y, t.k),
		)
	}

	/// Rebuilds everything that depends on group structure or templates.
	pub fn render(&mut self, editor: &mut GraphEditor, measure: &dyn TextMeasure) -> Result<(), JsValue> {
		let ids: Vec<NodeId> = editor
			.graph
			.nodes()
			.filter(|n| !n.is_placeholder())
			.map(|n| n.id.clone())
			.collect();

		let stale: Vec<NodeId> = self
			.nodes
			.keys()
			.filter(|id| !editor.graph.contains(id.as_str()))
			.cloned()
			.collect();
		for id in stale {
			if let Some(elements) = self.nodes.remove(&id) {
				elements.group.remove();
			}
		}

		for id in &ids {
			let Some(node) = editor.graph.node(id.as_str()) else {
				continue;
			};
			let shape = editor
				.config
				.template_for(node)
				.map(|t| t.shape.clone())
				.unwrap_or_default();
			let fresh = !self.nodes.contains_key(id);
			if fresh {
				let elements = self.create_node(node)?;
				self.nodes.insert(id.clone(), elements);
			}
			if let Some(elements) = self.nodes.get_mut(id) {
				let replacement = shape_element(&self.document, node, &shape)?;
				elements.group.replace_child(&replacement, &elements.shape)?;
				elements.shape = replacement;
				place(&elements.group, node)?;
				// Appending again keeps DOM order equal to render order.
				self.node_layer.append_child(&elements.group)?;
			}

			match editor.layout_text(id, measure, fresh) {
				Some(WrapOutcome::Wrapped(wrapped)) => {
					if let Some(elements) = self.nodes.get(id) {
						write_text(&self.document, &elements.text, &wrapped)?;
					}
				}
				Some(WrapOutcome::Unchanged) => {}
				None => {
					if let Some(elements) = self.nodes.get(id) {
						elements.text.set_text_content(None);
					}
				}
			}
		}

		self.edge_layer.set_text_content(None);
		self.edges.clear();
		for edge in editor.graph.edges() {
			let line = create(&self.document, "line")?;
			line.set_attribute("class", &format!("edge edge-{}", edge.edge_type))?;
			if let Some(marker) = &edge.marker_end {
				line.set_attribute("marker-end", &format!("url(#{marker})"))?;
			}
			self.edge_layer.append_child(&line)?;
			self.edges.push(line);
		}

		self.update_positions(editor)
	}

	/// Cheap update after a drag step that changed positions only.
	pub fn update_positions(&self, editor: &GraphEditor) -> Result<(), JsValue> {
		self.apply_view(editor)?;
		for (id, elements) in &self.nodes {
			if let Some(node) = editor.graph.node(id.as_str()) {
				place(&elements.group, node)?;
			}
		}
		for (edge, line) in editor.graph.edges().iter().zip(&self.edges) {
			let Some((start, end)) = editor.edge_points(edge) else {
				line.set_attribute("visibility", "hidden")?;
				continue;
			};
			line.remove_attribute("visibility")?;
			line.set_attribute("x1", &start.x.to_string())?;
			line.set_attribute("y1", &start.y.to_string())?;
			line.set_attribute("x2", &end.x.to_string())?;
			line.set_attribute("y2", &end.y.to_string())?;
		}
		Ok(())
	}

	fn create_node(&self, node: &Node) -> Result<NodeElements, JsValue> {
		let group = create(&self.document, "g")?;
		group.set_attribute("class", &format!("node node-{}", node.node_type))?;
		group.set_attribute("data-id", node.id.as_str())?;
		let shape = create(&self.document, "rect")?;
		let text = create(&self.document, "text")?;
		text.set_attribute("class", "node-text")?;
		text.set_attribute("text-anchor", "middle")?;
		group.append_child(&shape)?;
		group.append_child(&text)?;
		Ok(NodeElements { group, shape, text })
	}
}

fn place(group: &Element, node: &Node) -> Result<(), JsValue> {
	group.set_attribute("transform", &format!("translate({} {})", node.x, node.y))
}

fn shape_element(document: &Document, node: &Node, shape: &NodeShape) -> Result<Element, JsValue> {
	let element = match shape {
		NodeShape::Rect { width, height } => {
			let rect = create(document, "rect")?;
			rect.set_attribute("x", &(-width / 2.0).to_string())?;
			rect.set_attribute("y", &(-height / 2.0).to_string())?;
			rect.set_attribute("width", &width.to_string())?;
			rect.set_attribute("height", &height.to_string())?;
			rect
		}
		NodeShape::Circle { radius } => {
			let circle = create(document, "circle")?;
			circle.set_attribute("r", &radius.to_string())?;
			circle
		}
		NodeShape::Path { points } => {
			let polygon = create(document, "polygon")?;
			let points: Vec<String> = points.iter().map(|p| format!("{},{}", p.x, p.y)).collect();
			polygon.set_attribute("points", &points.join(" "))?;
			polygon
		}
	};
	element.set_attribute("class", &format!("node-shape node-shape-{}", node.node_type))?;
	Ok(element)
}

fn write_text(document: &Document, text: &Element, wrapped: &WrappedText) -> Result<(), JsValue> {
	text.set_text_content(None);
	match wrapped.transform() {
		Some(transform) => text.set_attribute("transform", &transform)?,
		None => text.remove_attribute("transform")?,
	}
	for line in &wrapped.lines {
		let tspan = create(document, "tspan")?;
		tspan.set_attribute("x", &line.x.to_string())?;
		tspan.set_attribute("y", &line.y.to_string())?;
		tspan.set_text_content(Some(&line.text));
		text.append_child(&tspan)?;
	}
	Ok(())
}
