//! Editor configuration. Every field has a default so partial JSON is fine.

use std::collections::HashMap;

use serde::Deserialize;

use super::error::ConfigError;
use super::geometry::NodeShape;
use super::text_wrap::{LineProfile, Overflow, TextWrapSpec, WordBreak};
use super::types::{Node, Point, Rect};

/// Named sub-region of a template, relative to the node centre.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropZone {
	pub id: String,
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl DropZone {
	pub fn bbox(&self) -> Rect {
		Rect::new(self.x, self.y, self.width, self.height)
	}
}

fn default_text_attribute() -> String {
	String::from("title")
}

fn default_line_height() -> f64 {
	16.0
}

/// How the text of a node type is laid out, in node-local coordinates.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextTemplate {
	#[serde(default = "default_text_attribute")]
	pub attribute: String,
	#[serde(default)]
	pub x: f64,
	#[serde(default)]
	pub y: f64,
	#[serde(default)]
	pub width: Option<f64>,
	#[serde(default)]
	pub height: Option<f64>,
	#[serde(default = "default_line_height")]
	pub line_height: f64,
	#[serde(default)]
	pub line_profiles: Vec<LineProfile>,
	#[serde(default)]
	pub center_y: Option<f64>,
	#[serde(default)]
	pub word_break: WordBreak,
	#[serde(default)]
	pub overflow: Overflow,
}

impl TextTemplate {
	/// Wrap input for `node`, or `None` if the node has no text attribute.
	pub fn spec_for(&self, node: &Node) -> Option<TextWrapSpec> {
		let content = node.attribute_text(&self.attribute)?;
		Some(TextWrapSpec {
			content,
			x: self.x,
			y: self.y,
			width: self.width,
			height: self.height,
			line_height: self.line_height,
			profiles: self.line_profiles.clone(),
			center_y: self.center_y,
			word_break: self.word_break,
			overflow: self.overflow,
		})
	}
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
	#[serde(default)]
	pub shape: NodeShape,
	#[serde(default)]
	pub drop_zones: Vec<DropZone>,
	#[serde(default)]
	pub text: Option<TextTemplate>,
}

impl NodeTemplate {
	pub fn drop_zone(&self, id: &str) -> Option<&DropZone> {
		self.drop_zones.iter().find(|z| z.id == id)
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
	pub templates: HashMap<String, NodeTemplate>,
	pub default_template: String,
	pub zoom_min: f64,
	pub zoom_max: f64,
	pub marker_size: f64,
}

impl Default for EditorConfig {
	fn default() -> Self {
		let default = NodeTemplate {
			shape: NodeShape::Circle { radius: 20.0 },
			drop_zones: Vec::new(),
			text: Some(TextTemplate {
				attribute: default_text_attribute(),
				x: 0.0,
				y: 0.0,
				width: Some(36.0),
				height: Some(36.0),
				line_height: 12.0,
				line_profiles: vec![
					LineProfile::new([30.0]),
					LineProfile::new([26.0, 36.0, 26.0]),
					LineProfile::new([26.0, 36.0, 26.0]).with_scale(0.75),
				],
				center_y: Some(0.0),
				word_break: WordBreak::Normal,
				overflow: Overflow::Ellipsis,
			}),
		};
		Self {
			templates: HashMap::from([(String::from("default"), default)]),
			default_template: String::from("default"),
			zoom_min: 0.1,
			zoom_max: 10.0,
			marker_size: 8.0,
		}
	}
}

impl EditorConfig {
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let config: EditorConfig = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if !(self.zoom_min > 0.0 && self.zoom_min <= self.zoom_max) {
			return Err(ConfigError::InvalidZoom {
				min: self.zoom_min,
				max: self.zoom_max,
			});
		}
		for (name, template) in &self.templates {
			let invalid = |reason: &str| ConfigError::InvalidTemplate {
				name: name.clone(),
				reason: reason.to_owned(),
			};
			let bbox = template.shape.bbox();
			if !(bbox.width > 0.0 && bbox.height > 0.0) {
				return Err(invalid("shape must have a positive size"));
			}
			if template
				.drop_zones
				.iter()
				.any(|z| !(z.width > 0.0 && z.height > 0.0))
			{
				return Err(invalid("drop zones must have a positive size"));
			}
			if let Some(text) = &template.text {
				if text.line_profiles.iter().any(|p| p.widths.is_empty()) {
					return Err(invalid("line profiles need at least one width"));
				}
				if text.line_height <= 0.0 {
					return Err(invalid("line height must be positive"));
				}
			}
		}
		Ok(())
	}

	/// Dynamic template first, then the node type, then the default template.
	pub fn template_for(&self, node: &Node) -> Option<&NodeTemplate> {
		node.dynamic_template
			.as_ref()
			.and_then(|name| self.templates.get(name))
			.or_else(|| self.templates.get(&node.node_type))
			.or_else(|| self.templates.get(&self.default_template))
	}

	/// Absolute drop zone box for a node rendered at `center`.
	pub fn drop_zone_bbox(&self, node: &Node, zone: &str) -> Option<Rect> {
		let template = self.template_for(node)?;
		let center = Point::new(node.x, node.y);
		template.drop_zone(zone).map(|z| z.bbox().translate(center))
	}
}
