//! Link handles and node shape geometry. All coordinates here are relative to
//! the node centre unless a function says otherwise.

use std::f64::consts::PI;

use serde::Deserialize;

use super::types::{Point, Rect};

/// Attachment point for edges plus its outward unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkHandle {
	pub x: f64,
	pub y: f64,
	pub normal: Point,
}

impl LinkHandle {
	pub fn new(x: f64, y: f64, normal: Point) -> Self {
		Self { x, y, normal }
	}

	pub fn position(&self) -> Point {
		Point::new(self.x, self.y)
	}
}

/// Unit vector perpendicular to `a -> b`, rotated clockwise in screen space.
pub fn calculate_normal(a: Point, b: Point) -> Point {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len = (dx * dx + dy * dy).sqrt();
	if len < f64::EPSILON {
		return Point::default();
	}
	Point::new(dy / len, -dx / len)
}

/// Midpoints of the four sides, top first, clockwise.
pub fn rect_link_handles(width: f64, height: f64) -> Vec<LinkHandle> {
	let (hw, hh) = (width / 2.0, height / 2.0);
	vec![
		LinkHandle::new(0.0, -hh, Point::new(0.0, -1.0)),
		LinkHandle::new(hw, 0.0, Point::new(1.0, 0.0)),
		LinkHandle::new(0.0, hh, Point::new(0.0, 1.0)),
		LinkHandle::new(-hw, 0.0, Point::new(-1.0, 0.0)),
	]
}

/// `count` handles evenly spread over the circle, starting at the top.
pub fn circle_link_handles(radius: f64, count: usize) -> Vec<LinkHandle> {
	let count = count.max(1);
	(0..count)
		.map(|i| {
			let angle = -PI / 2.0 + (i as f64) * 2.0 * PI / count as f64;
			let normal = Point::new(angle.cos(), angle.sin());
			LinkHandle::new(normal.x * radius, normal.y * radius, normal)
		})
		.collect()
}

/// One handle per polygon side at its midpoint, normals facing away from the centroid.
pub fn path_link_handles(points: &[Point]) -> Vec<LinkHandle> {
	if points.len() < 2 {
		return points
			.iter()
			.map(|p| LinkHandle::new(p.x, p.y, Point::default()))
			.collect();
	}
	let centroid = centroid(points);
	let closing = if points.len() > 2 { points.len() } else { 1 };
	(0..closing)
		.map(|i| {
			let (a, b) = (points[i], points[(i + 1) % points.len()]);
			let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
			let mut normal = calculate_normal(a, b);
			let outward = mid - centroid;
			if normal.x * outward.x + normal.y * outward.y < 0.0 {
				normal = Point::new(-normal.x, -normal.y);
			}
			LinkHandle::new(mid.x, mid.y, normal)
		})
		.collect()
}

fn centroid(points: &[Point]) -> Point {
	let n = points.len().max(1) as f64;
	let sum = points.iter().fold(Point::default(), |acc, p| acc + *p);
	Point::new(sum.x / n, sum.y / n)
}

/// Handle whose absolute position (node centre + handle) is closest to `towards`.
pub fn nearest_handle(handles: &[LinkHandle], center: Point, towards: Point) -> Option<LinkHandle> {
	handles.iter().copied().min_by(|a, b| {
		let da = (center + a.position()).distance(towards);
		let db = (center + b.position()).distance(towards);
		da.total_cmp(&db)
	})
}

/// Outline of a node template.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeShape {
	Rect { width: f64, height: f64 },
	Circle { radius: f64 },
	Path { points: Vec<Point> },
}

impl Default for NodeShape {
	fn default() -> Self {
		NodeShape::Circle { radius: 10.0 }
	}
}

impl NodeShape {
	pub fn contains(&self, local: Point) -> bool {
		match self {
			NodeShape::Rect { width, height } => {
				Rect::from_center(Point::default(), *width, *height).contains(local)
			}
			NodeShape::Circle { radius } => local.length() <= *radius,
			NodeShape::Path { points } => polygon_contains(points, local),
		}
	}

	pub fn bbox(&self) -> Rect {
		match self {
			NodeShape::Rect { width, height } => Rect::from_center(Point::default(), *width, *height),
			NodeShape::Circle { radius } => {
				Rect::from_center(Point::default(), radius * 2.0, radius * 2.0)
			}
			NodeShape::Path { points } => {
				let Some(first) = points.first() else {
					return Rect::default();
				};
				let (mut min, mut max) = (*first, *first);
				for p in points {
					min = Point::new(min.x.min(p.x), min.y.min(p.y));
					max = Point::new(max.x.max(p.x), max.y.max(p.y));
				}
				Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
			}
		}
	}

	pub fn link_handles(&self) -> Vec<LinkHandle> {
		match self {
			NodeShape::Rect { width, height } => rect_link_handles(*width, *height),
			NodeShape::Circle { radius } => circle_link_handles(*radius, 8),
			NodeShape::Path { points } => path_link_handles(points),
		}
	}
}

fn polygon_contains(points: &[Point], p: Point) -> bool {
	if points.len() < 3 {
		return false;
	}
	let mut inside = false;
	let mut j = points.len() - 1;
	for i in 0..points.len() {
		let (a, b) = (points[i], points[j]);
		if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
			inside = !inside;
		}
		j = i;
	}
	inside
}
