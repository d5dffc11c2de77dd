//! Multi-line wrapping for SVG `<text>`, which browsers never wrap themselves.
//!
//! Wrapping is greedy over word-boundary tokens measured by a [`TextMeasure`].
//! Several [`LineProfile`]s may be offered; the first one that places the
//! whole content wins, otherwise the last one (or, with a height budget, the
//! one dropping the least content) is used and truncated.

use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde::Deserialize;

use super::types::Point;

const ELLIPSIS: char = '\u{2026}';

/// Break opportunities: after whitespace, dashes and slashes, and around
/// every CJK ideograph or kana.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"[\p{Han}\p{Hiragana}\p{Katakana}]\s*|[^\s\p{Pd}/\p{Han}\p{Hiragana}\p{Katakana}]*[\s\p{Pd}/]+|[^\s\p{Pd}/\p{Han}\p{Hiragana}\p{Katakana}]+",
	)
	.expect("token pattern is valid")
});

/// Width of a candidate line under the current font.
pub trait TextMeasure {
	fn measure_width(&self, text: &str) -> f64;
}

impl<F> TextMeasure for F
where
	F: Fn(&str) -> f64,
{
	fn measure_width(&self, text: &str) -> f64 {
		self(text)
	}
}

/// Per-line width budgets; the last width repeats when lines run out.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineProfile {
	pub widths: Vec<f64>,
	#[serde(default)]
	pub scale: Option<f64>,
}

impl LineProfile {
	pub fn new(widths: impl Into<Vec<f64>>) -> Self {
		Self {
			widths: widths.into(),
			scale: None,
		}
	}

	pub fn with_scale(mut self, scale: f64) -> Self {
		self.scale = Some(scale);
		self
	}

	pub fn width_for_line(&self, line: usize) -> f64 {
		self.widths
			.get(line)
			.or(self.widths.last())
			.copied()
			.unwrap_or(0.0)
	}

	pub fn scale(&self) -> f64 {
		self.scale.filter(|s| s.is_finite() && *s > 0.0).unwrap_or(1.0)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WordBreak {
	#[default]
	Normal,
	BreakAll,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Overflow {
	#[default]
	Ellipsis,
	Clip,
}

/// Everything the wrapper needs to lay out one text element.
#[derive(Clone, Debug, PartialEq)]
pub struct TextWrapSpec {
	pub content: String,
	pub x: f64,
	pub y: f64,
	pub width: Option<f64>,
	pub height: Option<f64>,
	pub line_height: f64,
	pub profiles: Vec<LineProfile>,
	pub center_y: Option<f64>,
	pub word_break: WordBreak,
	pub overflow: Overflow,
}

impl TextWrapSpec {
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
			x: 0.0,
			y: 0.0,
			width: None,
			height: None,
			line_height: 16.0,
			profiles: Vec::new(),
			center_y: None,
			word_break: WordBreak::Normal,
			overflow: Overflow::Ellipsis,
		}
	}

	fn effective_profiles(&self) -> Vec<LineProfile> {
		if !self.profiles.is_empty() {
			return self.profiles.clone();
		}
		self.width
			.map(|w| vec![LineProfile::new(vec![w])])
			.unwrap_or_default()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct WrappedLine {
	pub text: String,
	pub x: f64,
	pub y: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WrappedText {
	pub lines: Vec<WrappedLine>,
	/// Uniform scale applied after layout.
	pub scale: f64,
	/// Index of the chosen profile, `None` when nothing was wrapped.
	pub profile: Option<usize>,
	/// Content was dropped to respect the budgets.
	pub overflowed: bool,
	origin: Point,
}

impl WrappedText {
	/// SVG transform applying the scale around the block origin.
	pub fn transform(&self) -> Option<String> {
		if (self.scale - 1.0).abs() < f64::EPSILON {
			return None;
		}
		let Point { x, y } = self.origin;
		Some(format!(
			"translate({x} {y}) scale({}) translate({} {})",
			self.scale, -x, -y
		))
	}
}

/// Result of a cached wrap; `Unchanged` means the DOM can be left alone.
#[derive(Clone, Debug, PartialEq)]
pub enum WrapOutcome {
	Unchanged,
	Wrapped(WrappedText),
}

struct Fill {
	lines: Vec<String>,
	overflow: usize,
}

fn measure(measure: &dyn TextMeasure, text: &str) -> f64 {
	let w = measure.measure_width(text);
	if w.is_finite() && w > 0.0 { w } else { 0.0 }
}

fn tokenize(content: &str, word_break: WordBreak) -> VecDeque<String> {
	match word_break {
		WordBreak::Normal => TOKEN_RE
			.find_iter(content)
			.map(|m| m.as_str().to_owned())
			.collect(),
		WordBreak::BreakAll => content.chars().map(String::from).collect(),
	}
}

fn visible_chars(text: &str) -> usize {
	text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Splits a token that does not fit an empty line. The head keeps as many
/// characters as fit; if not even one does, the token is returned whole.
fn split_token(token: &str, budget: f64, m: &dyn TextMeasure) -> (String, String) {
	let mut head = String::new();
	for (idx, ch) in token.char_indices() {
		head.push(ch);
		if measure(m, head.trim_end()) > budget {
			head.pop();
			if head.is_empty() {
				return (token.to_owned(), String::new());
			}
			return (head, token[idx..].to_owned());
		}
	}
	(head, String::new())
}

fn fill(
	tokens: &VecDeque<String>,
	profile: &LineProfile,
	max_lines: Option<usize>,
	m: &dyn TextMeasure,
) -> Fill {
	let mut pending = tokens.clone();
	let mut lines: Vec<String> = Vec::new();
	let mut current = String::new();

	while let Some(token) = pending.pop_front() {
		if max_lines.is_some_and(|max| lines.len() >= max) {
			pending.push_front(token);
			break;
		}
		let budget = profile.width_for_line(lines.len());
		let candidate = format!("{current}{token}");
		if measure(m, candidate.trim_end()) <= budget {
			current = candidate;
			continue;
		}
		if !current.trim().is_empty() {
			lines.push(current.trim().to_owned());
			current.clear();
			pending.push_front(token);
			continue;
		}
		current.clear();
		let (head, rest) = split_token(&token, budget, m);
		lines.push(head.trim().to_owned());
		if !rest.is_empty() {
			pending.push_front(rest);
		}
	}
	if !current.trim().is_empty() {
		lines.push(current.trim().to_owned());
	}

	Fill {
		lines,
		overflow: pending.iter().map(|t| visible_chars(t)).sum(),
	}
}

fn truncate(lines: &mut [String], budget: f64, overflow: Overflow, m: &dyn TextMeasure) {
	let Some(last) = lines.last_mut() else {
		return;
	};
	if overflow == Overflow::Clip {
		return;
	}
	let mut text = last.clone();
	loop {
		let candidate = format!("{}{ELLIPSIS}", text.trim_end());
		if measure(m, &candidate) <= budget || text.is_empty() {
			*last = candidate;
			return;
		}
		text.pop();
	}
}

/// Wraps `spec.content` with no caching.
pub fn wrap_text(spec: &TextWrapSpec, m: &dyn TextMeasure) -> WrappedText {
	let origin = Point::new(spec.x, spec.center_y.unwrap_or(spec.y));
	let profiles = spec.effective_profiles();

	let (lines, scale, profile, overflowed) = if spec.content.trim().is_empty() {
		(Vec::new(), 1.0, None, false)
	} else if profiles.is_empty() {
		(vec![spec.content.trim().to_owned()], 1.0, None, false)
	} else {
		choose_profile(spec, &profiles, m)
	};

	let lh = spec.line_height;
	let first_y = match spec.center_y {
		Some(cy) => cy - (lines.len().saturating_sub(1) as f64) * lh / 2.0,
		None => spec.y,
	};
	let lines = lines
		.into_iter()
		.enumerate()
		.map(|(i, text)| WrappedLine {
			text,
			x: spec.x,
			y: first_y + i as f64 * lh,
		})
		.collect();

	WrappedText {
		lines,
		scale,
		profile,
		overflowed,
		origin,
	}
}

fn choose_profile(
	spec: &TextWrapSpec,
	profiles: &[LineProfile],
	m: &dyn TextMeasure,
) -> (Vec<String>, f64, Option<usize>, bool) {
	let tokens = tokenize(&spec.content, spec.word_break);
	let mut fallback: Option<(usize, Fill)> = None;

	for (idx, profile) in profiles.iter().enumerate() {
		let max_lines = match spec.height {
			Some(h) if spec.line_height > 0.0 => {
				Some((h / (spec.line_height * profile.scale())).floor().max(0.0) as usize)
			}
			Some(_) => None,
			None => Some(profile.widths.len().max(1)),
		};
		let result = fill(&tokens, profile, max_lines, m);
		if result.overflow == 0 {
			let scale = corrected_scale(&result.lines, profile, m);
			return (result.lines, scale, Some(idx), false);
		}
		let replace = match (&fallback, spec.height) {
			(None, _) => true,
			// Without a height budget the last profile is the fallback.
			(Some(_), None) => true,
			(Some((_, best)), Some(_)) => result.overflow < best.overflow,
		};
		if replace {
			fallback = Some((idx, result));
		}
	}

	let Some((idx, mut result)) = fallback else {
		return (Vec::new(), 1.0, None, false);
	};
	let profile = &profiles[idx];
	debug!(
		"text overflows every line profile, using profile {idx} ({} chars dropped)",
		result.overflow
	);
	let last_budget = profile.width_for_line(result.lines.len().saturating_sub(1));
	truncate(&mut result.lines, last_budget, spec.overflow, m);
	let scale = corrected_scale(&result.lines, profile, m);
	(result.lines, scale, Some(idx), true)
}

/// Profile scale, shrunk further when a line that could not be split still
/// exceeds its budget.
fn corrected_scale(lines: &[String], profile: &LineProfile, m: &dyn TextMeasure) -> f64 {
	let mut scale = profile.scale();
	for (i, line) in lines.iter().enumerate() {
		let (width, budget) = (measure(m, line), profile.width_for_line(i));
		if width > budget && budget > 0.0 {
			scale = scale.min(profile.scale() * budget / width);
		}
	}
	scale
}

struct CacheEntry {
	spec: TextWrapSpec,
	measured: f64,
}

/// Wraps text elements by key and skips work when nothing changed.
#[derive(Default)]
pub struct TextWrapper {
	cache: HashMap<String, CacheEntry>,
}

impl TextWrapper {
	pub fn new() -> Self {
		Self::default()
	}

	/// Re-wraps unless `spec` and the measured content width match the last
	/// call for `key`. `force` always re-wraps.
	pub fn wrap(
		&mut self,
		key: &str,
		spec: &TextWrapSpec,
		m: &dyn TextMeasure,
		force: bool,
	) -> WrapOutcome {
		let measured = measure(m, &spec.content);
		if !force
			&& let Some(entry) = self.cache.get(key)
			&& entry.spec == *spec
			&& entry.measured == measured
		{
			return WrapOutcome::Unchanged;
		}
		let wrapped = wrap_text(spec, m);
		self.cache.insert(
			key.to_owned(),
			CacheEntry {
				spec: spec.clone(),
				measured,
			},
		);
		WrapOutcome::Wrapped(wrapped)
	}

	pub fn forget(&mut self, key: &str) {
		self.cache.remove(key);
	}
}
