use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use leptos::prelude::*;
use log::{debug, error};
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlDivElement, MouseEvent, WheelEvent, Window};

use super::config::EditorConfig;
use super::events::GraphEvent;
use super::movement::{NodeMovementInformation, RenderRequest};
use super::render::{SvgScene, SvgTextMeasure};
use super::state::GraphEditor;
use super::types::{GraphData, Point};

/// Consumer access to the editor right after it was built, e.g. to set
/// group behaviours. `Send + Sync` so the prop can live under an
/// `ErrorBoundary`.
pub type EditorSetup = Arc<dyn Fn(&mut GraphEditor) + Send + Sync>;

enum Gesture {
	Idle,
	Pan { start: Point, transform_start: Point },
	Drag(NodeMovementInformation),
}

struct Mounted {
	editor: GraphEditor,
	scene: SvgScene,
	measure: SvgTextMeasure,
	gesture: Gesture,
	on_event: Option<Callback<GraphEvent>>,
}

impl Mounted {
	fn render(&mut self, request: RenderRequest) {
		let result = match request {
			RenderRequest::Full => self.scene.render(&mut self.editor, &self.measure),
			RenderRequest::PositionOnly => self.scene.update_positions(&self.editor),
		};
		if let Err(err) = result {
			error!("rendering failed: {err:?}");
		}
		self.flush_events();
	}

	fn flush_events(&mut self) {
		for event in self.editor.take_events() {
			debug!("{event:?}");
			if let Some(cb) = &self.on_event {
				cb.run(event);
			}
		}
	}
}

fn local_point(container: &HtmlDivElement, ev: &MouseEvent) -> Point {
	let rect = container.get_bounding_client_rect();
	Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn size_svg(svg: &Element, w: f64, h: f64) {
	for (name, value) in [("width", w), ("height", h)] {
		if let Err(err) = svg.set_attribute(name, &value.to_string()) {
			error!("could not set svg {name}: {err:?}");
		}
	}
}

#[component]
pub fn GraphEditorCanvas(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(optional)] config: Option<EditorConfig>,
	#[prop(optional)] setup: Option<EditorSetup>,
	#[prop(optional, into)] on_event: Option<Callback<GraphEvent>>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let container_ref = NodeRef::<leptos::html::Div>::new();
	let state: Rc<RefCell<Option<Mounted>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, resize_cb_init) = (state.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(container) = container_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			return;
		};
		let Some(document) = window.document() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| match container.client_width() {
					0 => 800.0,
					w => w as f64,
				}),
				height.unwrap_or_else(|| match container.client_height() {
					0 => 600.0,
					h => h as f64,
				}),
			)
		};

		let svg = match document.create_element_ns(Some("http://www.w3.org/2000/svg"), "svg") {
			Ok(svg) => svg,
			Err(err) => {
				error!("could not create the svg root: {err:?}");
				return;
			}
		};
		size_svg(&svg, w, h);
		container.set_text_content(None);
		if let Err(err) = container.append_child(&svg) {
			error!("could not attach the svg root: {err:?}");
			return;
		}

		let config = config.clone().unwrap_or_default();
		let marker_size = config.marker_size;
		let mut editor = GraphEditor::new(data.get(), config, w, h);
		if let Some(setup) = &setup {
			setup(&mut editor);
		}
		let scene = SvgScene::new(&svg, marker_size);
		let measure = SvgTextMeasure::new(&document, &svg);
		let (scene, measure) = match (scene, measure) {
			(Ok(scene), Ok(measure)) => (scene, measure),
			(Err(err), _) | (_, Err(err)) => {
				error!("could not set up the svg scene: {err:?}");
				return;
			}
		};
		let mut mounted = Mounted {
			editor,
			scene,
			measure,
			gesture: Gesture::Idle,
			on_event,
		};
		mounted.render(RenderRequest::Full);
		*state_init.borrow_mut() = Some(mounted);

		if fullscreen {
			let state_resize = state_init.clone();
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				size_svg(&svg, nw, nh);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.editor.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				if let Err(err) =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())
				{
					error!("could not listen for resizes: {err:?}");
				}
			}
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(container) = container_ref.get() else {
			return;
		};
		let client = local_point(&container, &ev);

		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.gesture = match s.editor.node_at_position(client) {
				Some(id) => {
					let at = s.editor.client_point_to_graph_point(client);
					match s.editor.drag_start(&id, at.x, at.y) {
						Some(info) => Gesture::Drag(info),
						None => Gesture::Idle,
					}
				}
				None => Gesture::Pan {
					start: client,
					transform_start: Point::new(s.editor.transform.x, s.editor.transform.y),
				},
			};
			s.flush_events();
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(container) = container_ref.get() else {
			return;
		};
		let client = local_point(&container, &ev);

		if let Some(ref mut s) = *state_mm.borrow_mut() {
			match &mut s.gesture {
				Gesture::Drag(info) => {
					let at = s.editor.client_point_to_graph_point(client);
					let request = s.editor.drag(info, at.x, at.y);
					s.render(request);
				}
				Gesture::Pan {
					start,
					transform_start,
				} => {
					s.editor.transform.x = transform_start.x + (client.x - start.x);
					s.editor.transform.y = transform_start.y + (client.y - start.y);
					if let Err(err) = s.scene.apply_view(&s.editor) {
						error!("panning failed: {err:?}");
					}
				}
				Gesture::Idle => {}
			}
		}
	};

	let end_gesture = {
		let state_end = state.clone();
		move || {
			if let Some(ref mut s) = *state_end.borrow_mut() {
				if let Gesture::Drag(info) = std::mem::replace(&mut s.gesture, Gesture::Idle) {
					let request = s.editor.drag_end(info);
					s.render(request);
				}
			}
		}
	};
	let end_on_leave = end_gesture.clone();
	let on_mouseup = move |_: MouseEvent| end_gesture();
	let on_mouseleave = move |_: MouseEvent| end_on_leave();

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(container) = container_ref.get() else {
			return;
		};
		let client = local_point(&container, &ev);

		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			s.editor.zoom_at(client, factor);
			if let Err(err) = s.scene.apply_view(&s.editor) {
				error!("zooming failed: {err:?}");
			}
		}
	};

	view! {
		<div
			node_ref=container_ref
			class="graph-editor"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="width: 100%; height: 100%; cursor: grab; user-select: none;"
		/>
	}
}
