use leptos::prelude::*;
use svg_graph_editor::{App, init_logging};

fn main() {
	init_logging();
	mount_to_body(|| {
		view! { <App /> }
	})
}
