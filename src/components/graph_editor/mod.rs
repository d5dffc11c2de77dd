//! SVG graph editor: nested groups, drag coordination and wrapped node
//! labels, rendered by a Leptos component.

pub mod behaviour;
mod component;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod grouping;
pub mod movement;
mod render;
pub mod state;
pub mod text_wrap;
pub mod types;

pub use behaviour::{ChildPosition, GroupBehaviour, GroupHookKind, HookContext};
pub use component::{EditorSetup, GraphEditorCanvas};
pub use config::EditorConfig;
pub use events::{EventSource, GraphEvent};
pub use grouping::{GroupingManager, Membership};
pub use movement::{BeforeMove, NodeMovementInformation, RenderRequest};
pub use state::GraphEditor;
pub use types::{Edge, Graph, GraphData, Node, NodeId, Point};
