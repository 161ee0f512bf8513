//! The docking core: tree model, geometry, drag choreography, and the
//! serializable layout snapshot.

pub mod area;
pub mod drag;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hittest;
pub mod node;
pub mod registry;
pub mod state;


pub use area::{DockArea, Orientation};
pub use drag::{DragController, DragPhase};
pub use engine::{DockEvent, DockRoot, EventListener};
pub use error::DockError;
pub use geometry::{Point, Rect, Size};
pub use hittest::DropZone;
pub use node::{DockNode, PanelGroup, SplitContainer, Tab, TopLevel, WindowFlags};
pub use registry::{Content, ContentFactory, ContentId, ContentRegistry};
pub use state::{LayoutState, NodeState, TabState, TopLevelState};
