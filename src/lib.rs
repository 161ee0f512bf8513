//! Berth is a dockable-window layout core: a tree of oriented splits and
//! tabbed panel groups per top-level window, a drag state machine for
//! tear-off and re-dock gestures, and a serializable snapshot of the whole
//! arrangement. It is toolkit agnostic; the host owns the actual windows
//! and widgets and drives this crate from its UI thread.

pub mod common;
pub mod dock;
pub mod model;

pub use common::config::DockSettings;
pub use dock::{
    Content, ContentId, ContentRegistry, DockArea, DockError, DockEvent, DockRoot,
    DragController, DragPhase, DropZone, LayoutState, Orientation, Point, Rect, Size,
};
