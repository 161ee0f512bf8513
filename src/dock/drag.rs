use tracing::debug;

use super::engine::DockRoot;
use super::geometry::Point;
use super::hittest::DropZone;
use crate::model::tree::NodeId;

/// Phase of a tab drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    /// Clone follows the pointer; nothing under it accepts a drop.
    Dragging,
    /// A drop zone is highlighted.
    Previewing,
    Committed,
    Cancelled,
}

struct DragSession {
    window: NodeId,
    source: NodeId,
}

/// Tracks one in-flight tab detach/redock gesture.
///
/// The host drives it from pointer events: `begin` when a pressed tab
/// leaves its group's bounds, `update` on every move, `finish` on release,
/// `cancel` on an explicit cancel key. Between `begin` and the end of the
/// gesture the source panel is protected from empty-group cleanup so the
/// drag keeps a stable coordinate frame.
#[derive(Default)]
pub struct DragController {
    phase: DragPhase,
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self { Self::default() }

    pub fn phase(&self) -> DragPhase { self.phase }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging | DragPhase::Previewing)
    }

    /// Panel the dragged tab came from, while a gesture is in flight.
    pub fn source_panel(&self) -> Option<NodeId> {
        self.is_active().then(|| self.session.as_ref().map(|s| s.source)).flatten()
    }

    /// The floating clone of the current gesture, if one is in flight.
    pub fn dragged_window(&self) -> Option<NodeId> {
        self.is_active().then(|| self.session.as_ref().map(|s| s.window)).flatten()
    }

    /// Starts a gesture by detaching the tab at `index` into an interactive
    /// floating clone under the pointer.
    pub fn begin(
        &mut self,
        root: &mut DockRoot,
        panel: NodeId,
        index: usize,
        pos: Point,
    ) -> Option<NodeId> {
        if self.is_active() {
            return None;
        }
        let clone = root.detach(panel, index, true)?;
        root.move_floating_to(clone, pos);
        self.session = Some(DragSession { window: clone, source: panel });
        self.phase = DragPhase::Dragging;
        Some(clone)
    }

    /// Advances the gesture to `pos`, returning the zone to highlight.
    pub fn update(&mut self, root: &mut DockRoot, pos: Point) -> Option<DropZone> {
        if !self.is_active() {
            return None;
        }
        let clone = self.session.as_ref()?.window;
        root.move_floating_to(clone, pos);
        let zone = root.hit_test_excluding(pos, Some(clone));
        self.phase = if zone.is_some() { DragPhase::Previewing } else { DragPhase::Dragging };
        zone
    }

    /// Pointer released: commits onto the zone under `pos`, or leaves the
    /// clone as an independent floating window at the drop position.
    pub fn finish(&mut self, root: &mut DockRoot, pos: Point) -> DragPhase {
        if !self.is_active() {
            return self.phase;
        }
        let Some(session) = self.session.take() else {
            return self.phase;
        };
        root.move_floating_to(session.window, pos);
        let zone = root.hit_test_excluding(pos, Some(session.window));
        self.phase = match zone {
            Some(zone) => match root.dock(session.window, zone.target, zone.area) {
                Ok(()) => {
                    debug!(area = ?zone.area, "drag committed");
                    DragPhase::Committed
                }
                Err(err) => {
                    debug!(%err, "drop target went stale; leaving the clone floating");
                    root.settle_floating(session.window);
                    DragPhase::Cancelled
                }
            },
            None => {
                root.settle_floating(session.window);
                DragPhase::Cancelled
            }
        };
        root.clear_drag_protection();
        self.phase
    }

    /// Explicit cancellation: the clone stays as a real floating window.
    /// There is no path that re-inserts the tab into its source.
    pub fn cancel(&mut self, root: &mut DockRoot) -> DragPhase {
        if let Some(session) = self.session.take() {
            root.settle_floating(session.window);
            root.clear_drag_protection();
            self.phase = DragPhase::Cancelled;
        }
        self.phase
    }
}
