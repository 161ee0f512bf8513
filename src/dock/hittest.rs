//! Drop-zone hit testing across all top-level windows.
//!
//! Frames are computed on the fly by proportionally subdividing each
//! window's rect; the core never caches toolkit geometry.

use super::area::{DockArea, Orientation};
use super::engine::DockRoot;
use super::geometry::{Point, Rect};
use super::node::DockNode;
use crate::model::tree::NodeId;

/// A candidate drop location: the panel it targets, the area relative to
/// it, and the overlay rectangle the host should highlight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropZone {
    pub target: NodeId,
    pub area: DockArea,
    pub preview: Rect,
}

impl DockRoot {
    /// Finds the drop zone under `pos`, topmost window first.
    pub fn hit_test(&self, pos: Point) -> Option<DropZone> {
        self.hit_test_excluding(pos, None)
    }

    /// Like [`hit_test`](Self::hit_test) but ignoring the window currently
    /// being dragged. Floating windows always beat the fixed
    /// layout; overlapping floating windows resolve to the most recently
    /// raised one.
    pub fn hit_test_excluding(&self, pos: Point, skip: Option<NodeId>) -> Option<DropZone> {
        for tl in self.floating().iter().rev() {
            if Some(tl.node) == skip {
                continue;
            }
            if tl.geometry.contains(pos) {
                return Some(self.zone_in_window(tl.node, tl.geometry, pos));
            }
        }
        if self.main_geometry().contains(pos) {
            return Some(self.zone_in_window(self.main(), self.main_geometry(), pos));
        }
        None
    }

    /// Global frames of every node in every window, z-bottom first.
    pub fn frames(&self) -> Vec<(NodeId, Rect)> {
        let mut out = Vec::new();
        self.collect_frames(self.main(), self.main_geometry(), &mut out);
        for tl in self.floating() {
            self.collect_frames(tl.node, tl.geometry, &mut out);
        }
        out
    }

    /// Global frame of a single node, if it is part of a live window.
    pub fn frame_of(&self, node: NodeId) -> Option<Rect> {
        if !self.is_reachable(node) {
            return None;
        }
        self.frames().into_iter().find(|(n, _)| *n == node).map(|(_, r)| r)
    }

    fn collect_frames(&self, node: NodeId, rect: Rect, out: &mut Vec<(NodeId, Rect)>) {
        out.push((node, rect));
        for (child, child_rect) in self.child_frames(node, rect) {
            self.collect_frames(child, child_rect, out);
        }
    }

    /// Subdivides `rect` among `node`'s children along its orientation.
    pub(crate) fn child_frames(&self, node: NodeId, rect: Rect) -> Vec<(NodeId, Rect)> {
        let Some(split) = self.forest().get(node).and_then(DockNode::as_split) else {
            return Vec::new();
        };
        let children = self.forest().children(node);
        if children.is_empty() {
            return Vec::new();
        }
        let equal = 1.0 / children.len() as f64;
        let mut offset = 0.0;
        children
            .iter()
            .enumerate()
            .map(|(i, &child)| {
                let share = split.sizes.get(i).copied().unwrap_or(equal);
                let frame = match split.orientation {
                    Orientation::Horizontal => Rect::new(
                        rect.min_x() + offset * rect.width(),
                        rect.min_y(),
                        share * rect.width(),
                        rect.height(),
                    ),
                    Orientation::Vertical => Rect::new(
                        rect.min_x(),
                        rect.min_y() + offset * rect.height(),
                        rect.width(),
                        share * rect.height(),
                    ),
                };
                offset += share;
                (child, frame)
            })
            .collect()
    }

    /// Descends from a window root to the deepest panel under `pos` and
    /// computes the zone there. Dropping on a nested panel's edge splits at
    /// that panel's level, not at the window's outer edge.
    fn zone_in_window(&self, top: NodeId, rect: Rect, pos: Point) -> DropZone {
        let mut node = top;
        let mut frame = rect;
        while self.forest().get(node).is_some_and(DockNode::is_split) {
            let children = self.child_frames(node, frame);
            let Some(&(child, child_frame)) = children
                .iter()
                .find(|(_, r)| r.contains(pos))
                .or_else(|| children.last())
            else {
                break;
            };
            node = child;
            frame = child_frame;
        }
        self.zone_at(node, frame, pos)
    }

    /// Five-zone partition of a panel's frame: four edge bands of
    /// `drop_zone_fraction` thickness, center everywhere else. In a corner
    /// the nearer edge wins.
    fn zone_at(&self, panel: NodeId, frame: Rect, pos: Point) -> DropZone {
        let fraction = self.settings().drop_zone_fraction;
        let width = frame.width().max(1.0);
        let height = frame.height().max(1.0);
        let candidates = [
            ((pos.x - frame.min_x()) / width, DockArea::Left),
            ((frame.max_x() - pos.x) / width, DockArea::Right),
            ((pos.y - frame.min_y()) / height, DockArea::Top),
            ((frame.max_y() - pos.y) / height, DockArea::Bottom),
        ];
        let (distance, area) = candidates
            .into_iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .expect("candidate list is non-empty");
        let area = if distance < fraction { area } else { DockArea::Center };
        DropZone {
            target: panel,
            area,
            preview: area.preview_rect(frame),
        }
    }
}
