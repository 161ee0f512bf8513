use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::area::Orientation;
use super::error::DockError;
use super::geometry::Rect;
use super::registry::{Content, ContentId};
use crate::model::tree::NodeId;

bitflags! {
    /// Window attributes the host applies to a top-level dock window.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WindowFlags: u32 {
        const FLOATING = 1 << 0;
        const STAYS_ON_TOP = 1 << 1;
        const FRAMELESS = 1 << 2;
        /// Render hint for the interactive drag clone.
        const TRANSLUCENT = 1 << 3;
    }
}

impl Serialize for WindowFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for WindowFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Bits written by a newer version are dropped on read.
        Ok(WindowFlags::from_bits_truncate(u32::deserialize(
            deserializer,
        )?))
    }
}

/// One tab of a panel group: a display title plus the owned payload.
pub struct Tab {
    pub title: String,
    pub content_id: ContentId,
    pub payload: Box<dyn Content>,
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("title", &self.title)
            .field("content_id", &self.content_id)
            .finish_non_exhaustive()
    }
}

/// Tabbed container of content payloads.
#[derive(Debug)]
pub struct PanelGroup {
    pub tabs: Vec<Tab>,
    pub current_index: usize,
    pub detachable: bool,
    /// Remove the group from the tree once its last tab closes.
    pub auto_delete: bool,
    /// The one permanent group anchoring the main layout.
    pub is_center: bool,
}

impl PanelGroup {
    pub fn new() -> Self {
        PanelGroup {
            tabs: Vec::new(),
            current_index: 0,
            detachable: true,
            auto_delete: true,
            is_center: false,
        }
    }

    /// The permanent center group. Its tabs can still be dragged out
    /// individually; the group itself is never floated or destroyed.
    pub fn center() -> Self {
        PanelGroup {
            tabs: Vec::new(),
            current_index: 0,
            detachable: true,
            auto_delete: false,
            is_center: true,
        }
    }

    pub fn is_empty(&self) -> bool { self.tabs.is_empty() }

    pub fn tab_index_of(&self, content_id: &ContentId) -> Option<usize> {
        self.tabs.iter().position(|t| &t.content_id == content_id)
    }

    pub fn has_title(&self, title: &str) -> bool { self.tabs.iter().any(|t| t.title == title) }

    /// Appends a tab and selects it. With `unique_titles`, a colliding title
    /// leaves the group untouched.
    pub fn add_tab(&mut self, tab: Tab, unique_titles: bool) -> Result<usize, DockError> {
        if unique_titles && self.has_title(&tab.title) {
            return Err(DockError::DuplicateTitle(tab.title));
        }
        self.tabs.push(tab);
        self.current_index = self.tabs.len() - 1;
        Ok(self.current_index)
    }

    /// Removes and returns the tab at `index`, keeping `current_index` on a
    /// valid tab.
    #[track_caller]
    pub fn remove_tab(&mut self, index: usize) -> Tab {
        let tab = self.tabs.remove(index);
        if self.current_index >= index && self.current_index > 0 {
            self.current_index -= 1;
        }
        tab
    }

    pub fn move_tab(&mut self, from: usize, to: usize) {
        if from >= self.tabs.len() || to >= self.tabs.len() || from == to {
            return;
        }
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
        if self.current_index == from {
            self.current_index = to;
        } else if from < self.current_index && self.current_index <= to {
            self.current_index -= 1;
        } else if to <= self.current_index && self.current_index < from {
            self.current_index += 1;
        }
    }

    pub fn select(&mut self, index: usize) {
        if index < self.tabs.len() {
            self.current_index = index;
        }
    }
}

impl Default for PanelGroup {
    fn default() -> Self { Self::new() }
}

/// Oriented container of two or more children with proportional sizes.
///
/// The `sizes` list runs parallel to the child list held by the forest
/// node; every structural mutation must keep the two in lockstep.
#[derive(Debug)]
pub struct SplitContainer {
    pub orientation: Orientation,
    pub sizes: Vec<f64>,
}

impl SplitContainer {
    pub fn new(orientation: Orientation) -> Self {
        SplitContainer { orientation, sizes: Vec::new() }
    }

    /// Inserts a size share at `index`, taken from `donor`'s share so the
    /// total stays 1.0. Without a donor the new child gets an equal share.
    pub fn insert_size(&mut self, index: usize, donor: Option<usize>) {
        let index = index.min(self.sizes.len());
        match donor {
            Some(donor) if donor < self.sizes.len() => {
                let half = self.sizes[donor] / 2.0;
                self.sizes[donor] = half;
                self.sizes.insert(index, half);
            }
            _ => {
                // Without a donor the new pane takes an equal share and
                // everyone else scales down proportionally.
                let count = self.sizes.len() as f64;
                let share = 1.0 / (count + 1.0);
                for size in &mut self.sizes {
                    *size *= count / (count + 1.0);
                }
                self.sizes.insert(index, share);
            }
        }
    }

    pub fn remove_size(&mut self, index: usize) {
        if index < self.sizes.len() {
            self.sizes.remove(index);
            self.normalize();
        }
    }

    /// Rescales so the shares sum to 1.0. Degenerate inputs fall back to
    /// equal shares.
    pub fn normalize(&mut self) {
        if self.sizes.is_empty() {
            return;
        }
        let total: f64 = self.sizes.iter().sum();
        if total <= f64::EPSILON {
            let share = 1.0 / self.sizes.len() as f64;
            self.sizes.fill(share);
        } else {
            for size in &mut self.sizes {
                *size /= total;
            }
        }
    }

    /// Grows the child at `index` by `delta` at the expense of its next
    /// sibling (or previous, for the last child), clamped to `min`.
    pub fn resize(&mut self, index: usize, delta: f64, min: f64) {
        if self.sizes.len() < 2 || index >= self.sizes.len() {
            return;
        }
        let neighbor = if index + 1 < self.sizes.len() { index + 1 } else { index - 1 };
        let delta = delta
            .min(self.sizes[neighbor] - min)
            .max(min - self.sizes[index]);
        self.sizes[index] += delta;
        self.sizes[neighbor] -= delta;
    }
}

/// A node in the dock tree: either a tabbed leaf or an oriented split.
#[derive(Debug)]
pub enum DockNode {
    Panel(PanelGroup),
    Split(SplitContainer),
}

impl DockNode {
    pub fn is_panel(&self) -> bool { matches!(self, DockNode::Panel(_)) }

    pub fn is_split(&self) -> bool { matches!(self, DockNode::Split(_)) }

    pub fn as_panel(&self) -> Option<&PanelGroup> {
        match self {
            DockNode::Panel(panel) => Some(panel),
            DockNode::Split(_) => None,
        }
    }

    pub fn as_panel_mut(&mut self) -> Option<&mut PanelGroup> {
        match self {
            DockNode::Panel(panel) => Some(panel),
            DockNode::Split(_) => None,
        }
    }

    pub fn as_split(&self) -> Option<&SplitContainer> {
        match self {
            DockNode::Split(split) => Some(split),
            DockNode::Panel(_) => None,
        }
    }

    pub fn as_split_mut(&mut self) -> Option<&mut SplitContainer> {
        match self {
            DockNode::Split(split) => Some(split),
            DockNode::Panel(_) => None,
        }
    }
}

/// A floating top-level window of the dock root.
#[derive(Debug, Clone, Copy)]
pub struct TopLevel {
    pub node: NodeId,
    pub geometry: Rect,
    pub flags: WindowFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(id: &str) -> Tab {
        struct Dummy(String);
        impl Content for Dummy {
            fn title(&self) -> &str { &self.0 }
        }
        Tab {
            title: id.to_owned(),
            content_id: id.into(),
            payload: Box::new(Dummy(id.to_owned())),
        }
    }

    #[test]
    fn add_tab_selects_new_tab() {
        let mut group = PanelGroup::new();
        assert_eq!(0, group.add_tab(tab("a"), true).unwrap());
        assert_eq!(1, group.add_tab(tab("b"), true).unwrap());
        assert_eq!(1, group.current_index);
    }

    #[test]
    fn duplicate_title_is_rejected_only_under_policy() {
        let mut group = PanelGroup::new();
        group.add_tab(tab("a"), true).unwrap();
        assert_eq!(
            Err(DockError::DuplicateTitle("a".into())),
            group.add_tab(tab("a"), true).map(|_| ())
        );
        assert_eq!(1, group.tabs.len());
        assert!(group.add_tab(tab("a"), false).is_ok());
        assert_eq!(2, group.tabs.len());
    }

    #[test]
    fn remove_tab_keeps_selection_valid() {
        let mut group = PanelGroup::new();
        for id in ["a", "b", "c"] {
            group.add_tab(tab(id), true).unwrap();
        }
        group.select(2);
        group.remove_tab(2);
        assert_eq!(1, group.current_index);
        group.remove_tab(0);
        assert_eq!(0, group.current_index);
        assert_eq!("b", group.tabs[0].title);
    }

    #[test]
    fn remove_tab_before_selection_shifts_it() {
        let mut group = PanelGroup::new();
        for id in ["a", "b", "c"] {
            group.add_tab(tab(id), true).unwrap();
        }
        group.select(2);
        group.remove_tab(0);
        assert_eq!(1, group.current_index);
        assert_eq!("c", group.tabs[group.current_index].title);
    }

    #[test]
    fn move_tab_follows_selection() {
        let mut group = PanelGroup::new();
        for id in ["a", "b", "c"] {
            group.add_tab(tab(id), true).unwrap();
        }
        group.select(0);
        group.move_tab(0, 2);
        assert_eq!(2, group.current_index);
        assert_eq!(
            vec!["b", "c", "a"],
            group.tabs.iter().map(|t| t.title.as_str()).collect::<Vec<_>>()
        );

        group.select(1);
        group.move_tab(2, 0);
        assert_eq!(2, group.current_index);
    }

    #[test]
    fn insert_size_halves_the_donor() {
        let mut split = SplitContainer::new(Orientation::Horizontal);
        split.sizes = vec![0.5, 0.5];
        split.insert_size(1, Some(0));
        assert_eq!(vec![0.25, 0.25, 0.5], split.sizes);
    }

    #[test]
    fn insert_size_without_donor_equalizes() {
        let mut split = SplitContainer::new(Orientation::Vertical);
        split.insert_size(0, None);
        assert_eq!(vec![1.0], split.sizes);
        split.insert_size(1, None);
        assert_eq!(vec![0.5, 0.5], split.sizes);
    }

    #[test]
    fn insert_size_without_donor_scales_existing_shares() {
        let mut split = SplitContainer::new(Orientation::Horizontal);
        split.sizes = vec![0.75, 0.25];
        split.insert_size(2, None);
        assert!((split.sizes[0] - 0.5).abs() < 1e-9);
        assert!((split.sizes[1] - 1.0 / 6.0).abs() < 1e-9);
        assert!((split.sizes[2] - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn window_flags_round_trip_as_bits() {
        let flags = WindowFlags::FLOATING | WindowFlags::TRANSLUCENT;
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!("9", json);
        let back: WindowFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(flags, back);
        // Unknown bits are silently ignored.
        let lenient: WindowFlags = serde_json::from_str("255").unwrap();
        assert_eq!(WindowFlags::all(), lenient);
    }

    #[test]
    fn remove_size_renormalizes() {
        let mut split = SplitContainer::new(Orientation::Horizontal);
        split.sizes = vec![0.25, 0.25, 0.5];
        split.remove_size(2);
        assert_eq!(vec![0.5, 0.5], split.sizes);
    }

    #[test]
    fn resize_clamps_to_minimum() {
        let mut split = SplitContainer::new(Orientation::Horizontal);
        split.sizes = vec![0.5, 0.5];
        split.resize(0, 1.0, 0.05);
        assert!((split.sizes[0] - 0.95).abs() < 1e-9);
        assert!((split.sizes[1] - 0.05).abs() < 1e-9);
        let total: f64 = split.sizes.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn resize_last_child_borrows_from_previous() {
        let mut split = SplitContainer::new(Orientation::Horizontal);
        split.sizes = vec![0.3, 0.3, 0.4];
        split.resize(2, 0.1, 0.05);
        assert!((split.sizes[1] - 0.2).abs() < 1e-9);
        assert!((split.sizes[2] - 0.5).abs() < 1e-9);
    }
}
