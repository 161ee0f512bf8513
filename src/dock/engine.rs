use tracing::{debug, warn};

use super::area::{DockArea, Orientation};
use super::error::DockError;
use super::geometry::{Point, Rect};
use super::node::{DockNode, PanelGroup, SplitContainer, Tab, TopLevel, WindowFlags};
use super::registry::{ContentId, ContentRegistry};
use crate::common::config::DockSettings;
use crate::model::tree::{Forest, NodeId};

/// Notification fired synchronously after a tree mutation completes.
#[derive(Debug, Clone, PartialEq)]
pub enum DockEvent {
    PanelAdded(ContentId),
    PanelRemoved(ContentId),
}

pub type EventListener = Box<dyn FnMut(&DockEvent)>;

/// Root of the dock layout: one permanent main split holding the center
/// group, plus any number of floating top-level windows.
///
/// Every public mutation leaves the tree minimized: no split with fewer
/// than two children (the permanent main split excepted) and no empty
/// non-center panel, except the drag-protected source while a gesture is
/// in flight.
pub struct DockRoot {
    forest: Forest<DockNode>,
    main: NodeId,
    center: NodeId,
    main_geometry: Rect,
    /// Bottom-to-top z-order; the last entry is topmost.
    floating: Vec<TopLevel>,
    listeners: Vec<EventListener>,
    settings: DockSettings,
    /// Panel exempted from empty-group cleanup while a drag references it.
    protected: Option<NodeId>,
    /// Collapse flags of the host's property tree, carried through
    /// persistence untouched.
    pub collapsed: Vec<bool>,
}

impl DockRoot {
    pub fn new(settings: DockSettings) -> Self {
        let mut forest = Forest::new();
        let main = forest.insert_root(DockNode::Split(SplitContainer::new(Orientation::Horizontal)));
        let center = forest.insert_child(main, 0, DockNode::Panel(PanelGroup::center()));
        if let Some(split) = forest[main].as_split_mut() {
            split.insert_size(0, None);
        }
        DockRoot {
            forest,
            main,
            center,
            main_geometry: Rect::default(),
            floating: Vec::new(),
            listeners: Vec::new(),
            settings,
            protected: None,
            collapsed: Vec::new(),
        }
    }

    pub fn main(&self) -> NodeId { self.main }

    pub fn center(&self) -> NodeId { self.center }

    pub fn settings(&self) -> &DockSettings { &self.settings }

    pub fn set_settings(&mut self, settings: DockSettings) { self.settings = settings; }

    pub fn main_geometry(&self) -> Rect { self.main_geometry }

    /// The host reports its main window's client rect here so hit testing
    /// has a frame for the fixed layout.
    pub fn set_main_geometry(&mut self, rect: Rect) { self.main_geometry = rect; }

    pub fn floating(&self) -> &[TopLevel] { &self.floating }

    pub fn forest(&self) -> &Forest<DockNode> { &self.forest }

    pub(crate) fn forest_mut(&mut self) -> &mut Forest<DockNode> { &mut self.forest }

    /// Throws away the whole tree and starts over with an empty main split.
    /// The caller is responsible for installing a center group afterwards.
    pub(crate) fn reset_structure(&mut self, orientation: Orientation) {
        self.forest = Forest::new();
        self.main = self
            .forest
            .insert_root(DockNode::Split(SplitContainer::new(orientation)));
        self.center = self.main;
        self.floating.clear();
        self.protected = None;
    }

    pub(crate) fn set_center(&mut self, center: NodeId) {
        debug_assert!(self.forest[center].is_panel());
        self.center = center;
    }

    pub(crate) fn push_floating(&mut self, entry: TopLevel) { self.floating.push(entry); }

    pub fn panel(&self, id: NodeId) -> Option<&PanelGroup> {
        self.forest.get(id).and_then(|n| n.as_panel())
    }

    pub fn split(&self, id: NodeId) -> Option<&SplitContainer> {
        self.forest.get(id).and_then(|n| n.as_split())
    }

    pub fn subscribe(&mut self, listener: EventListener) { self.listeners.push(listener); }

    pub(crate) fn emit(&mut self, event: DockEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Whether `node` is still part of a live window of this root.
    pub fn is_reachable(&self, node: NodeId) -> bool {
        if !self.forest.contains(node) {
            return false;
        }
        let root = self.forest.root_of(node);
        root == self.main || self.floating.iter().any(|tl| tl.node == root)
    }

    fn floating_index_of(&self, root: NodeId) -> Option<usize> {
        self.floating.iter().position(|tl| tl.node == root)
    }

    pub(crate) fn floating_entry_mut(&mut self, root: NodeId) -> Option<&mut TopLevel> {
        self.floating.iter_mut().find(|tl| tl.node == root)
    }

    /// Moves a floating window to the top of the z-order.
    pub fn raise(&mut self, root: NodeId) {
        if let Some(index) = self.floating_index_of(root) {
            let entry = self.floating.remove(index);
            self.floating.push(entry);
        }
    }

    /// Every panel group across all windows, topmost window first.
    pub fn all_panels(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for tl in self.floating.iter().rev() {
            out.extend(
                self.forest
                    .preorder(tl.node)
                    .into_iter()
                    .filter(|&n| self.forest[n].is_panel()),
            );
        }
        out.extend(
            self.forest
                .preorder(self.main)
                .into_iter()
                .filter(|&n| self.forest[n].is_panel()),
        );
        out
    }

    pub fn find_content(&self, content_id: &ContentId) -> Option<(NodeId, usize)> {
        self.all_panels().into_iter().find_map(|panel| {
            self.forest[panel]
                .as_panel()
                .and_then(|p| p.tab_index_of(content_id))
                .map(|index| (panel, index))
        })
    }

    /// Selects the tab hosting `content_id` and raises its window.
    pub fn focus_content(&mut self, content_id: &ContentId) -> Option<NodeId> {
        let (panel, index) = self.find_content(content_id)?;
        if let Some(group) = self.forest[panel].as_panel_mut() {
            group.select(index);
        }
        let root = self.forest.root_of(panel);
        if root != self.main {
            self.raise(root);
        }
        Some(panel)
    }

    /// Creates a panel for `content_id` and docks it.
    ///
    /// Defaults to merging into the center group. A live singleton is never
    /// duplicated; the existing tab is focused and its group returned.
    pub fn create_panel(
        &mut self,
        registry: &mut ContentRegistry,
        content_id: &ContentId,
        target: Option<(NodeId, DockArea)>,
    ) -> Result<NodeId, DockError> {
        if !registry.contains(content_id) {
            return Err(DockError::UnknownContentId(content_id.clone()));
        }
        if registry.is_singleton(content_id) && registry.is_live(content_id) {
            if let Some(panel) = self.focus_content(content_id) {
                debug!(
                    %content_id,
                    "{}; focusing the existing tab",
                    DockError::DuplicateSingleton(content_id.clone())
                );
                return Ok(panel);
            }
        }

        let (target, area) = target.unwrap_or((self.center, DockArea::Center));
        if !self.is_reachable(target) {
            return Err(DockError::StaleTarget);
        }

        let panel = match area {
            DockArea::Center => {
                let panel = self
                    .first_panel_under(target)
                    .ok_or(DockError::InvalidTreeShape("window without a panel group"))?;
                self.add_tab(registry, panel, content_id)?;
                panel
            }
            _ => {
                let payload = registry.acquire(content_id)?;
                let title = registry.title(content_id).unwrap_or(content_id.as_str()).to_owned();
                let mut group = PanelGroup::new();
                group
                    .add_tab(Tab { title, content_id: content_id.clone(), payload }, false)
                    .expect("uniqueness policy disabled");
                let node = self.forest.insert_root(DockNode::Panel(group));
                if let Err(err) = self.dock(node, target, area) {
                    // Roll back so the payload is not stranded in an orphan.
                    if let Some(DockNode::Panel(mut group)) =
                        self.forest.remove_subtree(node).pop()
                    {
                        let tab = group.remove_tab(0);
                        registry.release(&tab.content_id, tab.payload);
                    }
                    return Err(err);
                }
                node
            }
        };
        self.emit(DockEvent::PanelAdded(content_id.clone()));
        Ok(panel)
    }

    /// Appends a registry-created tab to an existing panel group.
    pub fn add_tab(
        &mut self,
        registry: &mut ContentRegistry,
        panel: NodeId,
        content_id: &ContentId,
    ) -> Result<usize, DockError> {
        if !self.is_reachable(panel) || !self.forest[panel].is_panel() {
            return Err(DockError::StaleTarget);
        }
        let title = registry.title(content_id).unwrap_or(content_id.as_str()).to_owned();
        // Check the title policy before acquiring so a rejection never
        // strands a payload outside the tree.
        let group = self.forest[panel].as_panel().expect("checked above");
        if self.settings.unique_tab_titles && group.has_title(&title) {
            warn!(%content_id, title, "rejected duplicate tab title");
            return Err(DockError::DuplicateTitle(title));
        }
        let payload = registry.acquire(content_id)?;
        let group = self.forest[panel].as_panel_mut().expect("checked above");
        let index = group
            .add_tab(Tab { title, content_id: content_id.clone(), payload }, false)
            .expect("collision checked above");
        Ok(index)
    }

    /// Closes the tab at `index`, releasing its payload to the registry.
    pub fn close_tab(
        &mut self,
        registry: &mut ContentRegistry,
        panel: NodeId,
        index: usize,
    ) -> Result<(), DockError> {
        let Some(group) = self.forest.get_mut(panel).and_then(|n| n.as_panel_mut()) else {
            return Err(DockError::StaleTarget);
        };
        if index >= group.tabs.len() {
            return Err(DockError::StaleTarget);
        }
        let tab = group.remove_tab(index);
        let content_id = tab.content_id.clone();
        registry.release(&tab.content_id, tab.payload);
        self.emit(DockEvent::PanelRemoved(content_id));
        self.after_tab_removed(panel);
        Ok(())
    }

    /// Closes the tab hosting `content_id`, wherever it is.
    pub fn remove_content(&mut self, registry: &mut ContentRegistry, content_id: &ContentId) -> bool {
        match self.find_content(content_id) {
            Some((panel, index)) => self.close_tab(registry, panel, index).is_ok(),
            None => false,
        }
    }

    pub fn select_tab(&mut self, panel: NodeId, index: usize) {
        if let Some(group) = self.forest.get_mut(panel).and_then(|n| n.as_panel_mut()) {
            group.select(index);
        }
    }

    pub fn move_tab(&mut self, panel: NodeId, from: usize, to: usize) {
        if let Some(group) = self.forest.get_mut(panel).and_then(|n| n.as_panel_mut()) {
            group.move_tab(from, to);
        }
    }

    /// Rips the tab at `index` out into a new floating group positioned at
    /// the source group's screen location. Interactive detaches mark the
    /// clone translucent and protect the source from cleanup until the
    /// gesture ends.
    pub fn detach(&mut self, panel: NodeId, index: usize, interactive: bool) -> Option<NodeId> {
        let geometry = self.frame_of(panel).unwrap_or(self.main_geometry);
        let group = self.forest.get_mut(panel).and_then(|n| n.as_panel_mut())?;
        if !group.detachable || index >= group.tabs.len() {
            return None;
        }
        let tab = group.remove_tab(index);
        debug!(content_id = %tab.content_id, interactive, "detaching tab into floating group");

        let mut detached = PanelGroup::new();
        detached.add_tab(tab, false).expect("uniqueness policy disabled");
        let node = self.forest.insert_root(DockNode::Panel(detached));
        let mut flags = WindowFlags::FLOATING;
        if interactive {
            flags |= WindowFlags::TRANSLUCENT;
        }
        self.floating.push(TopLevel { node, geometry, flags });

        if interactive {
            self.protected = Some(panel);
        } else {
            self.after_tab_removed(panel);
        }
        Some(node)
    }

    /// Promotes an embedded panel group to its own floating window without
    /// touching its tabs.
    pub fn make_floating(&mut self, panel: NodeId) -> Result<(), DockError> {
        if !self.is_reachable(panel) {
            return Err(DockError::StaleTarget);
        }
        let Some(group) = self.forest[panel].as_panel() else {
            return Err(DockError::StaleTarget);
        };
        if group.is_center {
            return Err(DockError::StaleTarget);
        }
        if self.forest.parent(panel).is_none() {
            // Already a top-level window.
            return Ok(());
        }
        let geometry = self.frame_of(panel).unwrap_or(self.main_geometry);
        self.split_remove(panel);
        self.floating.push(TopLevel {
            node: panel,
            geometry,
            flags: WindowFlags::FLOATING,
        });
        Ok(())
    }

    /// Docks the top-level group `group` at `area` relative to `target`.
    ///
    /// `Center` merges tabs into the target's panel group; directional
    /// areas insert a sibling when the enclosing split already runs along
    /// the same axis and otherwise wrap the target in a new split, keeping
    /// the tree minimal.
    pub fn dock(&mut self, group: NodeId, target: NodeId, area: DockArea) -> Result<(), DockError> {
        if !self.forest.contains(group) || !self.is_reachable(target) {
            warn!("dock target vanished mid-gesture");
            return Err(DockError::StaleTarget);
        }
        if self.forest.ancestors(target).any(|a| a == group) {
            // Dropping a window onto itself.
            return Err(DockError::StaleTarget);
        }
        if self.forest.parent(group).is_some() {
            return Err(DockError::StaleTarget);
        }

        match area.orientation() {
            None => self.merge_into(group, target),
            Some(orientation) => {
                self.remove_floating_entry(group);
                self.insert_beside(group, target, orientation, area.is_leading());
                Ok(())
            }
        }
    }

    /// Adjusts the proportional share of `split`'s child at `index`.
    pub fn resize(&mut self, split: NodeId, index: usize, delta: f64) {
        let min = self.settings.min_pane_fraction;
        if let Some(container) = self.forest.get_mut(split).and_then(|n| n.as_split_mut()) {
            container.resize(index, delta, min);
        }
    }

    // --- drag support -----------------------------------------------------

    pub(crate) fn move_floating_to(&mut self, root: NodeId, pos: Point) {
        if let Some(entry) = self.floating_entry_mut(root) {
            let width = entry.geometry.width();
            entry.geometry.origin = Point::new(pos.x - width / 2.0, pos.y - 10.0);
        }
    }

    /// Turns the drag clone into an ordinary floating window.
    pub(crate) fn settle_floating(&mut self, root: NodeId) {
        if let Some(entry) = self.floating_entry_mut(root) {
            entry.flags.remove(WindowFlags::TRANSLUCENT);
        }
        self.raise(root);
    }

    /// Ends the drag-protection window and runs the deferred cleanup on the
    /// source panel.
    pub(crate) fn clear_drag_protection(&mut self) {
        if let Some(panel) = self.protected.take() {
            self.after_tab_removed(panel);
        }
    }

    #[cfg(test)]
    pub(crate) fn protected(&self) -> Option<NodeId> { self.protected }

    // --- structural plumbing ----------------------------------------------

    pub(crate) fn first_panel_under(&self, node: NodeId) -> Option<NodeId> {
        self.forest
            .preorder(node)
            .into_iter()
            .find(|&n| self.forest[n].is_panel())
    }

    fn remove_floating_entry(&mut self, root: NodeId) {
        if let Some(index) = self.floating_index_of(root) {
            self.floating.remove(index);
        }
    }

    /// Merges every tab of `group`'s subtree into the panel at `target`.
    /// Tabs whose content id already lives in the target stay where they
    /// are, which makes re-dropping a window onto its own tabs a no-op.
    fn merge_into(&mut self, group: NodeId, target: NodeId) -> Result<(), DockError> {
        let target_panel = self
            .first_panel_under(target)
            .ok_or(DockError::InvalidTreeShape("window without a panel group"))?;

        let source_panels: Vec<NodeId> = self
            .forest
            .preorder(group)
            .into_iter()
            .filter(|&n| self.forest[n].is_panel())
            .collect();

        let mut moved_any = false;
        for source in source_panels {
            loop {
                let existing: Vec<ContentId> = self.forest[target_panel]
                    .as_panel()
                    .expect("panel checked")
                    .tabs
                    .iter()
                    .map(|t| t.content_id.clone())
                    .collect();
                let next = self.forest[source]
                    .as_panel()
                    .and_then(|src| src.tabs.iter().position(|t| !existing.contains(&t.content_id)));
                let Some(tab_index) = next else { break };
                let tab = self.forest[source]
                    .as_panel_mut()
                    .expect("panel checked")
                    .remove_tab(tab_index);
                let dst = self.forest[target_panel].as_panel_mut().expect("panel checked");
                let index = dst.add_tab(tab, false).expect("uniqueness policy disabled");
                dst.select(index);
                moved_any = true;
            }
        }

        if !moved_any {
            debug!("center drop moved nothing; leaving source window untouched");
            return Ok(());
        }

        // Sweep panels the merge emptied; the whole source window usually
        // goes away here.
        let emptied: Vec<NodeId> = self
            .forest
            .preorder(group)
            .into_iter()
            .filter(|&n| {
                self.forest[n]
                    .as_panel()
                    .is_some_and(|p| p.is_empty() && p.auto_delete)
            })
            .collect();
        for panel in emptied {
            self.after_tab_removed(panel);
        }
        let root = self.forest.root_of(target_panel);
        if root != self.main {
            self.raise(root);
        }
        Ok(())
    }

    /// Inserts `group` next to `target` along `orientation`, creating a new
    /// split only when the enclosing one runs the other way.
    fn insert_beside(
        &mut self,
        group: NodeId,
        target: NodeId,
        orientation: Orientation,
        leading: bool,
    ) {
        let parent = self.forest.parent(target);
        let same_axis = parent.and_then(|p| self.forest[p].as_split()).map(|s| s.orientation)
            == Some(orientation);

        if let (Some(parent), true) = (parent, same_axis) {
            let index = self.forest.child_index(target).expect("target has a parent");
            let insert_at = if leading { index } else { index + 1 };
            self.forest.attach(group, parent, insert_at);
            if let Some(split) = self.forest[parent].as_split_mut() {
                split.insert_size(insert_at, Some(index));
            }
            self.flatten(parent);
            return;
        }

        // Wrap the target in a new split with the requested orientation.
        let new_split = self
            .forest
            .insert_root(DockNode::Split(SplitContainer::new(orientation)));
        match self.forest.parent(target) {
            Some(parent) => {
                let index = self.forest.child_index(target).expect("target has a parent");
                self.forest.detach(target);
                // The new split inherits the target's share in its parent.
                self.forest.attach(new_split, parent, index);
            }
            None => {
                // Target is a top-level root; the split takes its place.
                if target == self.main {
                    self.main = new_split;
                } else if let Some(entry) = self.floating_entry_mut(target) {
                    entry.node = new_split;
                }
            }
        }
        let (first, second) = if leading { (group, target) } else { (target, group) };
        self.forest.attach(first, new_split, 0);
        self.forest.attach(second, new_split, 1);
        if let Some(split) = self.forest[new_split].as_split_mut() {
            split.sizes = vec![0.5, 0.5];
        }
        self.flatten(new_split);
    }

    /// Splices any child that is itself a split along the parent's axis
    /// directly into the parent, so consecutive same-orientation splits
    /// never nest. The spliced panes subdivide the share their split held.
    pub(crate) fn flatten(&mut self, parent: NodeId) {
        loop {
            let Some(split) = self.forest.get(parent).and_then(|n| n.as_split()) else {
                return;
            };
            let orientation = split.orientation;
            let nested = self.forest.children(parent).iter().position(|&c| {
                self.forest[c]
                    .as_split()
                    .is_some_and(|s| s.orientation == orientation)
            });
            let Some(index) = nested else { return };
            let child = self.forest.children(parent)[index];
            let grandchildren: Vec<NodeId> = self.forest.children(child).to_vec();
            let inner_sizes: Vec<f64> = self.forest[child]
                .as_split()
                .map(|s| s.sizes.clone())
                .unwrap_or_default();
            self.forest.detach(child);
            for (i, &pane) in grandchildren.iter().enumerate() {
                self.forest.detach(pane);
                self.forest.attach(pane, parent, index + i);
            }
            if let Some(split) = self.forest[parent].as_split_mut() {
                let share = if index < split.sizes.len() {
                    split.sizes.remove(index)
                } else {
                    1.0 / (split.sizes.len() + 1) as f64
                };
                let equal = 1.0 / grandchildren.len().max(1) as f64;
                for i in 0..grandchildren.len() {
                    let inner = inner_sizes.get(i).copied().unwrap_or(equal);
                    split.sizes.insert(index + i, inner * share);
                }
            }
            self.forest.remove_subtree(child);
        }
    }

    /// Empty-group check run after any tab removal.
    fn after_tab_removed(&mut self, panel: NodeId) {
        let Some(group) = self.forest.get(panel).and_then(|n| n.as_panel()) else {
            return;
        };
        if !group.is_empty() || !group.auto_delete || group.is_center {
            return;
        }
        if self.protected == Some(panel) {
            debug!("deferring empty-group cleanup; a drag references the panel");
            return;
        }
        self.remove_panel(panel);
    }

    fn remove_panel(&mut self, panel: NodeId) {
        debug_assert!(panel != self.center, "attempted to remove the center group");
        if self.forest.parent(panel).is_some() {
            self.split_remove(panel);
        } else {
            self.remove_floating_entry(panel);
        }
        self.forest.remove_subtree(panel);
    }

    /// Detaches `child` from its split parent, fixes the size list, and
    /// minimizes the parent. Runs synchronously so no caller can observe a
    /// non-minimized tree.
    fn split_remove(&mut self, child: NodeId) {
        let Some((parent, index)) = self.forest.detach(child) else {
            return;
        };
        if let Some(split) = self.forest[parent].as_split_mut() {
            split.remove_size(index);
        }
        self.minimize(parent);
    }

    /// Collapses a split left with fewer than two children. The permanent
    /// main split is exempt; a floating root hands its window over to the
    /// surviving child (geometry and flags included).
    fn minimize(&mut self, split: NodeId) {
        if split == self.main {
            return;
        }
        match self.forest.child_count(split) {
            n if n >= 2 => {}
            1 => {
                let child = self.forest.children(split)[0];
                self.forest.detach(child);
                match self.forest.parent(split) {
                    Some(parent) => {
                        let index = self.forest.child_index(split).expect("parent known");
                        self.forest.detach(split);
                        // The child inherits the split's share; the parent's
                        // size list is untouched.
                        self.forest.attach(child, parent, index);
                        self.forest.remove_subtree(split);
                        self.flatten(parent);
                    }
                    None => {
                        if let Some(entry) = self.floating_entry_mut(split) {
                            entry.node = child;
                        }
                        self.forest.remove_subtree(split);
                    }
                }
            }
            _ => {
                if self.forest.parent(split).is_some() {
                    self.split_remove(split);
                    self.forest.remove_subtree(split);
                } else {
                    self.remove_floating_entry(split);
                    self.forest.remove_subtree(split);
                }
            }
        }
    }

    // --- debugging ---------------------------------------------------------

    /// Ascii rendering of every window's tree, topmost floating last.
    pub fn draw_tree(&self) -> String {
        let mut out = String::new();
        ascii_tree::write_tree(&mut out, &self.ascii_node("main", self.main))
            .expect("writing to a String cannot fail");
        for (i, tl) in self.floating.iter().enumerate() {
            out.push('\n');
            let label = format!("floating {i}");
            ascii_tree::write_tree(&mut out, &self.ascii_node(&label, tl.node))
                .expect("writing to a String cannot fail");
        }
        out
    }

    fn ascii_node(&self, label: &str, node: NodeId) -> ascii_tree::Tree {
        match &self.forest[node] {
            DockNode::Panel(panel) => {
                let tabs: Vec<String> = panel
                    .tabs
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        if i == panel.current_index {
                            format!("[{}]", t.title)
                        } else {
                            t.title.clone()
                        }
                    })
                    .collect();
                let center = if panel.is_center { " center" } else { "" };
                ascii_tree::Tree::Leaf(vec![format!(
                    "{label} panel{center} {{{}}}",
                    tabs.join(", ")
                )])
            }
            DockNode::Split(split) => {
                let sizes: Vec<String> =
                    split.sizes.iter().map(|s| format!("{s:.2}")).collect();
                let desc = format!("{label} split {:?} [{}]", split.orientation, sizes.join(", "));
                let children = self
                    .forest
                    .children(node)
                    .iter()
                    .map(|&c| self.ascii_node("", c))
                    .collect();
                ascii_tree::Tree::Node(desc, children)
            }
        }
    }
}
