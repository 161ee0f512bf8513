//! Serializable mirror of the live dock tree.
//!
//! The format is JSON-representable and forward compatible: unknown fields
//! are ignored on read and optional fields default. Content is recorded by
//! id only; restoring reconciles the recorded ids against the payloads that
//! are currently live plus whatever the registry can create.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::area::Orientation;
use super::engine::{DockEvent, DockRoot};
use super::error::DockError;
use super::geometry::Rect;
use super::node::{DockNode, PanelGroup, SplitContainer, Tab, TopLevel, WindowFlags};
use super::registry::{ContentId, ContentRegistry};
use crate::common::collections::HashMap;
use crate::model::tree::NodeId;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LayoutState {
    pub main: TopLevelState,
    #[serde(default)]
    pub floating: Vec<TopLevelState>,
    /// Collapse flags of the host's property tree, serialized alongside the
    /// layout but otherwise opaque to the core.
    #[serde(default)]
    pub collapsed: Vec<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TopLevelState {
    #[serde(default)]
    pub geometry: Rect,
    #[serde(default)]
    pub window_flags: WindowFlags,
    pub node: NodeState,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeState {
    Split {
        orientation: Orientation,
        #[serde(default)]
        sizes: Vec<f64>,
        #[serde(default)]
        children: Vec<NodeState>,
    },
    Panel {
        #[serde(default)]
        current_index: usize,
        #[serde(default)]
        tabs: Vec<TabState>,
        #[serde(default = "default_true")]
        detachable: bool,
        #[serde(default = "default_true")]
        auto_delete: bool,
        #[serde(default)]
        is_center: bool,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TabState {
    pub title: String,
    pub content_id: ContentId,
}

fn default_true() -> bool { true }

impl LayoutState {
    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string_pretty(self) }

    pub fn from_json(s: &str) -> serde_json::Result<Self> { serde_json::from_str(s) }
}

/// Payloads harvested from the live tree before a rebuild, keyed by
/// content id and consumed as the serialized tree references them.
struct RestorePool {
    tabs: HashMap<ContentId, Tab>,
}

impl DockRoot {
    /// Depth-first encoding of the whole layout. Geometry and window flags
    /// are recorded for top-level nodes only.
    pub fn capture_state(&self) -> LayoutState {
        LayoutState {
            main: TopLevelState {
                geometry: self.main_geometry(),
                window_flags: WindowFlags::empty(),
                node: self.encode(self.main()),
            },
            floating: self
                .floating()
                .iter()
                .map(|tl| TopLevelState {
                    geometry: tl.geometry,
                    window_flags: tl.flags,
                    node: self.encode(tl.node),
                })
                .collect(),
            collapsed: self.collapsed.clone(),
        }
    }

    fn encode(&self, node: NodeId) -> NodeState {
        match &self.forest()[node] {
            DockNode::Split(split) => NodeState::Split {
                orientation: split.orientation,
                sizes: split.sizes.clone(),
                children: self
                    .forest()
                    .children(node)
                    .iter()
                    .map(|&c| self.encode(c))
                    .collect(),
            },
            DockNode::Panel(panel) => NodeState::Panel {
                current_index: panel.current_index,
                tabs: panel
                    .tabs
                    .iter()
                    .map(|t| TabState {
                        title: t.title.clone(),
                        content_id: t.content_id.clone(),
                    })
                    .collect(),
                detachable: panel.detachable,
                auto_delete: panel.auto_delete,
                is_center: panel.is_center,
            },
        }
    }

    /// Rebuilds the live tree from `state`.
    ///
    /// Live payloads are first detached into a pool without being
    /// destroyed; the serialized tree consumes pool entries by content id,
    /// unknown-to-the-pool ids are recreated via the registry factory, ids
    /// the registry does not know are skipped, and pool leftovers (content
    /// with no recorded position) are appended to the center group. Content
    /// can legitimately come and go between save and restore; none of these
    /// cases fails the whole restore.
    pub fn apply_state(&mut self, registry: &mut ContentRegistry, state: &LayoutState) {
        let mut pool = self.harvest(registry);
        let mut added = Vec::new();

        // Fresh structure; the old forest only held empty groups after the
        // harvest.
        let orientation = match &state.main.node {
            NodeState::Split { orientation, .. } => *orientation,
            NodeState::Panel { .. } => Orientation::Horizontal,
        };
        self.reset_structure(orientation);
        self.set_main_geometry(state.main.geometry);

        let mut center: Option<NodeId> = None;
        match &state.main.node {
            NodeState::Split { sizes, children, .. } => {
                let built: Vec<(NodeId, f64)> = children
                    .iter()
                    .enumerate()
                    .filter_map(|(i, child)| {
                        let share =
                            sizes.get(i).copied().unwrap_or(1.0 / children.len().max(1) as f64);
                        self.build_node(registry, &mut pool, &mut center, &mut added, child)
                            .map(|node| (node, share))
                    })
                    .collect();
                let main = self.main();
                for (i, (node, _)) in built.iter().enumerate() {
                    self.forest_mut().attach(*node, main, i);
                }
                let mut shares: Vec<f64> = built.iter().map(|(_, s)| *s).collect();
                let total: f64 = shares.iter().sum();
                if total <= f64::EPSILON {
                    shares = vec![1.0 / built.len().max(1) as f64; built.len()];
                }
                if let Some(split) = self.forest_mut()[main].as_split_mut() {
                    split.sizes = shares;
                    split.normalize();
                }
                self.flatten(main);
            }
            panel @ NodeState::Panel { .. } => {
                // Tolerate a host handing a bare panel as the main window.
                if let Some(node) =
                    self.build_node(registry, &mut pool, &mut center, &mut added, panel)
                {
                    let main = self.main();
                    self.forest_mut().attach(node, main, 0);
                    if let Some(split) = self.forest_mut()[main].as_split_mut() {
                        split.sizes = vec![1.0];
                    }
                }
            }
        }

        // The center group must exist even if the serialized layout never
        // mentioned one.
        let center = match center {
            Some(node) => node,
            None => {
                let main = self.main();
                let index = self.forest().child_count(main);
                let node =
                    self.forest_mut().insert_child(main, index, DockNode::Panel(PanelGroup::center()));
                if let Some(split) = self.forest_mut()[main].as_split_mut() {
                    split.insert_size(index, None);
                }
                node
            }
        };
        self.set_center(center);

        let mut live_center = Some(center);
        for tls in &state.floating {
            if let Some(node) =
                self.build_node(registry, &mut pool, &mut live_center, &mut added, &tls.node)
            {
                self.push_floating(TopLevel {
                    node,
                    geometry: tls.geometry,
                    flags: tls.window_flags,
                });
            }
        }

        // Content that existed before the restore but has no recorded
        // position lands in the center group.
        let mut leftovers: Vec<(ContentId, Tab)> = pool.tabs.drain().collect();
        leftovers.sort_by(|a, b| a.0.cmp(&b.0));
        for (content_id, tab) in leftovers {
            debug!(%content_id, "layout state had no position for live content; sending to center");
            if let Some(group) = self.forest_mut()[center].as_panel_mut() {
                group.add_tab(tab, false).expect("uniqueness policy disabled");
            }
        }

        self.collapsed = state.collapsed.clone();

        for content_id in added {
            self.emit(DockEvent::PanelAdded(content_id));
        }
    }

    /// Detaches every live payload into a restore pool. Duplicate content
    /// ids (which only a buggy host could produce) release the extras.
    fn harvest(&mut self, registry: &mut ContentRegistry) -> RestorePool {
        let mut tabs: HashMap<ContentId, Tab> = HashMap::default();
        for panel in self.all_panels() {
            let Some(group) = self.forest_mut()[panel].as_panel_mut() else { continue };
            for tab in group.tabs.drain(..) {
                if tabs.contains_key(&tab.content_id) {
                    warn!(content_id = %tab.content_id, "duplicate payload during harvest");
                    let Tab { content_id, payload, .. } = tab;
                    registry.release(&content_id, payload);
                } else {
                    tabs.insert(tab.content_id.clone(), tab);
                }
            }
        }
        RestorePool { tabs }
    }

    fn build_node(
        &mut self,
        registry: &mut ContentRegistry,
        pool: &mut RestorePool,
        center: &mut Option<NodeId>,
        added: &mut Vec<ContentId>,
        state: &NodeState,
    ) -> Option<NodeId> {
        match state {
            NodeState::Panel {
                current_index,
                tabs,
                detachable,
                auto_delete,
                is_center,
            } => {
                // Center entries anywhere in the input all redirect to the
                // one live center group.
                if *is_center && center.is_some() {
                    let node = center.expect("checked above");
                    self.fill_panel(registry, pool, added, node, tabs, *current_index);
                    return None;
                }
                let mut group =
                    if *is_center { PanelGroup::center() } else { PanelGroup::new() };
                if !*is_center {
                    group.detachable = *detachable;
                    group.auto_delete = *auto_delete;
                }
                let node = self.forest_mut().insert_root(DockNode::Panel(group));
                self.fill_panel(registry, pool, added, node, tabs, *current_index);
                if *is_center {
                    *center = Some(node);
                    return Some(node);
                }
                let built = self.forest()[node].as_panel().expect("just built");
                if built.is_empty() && built.auto_delete {
                    self.forest_mut().remove_subtree(node);
                    return None;
                }
                Some(node)
            }
            NodeState::Split {
                orientation,
                sizes,
                children,
            } => {
                let built: Vec<(NodeId, f64)> = children
                    .iter()
                    .enumerate()
                    .filter_map(|(i, child)| {
                        let share =
                            sizes.get(i).copied().unwrap_or(1.0 / children.len().max(1) as f64);
                        self.build_node(registry, pool, center, added, child)
                            .map(|node| (node, share))
                    })
                    .collect();
                match built.len() {
                    0 => None,
                    // A split reduced to one survivor collapses away, same
                    // as live-tree minimization.
                    1 => Some(built[0].0),
                    _ => {
                        let node = self
                            .forest_mut()
                            .insert_root(DockNode::Split(SplitContainer::new(*orientation)));
                        for (i, (child, _)) in built.iter().enumerate() {
                            self.forest_mut().attach(*child, node, i);
                        }
                        if let Some(split) = self.forest_mut()[node].as_split_mut() {
                            split.sizes = built.iter().map(|(_, s)| *s).collect();
                            split.normalize();
                        }
                        // A hand-edited snapshot may nest same-axis splits.
                        self.flatten(node);
                        Some(node)
                    }
                }
            }
        }
    }

    fn fill_panel(
        &mut self,
        registry: &mut ContentRegistry,
        pool: &mut RestorePool,
        added: &mut Vec<ContentId>,
        node: NodeId,
        tabs: &[TabState],
        current_index: usize,
    ) {
        for tab_state in tabs {
            let tab = match pool.tabs.remove(&tab_state.content_id) {
                Some(tab) => tab,
                None => match registry.acquire(&tab_state.content_id) {
                    Ok(payload) => {
                        added.push(tab_state.content_id.clone());
                        Tab {
                            title: tab_state.title.clone(),
                            content_id: tab_state.content_id.clone(),
                            payload,
                        }
                    }
                    Err(err) => {
                        // Per policy this drops the tab, never the restore.
                        warn!(
                            content_id = %tab_state.content_id,
                            %err,
                            "skipping serialized tab"
                        );
                        debug_assert!(matches!(err, DockError::UnknownContentId(_)));
                        continue;
                    }
                },
            };
            if let Some(group) = self.forest_mut()[node].as_panel_mut() {
                // Merges tolerate duplicate ids by keeping the first.
                if group.tab_index_of(&tab.content_id).is_some() {
                    let Tab { content_id, payload, .. } = tab;
                    registry.release(&content_id, payload);
                    continue;
                }
                group.add_tab(tab, false).expect("uniqueness policy disabled");
            }
        }
        if let Some(group) = self.forest_mut()[node].as_panel_mut() {
            if !group.tabs.is_empty() {
                group.current_index = current_index.min(group.tabs.len() - 1);
            }
        }
    }
}
