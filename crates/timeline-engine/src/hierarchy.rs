//! Parent/child structure and collapse state.
//!
//! [`Hierarchy`] is an arena over the caller's item slice: items are
//! addressed by their position, `parent_id` strings are resolved once through
//! an id map, and children are kept as index lists in input order. No item
//! ever embeds another, so cycles in the source data cannot become cycles in
//! memory.
//!
//! The arena tolerates bad links. An unresolved `parent_id` or an item that
//! names itself as parent becomes a root, and a loop of parent links is cut at
//! its lowest-index member.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::item::TimelineItem;

/// Resolved parent/child links for one item snapshot.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    levels: Vec<usize>,
}

impl Hierarchy {
    /// Resolve `parent_id` links and compute every item's depth.
    pub fn build(items: &[TimelineItem]) -> Self {
        let n = items.len();
        let mut index = HashMap::with_capacity(n);
        for (i, item) in items.iter().enumerate() {
            index.entry(item.id.clone()).or_insert(i);
        }

        let mut parents: Vec<Option<usize>> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let parent_id = item.parent_id.as_deref()?;
                match index.get(parent_id) {
                    Some(&p) if p != i => Some(p),
                    Some(_) => {
                        debug!(id = %item.id, "item lists itself as parent, placing at root");
                        None
                    }
                    None => {
                        debug!(id = %item.id, parent_id, "parent not found, placing at root");
                        None
                    }
                }
            })
            .collect();

        break_cycles(items, &mut parents);

        let mut children = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) => children[*p].push(i),
                None => roots.push(i),
            }
        }

        let mut levels = vec![0; n];
        let mut stack: Vec<usize> = roots.clone();
        while let Some(i) = stack.pop() {
            for &child in &children[i] {
                levels[child] = levels[i] + 1;
                stack.push(child);
            }
        }

        for (i, item) in items.iter().enumerate() {
            if item.hierarchy_level != levels[i] {
                debug!(
                    id = %item.id,
                    stored = item.hierarchy_level,
                    computed = levels[i],
                    "ignoring stale hierarchy level"
                );
            }
        }

        Self {
            ids: items.iter().map(|item| item.id.clone()).collect(),
            index,
            parents,
            children,
            roots,
            levels,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Depth from the nearest root (0 for roots).
    pub fn level(&self, index: usize) -> usize {
        self.levels.get(index).copied().unwrap_or(0)
    }

    /// Number of direct children of `id`; 0 for unknown ids.
    pub fn child_count(&self, id: &str) -> usize {
        self.index_of(id).map_or(0, |i| self.children[i].len())
    }

    /// Whether `id` gets a collapse affordance.
    pub fn has_children(&self, id: &str) -> bool {
        self.child_count(id) >= 1
    }

    /// Every descendant of `index`, depth-first in display order.
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children(index).iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.children[i].iter().rev());
        }
        out
    }

    /// Rows to draw, depth-first, skipping everything under a collapsed item.
    ///
    /// Siblings keep their relative order from the input slice.
    pub fn visible_rows(&self, collapse: &CollapseState) -> Vec<VisibleRow> {
        let mut rows = Vec::with_capacity(self.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            let has_children = !self.children[i].is_empty();
            let collapsed = has_children && collapse.is_collapsed(&self.ids[i]);
            rows.push(VisibleRow {
                index: i,
                level: self.levels[i],
                has_children,
                collapsed,
            });
            if !collapsed {
                stack.extend(self.children[i].iter().rev());
            }
        }
        rows
    }
}

/// Cut every loop of parent links by turning its lowest-index member into a
/// root.
fn break_cycles(items: &[TimelineItem], parents: &mut [Option<usize>]) {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; parents.len()];
    for start in 0..parents.len() {
        let mut path: Vec<usize> = Vec::new();
        let mut cursor = Some(start);
        while let Some(i) = cursor {
            match state[i] {
                DONE => break,
                ON_PATH => {
                    let cut = path
                        .iter()
                        .position(|&p| p == i)
                        .and_then(|pos| path[pos..].iter().copied().min());
                    if let Some(cut) = cut {
                        warn!(id = %items[cut].id, "parent links form a cycle, placing at root");
                        parents[cut] = None;
                    }
                    break;
                }
                _ => {
                    state[i] = ON_PATH;
                    path.push(i);
                    cursor = parents[i];
                }
            }
        }
        for i in path {
            state[i] = DONE;
        }
    }
}

/// One entry of [`Hierarchy::visible_rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleRow {
    /// Position of the item in the snapshot slice.
    pub index: usize,
    pub level: usize,
    pub has_children: bool,
    pub collapsed: bool,
}

/// Per-parent collapsed flags. Ids missing from the map are expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollapseState {
    collapsed: HashMap<String, bool>,
}

impl CollapseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.get(id).copied().unwrap_or(false)
    }

    /// Flip `id` and return its new collapsed flag.
    ///
    /// Returns `None` without touching the state when `id` has no children,
    /// which happens when the last child disappears between a render and a
    /// click.
    pub fn toggle(&mut self, hierarchy: &Hierarchy, id: &str) -> Option<bool> {
        if !hierarchy.has_children(id) {
            debug!(id, "collapse toggle on item without children ignored");
            return None;
        }
        let flag = self.collapsed.entry(id.to_string()).or_insert(false);
        *flag = !*flag;
        Some(*flag)
    }

    /// Drop entries for ids that are no longer parents in `hierarchy`.
    pub fn retain_parents(&mut self, hierarchy: &Hierarchy) {
        self.collapsed.retain(|id, _| hierarchy.has_children(id));
    }

    pub fn is_empty(&self) -> bool {
        self.collapsed.values().all(|collapsed| !collapsed)
    }
}
