use serde::Serialize;

use crate::config::LayoutConfig;
use crate::ir::{DepthPolicy, NodeId, ROOT, Tree};
use crate::layout::{TextStyle, ViewContext};
use crate::theme::Theme;
use crate::tween::Progress;

/// Shallowest depth ceiling: the root plus one ring.
pub const MIN_ABSOLUTE_DEPTH: usize = 2;
pub const MIN_FONT_SIZE: f64 = 1.0;

/// Live option values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOptions {
    pub collapse: bool,
    pub font_size: f64,
    pub max_absolute_depth: usize,
    pub use_hue: bool,
    pub show_keys: bool,
    pub dataset: usize,
    pub search: String,
    pub width: f64,
    pub height: f64,
}

impl ViewOptions {
    pub fn new(theme: &Theme, width: f64, height: f64) -> Self {
        Self {
            collapse: true,
            font_size: theme.font_size,
            max_absolute_depth: usize::MAX,
            use_hue: false,
            show_keys: true,
            dataset: 0,
            search: String::new(),
            width,
            height,
        }
    }
}

/// Selection, history, pointer state and option values carried between
/// frames.
#[derive(Debug, Clone)]
pub struct AppState {
    pub selected: NodeId,
    pub selected_last: Option<NodeId>,
    /// The last selection change moved toward the root.
    pub zoom_out: bool,
    pub focus: NodeId,
    pub highlighted: Option<NodeId>,
    pub options: ViewOptions,
    pub search_results: usize,
    history: Vec<NodeId>,
    history_position: usize,
}

impl AppState {
    /// Clamps `options` against `tree` and syncs the tree's derived fields
    /// with the options' dataset and depth ceiling.
    pub fn new(tree: &mut Tree, options: ViewOptions) -> Self {
        let mut state = Self {
            selected: ROOT,
            selected_last: None,
            zoom_out: false,
            focus: ROOT,
            highlighted: None,
            options,
            search_results: 0,
            history: Vec::new(),
            history_position: 0,
        };
        state.options.font_size = state.options.font_size.max(MIN_FONT_SIZE);
        state.options.max_absolute_depth = clamp_depth(tree, state.options.max_absolute_depth);
        state.options.dataset = state.options.dataset.min(tree.dataset_count() - 1);
        if tree.hue_spec.is_none() {
            state.options.use_hue = false;
        }
        tree.set_dataset(state.options.dataset, state.options.max_absolute_depth);
        state
    }

    pub fn policy(&self) -> DepthPolicy {
        DepthPolicy {
            collapse: self.options.collapse,
            max_absolute_depth: self.options.max_absolute_depth,
        }
    }

    pub fn view_context<'a>(&self, config: &'a LayoutConfig, theme: &Theme, progress: Progress) -> ViewContext<'a> {
        ViewContext {
            selected: self.selected,
            policy: self.policy(),
            use_hue: self.options.use_hue,
            show_keys: self.options.show_keys,
            text: TextStyle::new(self.options.font_size, theme.font_family.clone(), config.fast_text_metrics),
            width: self.options.width,
            height: self.options.height,
            progress,
            config,
        }
    }

    pub fn history(&self) -> &[NodeId] {
        &self.history
    }

    pub fn can_go_back(&self) -> bool {
        self.history_position > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.history_position + 1 < self.history.len()
    }

    /// Selects `id`, branching history at the current position. Returns
    /// whether the selection changed; re-selecting is a no-op.
    pub fn select(&mut self, tree: &Tree, id: NodeId) -> bool {
        if id == self.selected || id >= tree.len() {
            return false;
        }
        self.history.truncate(self.history_position);
        self.history.push(self.selected);
        self.history_position += 1;
        self.set_selected(tree, id);
        true
    }

    /// Starts the view on `id` without recording the root in history.
    pub fn open_at(&mut self, tree: &Tree, id: NodeId) {
        if id >= tree.len() {
            return;
        }
        self.selected = id;
        self.selected_last = None;
        self.zoom_out = false;
        self.focus = id;
    }

    pub fn back(&mut self, tree: &Tree) -> bool {
        if !self.can_go_back() {
            return false;
        }
        if self.history_position == self.history.len() {
            self.history.push(self.selected);
        } else {
            self.history[self.history_position] = self.selected;
        }
        self.history_position -= 1;
        let target = self.history[self.history_position];
        self.reveal(tree, target);
        self.set_selected(tree, target);
        true
    }

    pub fn forward(&mut self, tree: &Tree) -> bool {
        if !self.can_go_forward() {
            return false;
        }
        self.history_position += 1;
        let target = self.history[self.history_position];
        if self.history_position + 1 == self.history.len() {
            self.history.truncate(self.history_position);
        }
        self.reveal(tree, target);
        self.set_selected(tree, target);
        true
    }

    pub fn up(&mut self, tree: &Tree) -> bool {
        match tree.display_parent(self.selected, self.policy()) {
            Some(parent) => self.select(tree, parent),
            None => false,
        }
    }

    /// A history entry may be a node that collapsing hides.
    fn reveal(&mut self, tree: &Tree, target: NodeId) {
        if self.options.collapse && tree.node(target).collapse {
            log::debug!("collapse turned off to show '{}'", tree.node(target).name);
            self.options.collapse = false;
        }
    }

    fn set_selected(&mut self, tree: &Tree, id: NodeId) {
        self.zoom_out = tree.has_ancestor(self.selected, id);
        self.selected_last = Some(self.selected);
        self.selected = id;
        if self.focus != id && !tree.has_ancestor(self.focus, id) {
            self.focus = id;
        }
    }

    pub fn set_focus(&mut self, tree: &Tree, id: NodeId) {
        if id < tree.len() {
            self.focus = id;
        }
    }

    /// Returns whether the highlighted node changed.
    pub fn set_highlighted(&mut self, id: Option<NodeId>) -> bool {
        if self.highlighted == id {
            return false;
        }
        self.highlighted = id;
        true
    }

    /// Moves the selection off a node that cannot root a view: down a
    /// collapsed single-child chain, or from a leaf to its parent.
    pub fn check_selected_collapse(&mut self, tree: &Tree) -> bool {
        let mut target = self.selected;
        while tree.is_collapsed(target, self.policy()) {
            match tree.node(target).children.first() {
                Some(child) => target = *child,
                None => break,
            }
        }
        if tree.node(target).children.is_empty()
            && let Some(parent) = tree.display_parent(target, self.policy())
        {
            target = parent;
        }
        self.select(tree, target)
    }

    /// Walks the selection up until it has a ring of children inside the
    /// depth ceiling.
    pub fn update_max_absolute_depth(&mut self, tree: &Tree) -> bool {
        let mut target = self.selected;
        while tree.node(target).depth + 1 > self.options.max_absolute_depth {
            match tree.node(target).parent {
                Some(parent) => target = parent,
                None => break,
            }
        }
        if target == self.selected {
            return false;
        }
        self.selected_last = Some(self.selected);
        self.zoom_out = true;
        self.selected = target;
        if tree.has_ancestor(self.focus, target) || self.focus == target {
            return true;
        }
        self.focus = target;
        true
    }

    pub fn set_max_absolute_depth(&mut self, tree: &mut Tree, depth: usize) -> bool {
        let depth = clamp_depth(tree, depth);
        if depth == self.options.max_absolute_depth {
            return false;
        }
        self.options.max_absolute_depth = depth;
        tree.set_max_depths(depth);
        self.update_max_absolute_depth(tree);
        true
    }

    pub fn increase_depth(&mut self, tree: &mut Tree) -> bool {
        let depth = self.options.max_absolute_depth.saturating_add(1);
        self.set_max_absolute_depth(tree, depth)
    }

    pub fn decrease_depth(&mut self, tree: &mut Tree) -> bool {
        let depth = self.options.max_absolute_depth.saturating_sub(1);
        self.set_max_absolute_depth(tree, depth)
    }

    pub fn set_font_size(&mut self, size: f64) -> bool {
        let size = if size.is_finite() { size.max(MIN_FONT_SIZE) } else { MIN_FONT_SIZE };
        if size == self.options.font_size {
            return false;
        }
        self.options.font_size = size;
        true
    }

    pub fn increase_font(&mut self) -> bool {
        self.set_font_size(self.options.font_size + 1.0)
    }

    pub fn decrease_font(&mut self) -> bool {
        self.set_font_size(self.options.font_size - 1.0)
    }

    pub fn set_collapse(&mut self, tree: &mut Tree, collapse: bool) -> bool {
        if collapse == self.options.collapse {
            return false;
        }
        self.options.collapse = collapse;
        self.check_selected_collapse(tree);
        self.rerun_search(tree);
        true
    }

    pub fn set_dataset(&mut self, tree: &mut Tree, dataset: usize) -> bool {
        let dataset = dataset.min(tree.dataset_count() - 1);
        if dataset == self.options.dataset {
            return false;
        }
        self.options.dataset = dataset;
        tree.set_dataset(dataset, self.options.max_absolute_depth);
        self.check_selected_collapse(tree);
        true
    }

    pub fn search(&mut self, tree: &mut Tree, query: &str) -> usize {
        self.options.search = query.to_string();
        self.rerun_search(tree)
    }

    fn rerun_search(&mut self, tree: &mut Tree) -> usize {
        self.search_results = tree.search(&self.options.search, self.policy());
        self.search_results
    }
}

/// Depth ceilings run from one ring below the root to the deepest leaf.
pub fn clamp_depth(tree: &Tree, depth: usize) -> usize {
    let deepest = tree.root().max_depth.max(MIN_ABSOLUTE_DEPTH);
    depth.clamp(MIN_ABSOLUTE_DEPTH, deepest)
}
