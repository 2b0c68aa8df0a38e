use std::collections::VecDeque;
use std::time::Duration;

use crate::animation::Scheduler;
use crate::config::Config;
use crate::error::LoadError;
use crate::hit::{HitTarget, hit_test};
use crate::ir::{NodeId, Tree};
use crate::layout::SunburstLayout;
use crate::link::Link;
use crate::parser::{DocumentDefaults, parse_tree};
use crate::state::{AppState, ViewOptions};
use crate::tween::Progress;

/// A state change requested by the host. Queued by [`Sunburst::push`] and
/// applied at the start of the next [`Sunburst::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Select(NodeId),
    Back,
    Forward,
    Up,
    PointerMove { x: f64, y: f64 },
    PointerDown { x: f64, y: f64 },
    PointerUp,
    PointerLeave,
    Resize { width: f64, height: f64 },
    SetFontSize(f64),
    IncreaseFont,
    DecreaseFont,
    SetMaxDepth(usize),
    IncreaseDepth,
    DecreaseDepth,
    SetCollapse(bool),
    SetUseHue(bool),
    SetShowKeys(bool),
    SetDataset(usize),
    NextDataset,
    PreviousDataset,
    Search(String),
    ApplyLink(String),
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub redraw: bool,
    pub progress: Progress,
    pub next_tick: Option<Duration>,
}

/// One interactive chart: the tree, its animated layout and everything the
/// host can change about it.
#[derive(Debug, Clone)]
pub struct Sunburst {
    tree: Tree,
    state: AppState,
    layout: SunburstLayout,
    scheduler: Scheduler,
    config: Config,
    intents: VecDeque<Intent>,
    update_view_needed: bool,
    redraw_needed: bool,
    pointer: Option<(f64, f64)>,
    pointer_down_at: Option<Duration>,
    quick_look: bool,
    now: Duration,
    layout_passes: usize,
}

impl Sunburst {
    pub fn new(mut tree: Tree, defaults: &DocumentDefaults, config: Config) -> Self {
        let mut options = ViewOptions::new(&config.theme, config.render.width, config.render.height);
        options.collapse = defaults.collapse.unwrap_or(true);
        options.show_keys = defaults.show_keys.unwrap_or(true);
        options.use_hue = defaults.use_hue;
        let state = AppState::new(&mut tree, options);
        let layout = SunburstLayout::new(&tree);
        let scheduler = Scheduler::new(&config.layout);
        Self {
            tree,
            state,
            layout,
            scheduler,
            config,
            intents: VecDeque::new(),
            update_view_needed: true,
            redraw_needed: true,
            pointer: None,
            pointer_down_at: None,
            quick_look: false,
            now: Duration::ZERO,
            layout_passes: 0,
        }
    }

    pub fn from_document(input: &str, config: Config) -> Result<Self, LoadError> {
        let parsed = parse_tree(input)?;
        Ok(Self::new(parsed.tree, &parsed.defaults, config))
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn layout(&self) -> &SunburstLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn progress(&self) -> Progress {
        self.scheduler.progress()
    }

    /// Last pointer position, cleared by a re-layout.
    pub fn pointer(&self) -> Option<(f64, f64)> {
        self.pointer
    }

    pub fn is_quick_look(&self) -> bool {
        self.quick_look
    }

    /// Number of layout passes run so far.
    pub fn layout_passes(&self) -> usize {
        self.layout_passes
    }

    pub fn link(&self) -> String {
        Link::from_state(&self.state).to_query()
    }

    pub fn push(&mut self, intent: Intent) {
        self.intents.push_back(intent);
    }

    /// Applies queued intents, starts a quick look once the pointer has
    /// been held long enough, re-lays out at most once, then advances the
    /// animation.
    pub fn tick(&mut self, now: Duration) -> Frame {
        self.now = self.now.max(now);
        let now = self.now;

        while let Some(intent) = self.intents.pop_front() {
            self.apply(intent, now);
        }
        self.check_quick_look(now);
        if self.update_view_needed {
            self.update_view(now);
        }

        let tick = self.scheduler.tick(now);
        let redraw = tick.redraw || std::mem::take(&mut self.redraw_needed);
        Frame {
            redraw,
            progress: tick.progress,
            next_tick: tick.next_tick,
        }
    }

    /// Runs pending work and jumps to the end of the animation.
    pub fn settle(&mut self) -> Frame {
        let now = self.now;
        self.tick(now);
        let end = now + self.scheduler.tween_length();
        self.tick(end)
    }

    fn update_view(&mut self, now: Duration) {
        self.state.check_selected_collapse(&self.tree);
        self.state.update_max_absolute_depth(&self.tree);
        let focus = self.state.focus;
        if self.tree.is_collapsed(focus, self.state.policy())
            || self.tree.node(focus).depth > self.state.options.max_absolute_depth
        {
            self.state.focus = self.state.selected;
        }

        // retarget from what is on screen right now
        let on_screen = self.scheduler.progress();
        let ctx = self.state.view_context(&self.config.layout, &self.config.theme, on_screen);
        self.layout.update_view(&self.tree, &ctx);
        self.scheduler.restart(now);
        self.update_view_needed = false;
        self.layout_passes += 1;
        self.pointer = None;
    }

    fn check_quick_look(&mut self, now: Duration) {
        let Some(down_at) = self.pointer_down_at else {
            return;
        };
        let focus = self.state.focus;
        let hold = Duration::from_secs_f64(self.config.layout.quick_look_hold_ms.max(0.0) / 1000.0);
        if self.quick_look || focus == self.state.selected || now.saturating_sub(down_at) <= hold {
            return;
        }
        if self.tree.has_children(focus, self.state.policy()) && self.state.select(&self.tree, focus) {
            log::debug!("quick look at '{}'", self.tree.node(focus).name);
            self.quick_look = true;
            self.update_view_needed = true;
        }
    }

    fn apply(&mut self, intent: Intent, now: Duration) {
        let relayout = match intent {
            Intent::Select(id) => self.state.select(&self.tree, id),
            Intent::Back => self.state.back(&self.tree),
            Intent::Forward => self.state.forward(&self.tree),
            Intent::Up => self.state.up(&self.tree),
            Intent::PointerMove { x, y } => {
                self.pointer_moved(x, y);
                false
            }
            Intent::PointerDown { x, y } => {
                self.pointer_moved(x, y);
                self.pointer_down(now)
            }
            Intent::PointerUp => {
                self.pointer_down_at = None;
                if self.quick_look {
                    self.quick_look = false;
                    self.state.back(&self.tree)
                } else {
                    false
                }
            }
            Intent::PointerLeave => {
                self.pointer = None;
                self.pointer_down_at = None;
                if self.state.set_highlighted(None) {
                    self.redraw_needed = true;
                }
                false
            }
            Intent::Resize { width, height } => {
                self.state.options.width = width.max(0.0);
                self.state.options.height = height.max(0.0);
                true
            }
            Intent::SetFontSize(size) => self.state.set_font_size(size),
            Intent::IncreaseFont => self.state.increase_font(),
            Intent::DecreaseFont => self.state.decrease_font(),
            Intent::SetMaxDepth(depth) => self.state.set_max_absolute_depth(&mut self.tree, depth),
            Intent::IncreaseDepth => self.state.increase_depth(&mut self.tree),
            Intent::DecreaseDepth => self.state.decrease_depth(&mut self.tree),
            Intent::SetCollapse(collapse) => self.state.set_collapse(&mut self.tree, collapse),
            Intent::SetUseHue(use_hue) => {
                let use_hue = use_hue && self.tree.hue_spec.is_some();
                let changed = use_hue != self.state.options.use_hue;
                self.state.options.use_hue = use_hue;
                changed
            }
            Intent::SetShowKeys(show) => {
                let changed = show != self.state.options.show_keys;
                self.state.options.show_keys = show;
                changed
            }
            Intent::SetDataset(dataset) => {
                if self.layout_passes == 0 {
                    self.tree.sort(dataset.min(self.tree.dataset_count() - 1));
                }
                self.state.set_dataset(&mut self.tree, dataset)
            }
            Intent::NextDataset => {
                let next = (self.state.options.dataset + 1) % self.tree.dataset_count();
                self.state.set_dataset(&mut self.tree, next)
            }
            Intent::PreviousDataset => {
                let count = self.tree.dataset_count();
                let previous = (self.state.options.dataset + count - 1) % count;
                self.state.set_dataset(&mut self.tree, previous)
            }
            Intent::Search(query) => {
                let found = self.state.search(&mut self.tree, &query);
                log::debug!("search '{query}': {found} matches");
                self.redraw_needed = true;
                false
            }
            Intent::ApplyLink(query) => {
                let link = Link::parse(&query);
                if self.layout_passes == 0 {
                    link.open(&mut self.tree, &mut self.state);
                } else {
                    link.apply(&mut self.tree, &mut self.state);
                }
                true
            }
        };
        if relayout {
            self.update_view_needed = true;
        }
    }

    fn pointer_moved(&mut self, x: f64, y: f64) {
        self.pointer = Some((x, y));
        if self.quick_look {
            return;
        }
        let hit = self.hit(x, y).map(|target| target.node());
        if self.state.set_highlighted(hit) && self.scheduler.is_idle() {
            self.redraw_needed = true;
        }
    }

    /// Clicking the focused node or a breadcrumb expands it; clicking
    /// anything else focuses it and may start a quick look.
    fn pointer_down(&mut self, now: Duration) -> bool {
        let Some(target) = self.state.highlighted else {
            return false;
        };
        let state = &mut self.state;
        let tree = &self.tree;
        let expand = (target == state.focus && state.focus != state.selected) || tree.has_ancestor(state.selected, target);
        if expand {
            let destination = if tree.has_children(target, state.policy()) {
                Some(target)
            } else {
                tree.display_parent(target, state.policy())
            };
            return destination.is_some_and(|id| state.select(tree, id));
        }
        if self.scheduler.is_idle() {
            state.set_focus(tree, target);
            self.pointer_down_at = Some(now);
            self.redraw_needed = true;
        }
        false
    }

    /// Hit test against what is on screen now.
    pub fn hit(&self, x: f64, y: f64) -> Option<HitTarget> {
        hit_test(
            &self.tree,
            &self.layout,
            self.state.policy(),
            x,
            y,
            self.scheduler.progress(),
        )
    }
}
