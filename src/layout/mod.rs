mod label_placement;
mod radii;
mod targets;
pub mod text;
pub(crate) mod types;
pub use label_placement::{LabelSlot, LabelTracks, fit_label_pair, shorten_label};
pub use radii::{RingRadii, compute_radii, label_offset_counts, ring_radii};
pub use text::{TextStyle, format_percentage, text_width};
pub use types::*;

use std::f64::consts::TAU;

use crate::ir::{DepthPolicy, NodeId, ROOT, Tree};
use crate::tween::{Progress, Tween};
use targets::TargetPass;

/// Rings deeper than this share the last lightness step.
const LIGHTNESS_STEPS: usize = 8;

/// Screen point at `angle` (radians clockwise from the top) and `distance`
/// from `center`.
pub fn polar(center: (f64, f64), distance: f64, angle: f64) -> (f64, f64) {
    (center.0 + distance * angle.sin(), center.1 - distance * angle.cos())
}

/// Inverse of [`polar`]: the angle in `[0, 2π)` and the distance of `(x, y)`.
pub fn polar_of(center: (f64, f64), x: f64, y: f64) -> (f64, f64) {
    let dx = x - center.0;
    let dy = y - center.1;
    let angle = dx.atan2(-dy).rem_euclid(TAU);
    (angle, dx.hypot(dy))
}

/// A merged run of hidden siblings, drawn as one "N more" wedge.
#[derive(Debug, Clone, PartialEq)]
pub struct HiddenRun {
    pub parent: NodeId,
    pub members: Vec<NodeId>,
    pub angle_start: f64,
    pub angle_end: f64,
    /// Fraction of the chart radius.
    pub radius_inner: f64,
}

impl HiddenRun {
    pub fn first(&self) -> NodeId {
        self.members[0]
    }

    pub fn label(&self) -> String {
        format!("{} more", self.members.len())
    }
}

/// Label box of an ancestor drawn above the centre disc, in chart-local
/// pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Breadcrumb {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Breadcrumb {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x > self.x && x < self.x + self.width && y > self.y && y < self.y + self.height
    }
}

/// Animated layout of a whole tree around the selected node.
///
/// One [`NodeView`] per tree node, indexed by [`NodeId`]. Each call to
/// [`SunburstLayout::update_view`] retargets every tween from wherever it is
/// on screen at the given progress.
#[derive(Debug, Clone)]
pub struct SunburstLayout {
    pub views: Vec<NodeView>,
    /// Chart radius in pixels.
    pub radius: Tween,
    pub radii: Vec<f64>,
    pub label_counts: Vec<usize>,
    pub angle_factor: f64,
    pub lightness_factor: f64,
    pub keys: Vec<NodeId>,
    pub key_boxes: Vec<KeyBox>,
    pub unclassified: Unclassified,
    pub selected: NodeId,
    pub width: f64,
    pub height: f64,
    pub font_size: f64,
    pub ellipsis_width: f64,
    pub depth_fit_iterations: usize,
    pub hidden_groups: usize,
    font_size_last: Option<f64>,
}

impl SunburstLayout {
    pub fn new(tree: &Tree) -> Self {
        Self {
            views: (0..tree.len()).map(NodeView::new).collect(),
            radius: Tween::new(0.0),
            radii: Vec::new(),
            label_counts: Vec::new(),
            angle_factor: 0.0,
            lightness_factor: 0.0,
            keys: Vec::new(),
            key_boxes: Vec::new(),
            unclassified: Unclassified::default(),
            selected: ROOT,
            width: 0.0,
            height: 0.0,
            font_size: 0.0,
            ellipsis_width: 0.0,
            depth_fit_iterations: 0,
            hidden_groups: 0,
            font_size_last: None,
        }
    }

    /// Assigns new targets for every node.
    pub fn update_view(&mut self, tree: &Tree, ctx: &ViewContext<'_>) {
        if self.views.len() != tree.len() {
            self.views = (0..tree.len()).map(NodeView::new).collect();
        }
        let selected = if ctx.selected < tree.len() { ctx.selected } else { ROOT };
        let ctx = &ViewContext {
            selected,
            ..ctx.clone()
        };
        let progress = ctx.progress;
        let config = ctx.config;
        let font_size = ctx.font_size();

        let radius = ctx.chart_radius();
        self.radius.set_target(radius, progress);
        self.selected = selected;
        self.width = ctx.width;
        self.height = ctx.height;

        let magnitude = tree.node(selected).magnitude;
        self.angle_factor = if magnitude > 0.0 { TAU / magnitude } else { 0.0 };

        let fit = compute_radii(tree, ctx, radius, self.angle_factor);
        self.depth_fit_iterations = fit.iterations;
        self.radii = fit.radii;
        let steps = self.radii.len().clamp(1, LIGHTNESS_STEPS);
        self.lightness_factor = (config.lightness_max - config.lightness_base) / steps as f64;
        self.ellipsis_width = ctx.text.width("...");
        self.label_counts = label_offset_counts(&self.radii, radius, font_size, config.max_label_offsets);

        let font_size_changed = self.font_size_last.is_some_and(|last| last != font_size);
        self.font_size_last = Some(font_size);
        self.font_size = font_size;

        let mut pass = TargetPass {
            tree,
            ctx,
            views: &mut self.views,
            radii: &self.radii,
            tracks: LabelTracks::new(&self.label_counts),
            label_counts: &self.label_counts,
            angle_factor: self.angle_factor,
            radius,
            lightness_factor: self.lightness_factor,
            font_size_changed,
            keys: Vec::new(),
            unclassified: Unclassified::default(),
            hidden_groups: 0,
        };
        pass.set_targets(ROOT);
        let keys = std::mem::take(&mut pass.keys);
        let unclassified = pass.unclassified;
        let hidden_groups = pass.hidden_groups;

        self.keys = keys;
        self.unclassified = unclassified;
        self.hidden_groups = hidden_groups;
        self.key_boxes = self.compute_key_boxes(tree, ctx);

        log::debug!(
            "layout: selected '{}', {} rings in {} passes, {} keys, {} hidden groups",
            tree.node(selected).name,
            self.radii.len(),
            self.depth_fit_iterations,
            self.key_boxes.len(),
            self.hidden_groups
        );
    }

    pub fn view(&self, id: NodeId) -> &NodeView {
        &self.views[id]
    }

    pub fn max_display_depth(&self) -> usize {
        self.radii.len()
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Ring index of `id` counted from the selected node, which is 1.
    pub fn relative_depth(&self, tree: &Tree, id: NodeId, policy: DepthPolicy) -> isize {
        tree.display_depth(id, policy) as isize - tree.display_depth(self.selected, policy) as isize + 1
    }

    /// Text to draw for `id` at `progress`: tangential labels of nodes other
    /// than the selected one are shortened to their current width.
    pub fn display_label(&self, tree: &Tree, id: NodeId, progress: Progress) -> String {
        let view = &self.views[id];
        let name = &tree.node(id).name;
        if view.radial || id == self.selected || view.breadcrumb {
            return name.clone();
        }
        shorten_label(
            name,
            view.name_width,
            view.label_width.current(progress).max(0.0),
            self.ellipsis_width,
        )
    }

    /// Hidden sibling runs of `parent` that are drawable at `progress`.
    pub fn hidden_runs(&self, tree: &Tree, parent: NodeId, progress: Progress) -> Vec<HiddenRun> {
        let children = &tree.node(parent).children;
        let mut runs = Vec::new();
        let mut index = 0;
        while index < children.len() {
            let first = &self.views[children[index]];
            let Some(end) = first.hidden_end.filter(|end| *end < children.len() && *end >= index) else {
                index += 1;
                continue;
            };
            let members = &children[index..=end];
            let settled = first.radius_inner.current(progress) != 1.0
                && members.iter().all(|member| {
                    let view = &self.views[*member];
                    view.hide && (view.hide_prev || progress.is_done())
                });
            if settled {
                runs.push(HiddenRun {
                    parent,
                    members: members.to_vec(),
                    angle_start: first.angle_start.current(progress),
                    angle_end: self.views[children[end]].angle_end.current(progress),
                    radius_inner: first.radius_inner.current(progress),
                });
            }
            index = end + 1;
        }
        runs
    }

    /// Whether a breadcrumb at `label_radius` still fits inside the centre
    /// disc.
    pub fn can_display_history(&self, label_radius: f64, progress: Progress) -> bool {
        let radius = self.radius.current(progress);
        let inner = self.radii.first().copied().unwrap_or(0.0);
        label_radius * radius + self.history_height() / 2.0 < inner * radius
    }

    fn history_height(&self) -> f64 {
        self.font_size * 1.6
    }

    /// Ancestor labels stacked above the centre, nearest first.
    pub fn breadcrumbs(&self, tree: &Tree, policy: DepthPolicy, progress: Progress) -> Vec<Breadcrumb> {
        let (cx, cy) = self.center();
        let radius = self.radius.current(progress);
        let height = self.history_height();
        let mut crumbs = Vec::new();
        let mut current = tree.display_parent(self.selected, policy);
        while let Some(id) = current {
            let view = &self.views[id];
            let label_radius = view.label_radius.current(progress);
            if !view.breadcrumb || !self.can_display_history(label_radius, progress) {
                break;
            }
            let y = cy - label_radius * radius;
            crumbs.push(Breadcrumb {
                id,
                x: cx - view.name_width / 2.0,
                y: y - height / 2.0,
                width: view.name_width,
                height,
            });
            current = tree.display_parent(id, policy);
        }
        crumbs
    }

    fn compute_key_boxes(&self, tree: &Tree, ctx: &ViewContext<'_>) -> Vec<KeyBox> {
        if !ctx.show_keys {
            return Vec::new();
        }
        let mut entries: Vec<(KeyEntry, String, f64)> = self
            .keys
            .iter()
            .map(|id| {
                let view = &self.views[*id];
                (KeyEntry::Node(*id), view.key_label.clone(), view.key_name_width)
            })
            .collect();
        if self.unclassified.keyed {
            let node = tree.node(self.selected);
            let percent = if node.magnitude > 0.0 && self.angle_factor > 0.0 {
                self.unclassified.arc / self.angle_factor / node.magnitude * 100.0
            } else {
                0.0
            };
            let label = format!("[unassigned {}]   {}%", node.name, format_percentage(percent));
            let width = ctx.text.width(&label);
            entries.push((KeyEntry::Unclassified(self.selected), label, width));
        }
        if entries.is_empty() {
            return Vec::new();
        }

        let count = entries.len() as f64;
        let margin = ctx.margin();
        let size = ((ctx.height - margin * 3.0) / 2.0 / count * 3.0 / 4.0)
            .min(ctx.font_size() * ctx.config.max_key_size_factor)
            .max(0.0);
        let buffer = size / 3.0;
        let x_max = ctx.width - margin;
        let swatch_x = ctx.width - size - margin;

        entries
            .into_iter()
            .enumerate()
            .map(|(index, (entry, label, name_width))| {
                let row = index as f64 + 1.0;
                let y = ctx.height - (count - row + 1.0) * (size + buffer) + buffer - margin;
                let x = swatch_x - name_width - buffer;
                KeyBox {
                    entry,
                    label,
                    x,
                    y,
                    width: x_max - x,
                    height: size,
                    swatch_x,
                    swatch_size: size,
                }
            })
            .collect()
    }
}
