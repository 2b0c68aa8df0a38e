use serde::Serialize;

use crate::config::LayoutConfig;
use crate::ir::{DepthPolicy, NodeId};
use crate::tween::{Progress, Tween};

use super::text::TextStyle;

/// Animated presentation state of one tree node.
///
/// Angles are radians from the top of the chart, radii are fractions of the
/// chart radius. Flags with a `_prev` twin keep the value from the previous
/// layout pass so a renderer can cross-fade while `progress < 1`.
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub angle_start: Tween,
    pub angle_end: Tween,
    pub radius_inner: Tween,
    /// Tangential labels: distance of the baseline from the centre.
    /// Breadcrumbs: distance above the centre.
    pub label_radius: Tween,
    pub label_width: Tween,
    pub r: Tween,
    pub g: Tween,
    pub b: Tween,
    pub alpha_label: Tween,
    pub alpha_line: Tween,
    pub alpha_arc: Tween,
    pub alpha_wedge: Tween,
    pub alpha_other: Tween,
    pub alpha_pattern: Tween,

    pub hide: bool,
    pub hide_prev: bool,
    pub hide_alone: bool,
    pub hide_alone_prev: bool,
    pub keyed: bool,
    pub radial: bool,
    pub radial_prev: bool,
    pub breadcrumb: bool,
    /// Set on the first child of a merged run of hidden siblings: index (in
    /// the parent's child list) of the run's last member.
    pub hidden_end: Option<usize>,

    pub name_width: f64,
    pub key_label: String,
    pub key_name_width: f64,
}

impl NodeView {
    pub fn new(id: NodeId) -> Self {
        let fade_in = Tween {
            start: 0.0,
            end: 1.0,
        };
        Self {
            id,
            angle_start: Tween {
                start: std::f64::consts::PI,
                end: 0.0,
            },
            angle_end: Tween {
                start: std::f64::consts::PI,
                end: 0.0,
            },
            radius_inner: Tween::new(1.0),
            label_radius: Tween::new(1.0),
            label_width: Tween::new(0.0),
            r: Tween::new(255.0),
            g: Tween::new(255.0),
            b: Tween::new(255.0),
            alpha_label: fade_in,
            alpha_line: fade_in,
            alpha_arc: Tween::new(0.0),
            alpha_wedge: fade_in,
            alpha_other: Tween::new(0.0),
            alpha_pattern: Tween::new(0.0),
            hide: false,
            hide_prev: false,
            hide_alone: false,
            hide_alone_prev: false,
            keyed: false,
            radial: false,
            radial_prev: false,
            breadcrumb: false,
            hidden_end: None,
            name_width: 0.0,
            key_label: String::new(),
            key_name_width: 0.0,
        }
    }

    pub fn mid_angle_target(&self) -> f64 {
        (self.angle_start.end + self.angle_end.end) / 2.0
    }

    pub fn angle_width_target(&self) -> f64 {
        self.angle_end.end - self.angle_start.end
    }

    pub fn tweens(&self) -> [&Tween; 14] {
        [
            &self.angle_start,
            &self.angle_end,
            &self.radius_inner,
            &self.label_radius,
            &self.label_width,
            &self.r,
            &self.g,
            &self.b,
            &self.alpha_label,
            &self.alpha_line,
            &self.alpha_arc,
            &self.alpha_wedge,
            &self.alpha_other,
            &self.alpha_pattern,
        ]
    }

    /// Resolved values at `progress`, in chart-radius units.
    pub fn resolve(&self, progress: Progress) -> ResolvedView {
        ResolvedView {
            angle_start: self.angle_start.current(progress),
            angle_end: self.angle_end.current(progress),
            radius_inner: self.radius_inner.current(progress),
            label_radius: self.label_radius.current(progress),
            label_width: self.label_width.current(progress).max(0.0),
            rgb: [
                self.r.current(progress),
                self.g.current(progress),
                self.b.current(progress),
            ],
            alpha_label: self.alpha_label.current(progress),
            alpha_line: self.alpha_line.current(progress),
            alpha_arc: self.alpha_arc.current(progress),
            alpha_wedge: self.alpha_wedge.current(progress),
            alpha_other: self.alpha_other.current(progress),
            alpha_pattern: self.alpha_pattern.current(progress),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedView {
    pub angle_start: f64,
    pub angle_end: f64,
    pub radius_inner: f64,
    pub label_radius: f64,
    pub label_width: f64,
    pub rgb: [f64; 3],
    pub alpha_label: f64,
    pub alpha_line: f64,
    pub alpha_arc: f64,
    pub alpha_wedge: f64,
    pub alpha_other: f64,
    pub alpha_pattern: f64,
}

/// The part of the selected node not covered by its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Unclassified {
    pub arc: f64,
    pub angle: Option<f64>,
    pub can_display_label: bool,
    pub keyed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum KeyEntry {
    Node(NodeId),
    Unclassified(NodeId),
}

/// One legend row, in chart-local pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyBox {
    pub entry: KeyEntry,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub swatch_x: f64,
    pub swatch_size: f64,
}

impl KeyBox {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x > self.x && x < self.x + self.width && y > self.y && y < self.y + self.height
    }
}

/// Immutable per-frame input to [`super::SunburstLayout::update_view`].
#[derive(Debug, Clone)]
pub struct ViewContext<'a> {
    pub selected: NodeId,
    pub policy: DepthPolicy,
    pub use_hue: bool,
    pub show_keys: bool,
    pub text: TextStyle,
    pub width: f64,
    pub height: f64,
    pub progress: Progress,
    pub config: &'a LayoutConfig,
}

impl ViewContext<'_> {
    pub fn font_size(&self) -> f64 {
        self.text.font_size
    }

    /// Narrowest wedge, in pixels along its mid radius, worth labelling.
    pub fn min_width(&self) -> f64 {
        self.text.font_size * self.config.min_width_factor
    }

    pub fn min_dimension(&self) -> f64 {
        self.width.min(self.height).max(0.0)
    }

    pub fn buffer(&self) -> f64 {
        self.min_dimension() * self.config.buffer_factor
    }

    pub fn margin(&self) -> f64 {
        self.min_dimension() * self.config.margin_factor
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn chart_radius(&self) -> f64 {
        (self.min_dimension() / 2.0 - self.buffer()).max(1.0)
    }
}
