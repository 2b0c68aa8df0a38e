use std::f64::consts::{PI, TAU};
use std::path::Path;

use anyhow::Result;

use crate::config::{Config, RenderConfig};
use crate::ir::{DepthPolicy, NodeId, Tree};
use crate::layout::{KeyEntry, ResolvedView, SunburstLayout, polar};
use crate::session::Sunburst;
use crate::state::AppState;
use crate::theme::{Theme, hue_string, rgb_string};
use crate::tween::Progress;

/// Alphas below this are not worth emitting.
const MIN_ALPHA: f64 = 0.01;

/// Settled snapshot of a session.
pub fn render_snapshot(session: &Sunburst) -> String {
    render_svg(session.tree(), session.layout(), session.state(), session.config())
}

pub fn render_svg(tree: &Tree, layout: &SunburstLayout, state: &AppState, config: &Config) -> String {
    render_frame(tree, layout, state, config, Progress::DONE)
}

/// SVG of the chart as it looks at `progress`.
pub fn render_frame(
    tree: &Tree,
    layout: &SunburstLayout,
    state: &AppState,
    config: &Config,
    progress: Progress,
) -> String {
    let theme = &config.theme;
    let painter = Painter {
        tree,
        layout,
        state,
        config,
        theme,
        policy: state.policy(),
        progress,
        center: layout.center(),
        radius: layout.radius.current(progress),
        font_size: layout.font_size,
    };
    let width = layout.width.max(1.0);
    let height = layout.height.max(1.0);
    let selected = tree.node(layout.selected);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.2}\" height=\"{h:.2}\" viewBox=\"0 0 {w:.2} {h:.2}\" font-family=\"{font}\" font-size=\"{size:.2}\">",
        w = width,
        h = height,
        font = escape_xml(&theme.font_family),
        size = painter.font_size
    ));
    svg.push_str(&format!(
        "<title>Sunburst (snapshot) - {}</title>",
        escape_xml(&selected.name)
    ));
    painter.push_defs(&mut svg);
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.render.background
    ));

    svg.push_str("<g class=\"wedges\">");
    painter.push_wedges(&mut svg, layout.selected);
    painter.push_unclassified(&mut svg);
    svg.push_str("</g>");

    painter.push_reference_circles(&mut svg);

    svg.push_str("<g class=\"labels\">");
    painter.push_labels(&mut svg, layout.selected);
    painter.push_selected_label(&mut svg);
    painter.push_breadcrumbs(&mut svg);
    svg.push_str("</g>");

    painter.push_keys(&mut svg);
    if state.options.use_hue {
        painter.push_hue_legend(&mut svg);
    }
    painter.push_search_summary(&mut svg);
    svg.push_str("</svg>");
    svg
}

struct Painter<'a> {
    tree: &'a Tree,
    layout: &'a SunburstLayout,
    state: &'a AppState,
    config: &'a Config,
    theme: &'a Theme,
    policy: DepthPolicy,
    progress: Progress,
    center: (f64, f64),
    radius: f64,
    font_size: f64,
}

impl Painter<'_> {
    fn push_defs(&self, svg: &mut String) {
        svg.push_str("<defs>");
        svg.push_str(&format!(
            "<pattern id=\"hiddenPattern\" patternUnits=\"userSpaceOnUse\" width=\"6\" height=\"6\"><path d=\"M0,6 L6,0 M-1,1 L1,-1 M5,7 L7,5\" stroke=\"{}\" stroke-width=\"1\"/></pattern>",
            self.theme.pattern_color
        ));
        if let (true, Some(spec)) = (self.state.options.use_hue, self.tree.hue_spec.as_ref()) {
            let layout_cfg = &self.config.layout;
            let lightness = (layout_cfg.lightness_base + layout_cfg.lightness_max) / 2.0;
            // top of the legend is the end of the range
            svg.push_str("<linearGradient id=\"hueGradient\" x1=\"0\" y1=\"1\" x2=\"0\" y2=\"0\">");
            for (offset, hue) in spec.stops() {
                svg.push_str(&format!(
                    "<stop offset=\"{offset:.4}\" stop-color=\"{}\"/>",
                    hue_string(hue, layout_cfg.saturation, lightness)
                ));
            }
            svg.push_str("</linearGradient>");
        }
        svg.push_str("</defs>");
    }

    fn is_drawn(&self, id: NodeId) -> bool {
        let view = self.layout.view(id);
        !view.hide
            && view.radius_inner.end < 1.0
            && self.tree.node(id).magnitude > 0.0
            && (id == self.layout.selected || !self.tree.is_collapsed(id, self.policy))
    }

    /// A subtree that is being hidden keeps drawing until its tween ends.
    fn draws_children(&self, id: NodeId) -> bool {
        let view = self.layout.view(id);
        let in_flight = !self.progress.is_done();
        (!view.hide || (!view.hide_prev && in_flight)) && (!view.hide_alone || (!view.hide_alone_prev && in_flight))
    }

    /// The previous selection while the view zooms out past it.
    fn is_leaving(&self, id: NodeId) -> bool {
        !self.progress.is_done() && self.state.zoom_out && self.state.selected_last == Some(id)
    }

    fn push_wedges(&self, svg: &mut String, id: NodeId) {
        let view = self.layout.view(id);
        if view.radius_inner.end >= 1.0 {
            return;
        }
        let node = self.tree.node(id);
        if self.is_drawn(id) {
            let current = view.resolve(self.progress);
            let inner = current.radius_inner * self.radius;
            let path = annulus_path(
                self.center,
                inner,
                self.radius,
                current.angle_start,
                current.angle_end,
            );
            if current.alpha_wedge > MIN_ALPHA {
                let [r, g, b] = current.rgb;
                svg.push_str(&format!(
                    "<path d=\"{path}\" fill=\"{}\" fill-opacity=\"{:.3}\"/>",
                    rgb_string(r, g, b),
                    current.alpha_wedge
                ));
            }
            if current.alpha_pattern > MIN_ALPHA {
                svg.push_str(&format!(
                    "<path d=\"{path}\" fill=\"url(#hiddenPattern)\" opacity=\"{:.3}\"/>",
                    current.alpha_pattern
                ));
            }
            if node.is_search_result {
                svg.push_str(&format!(
                    "<path d=\"{path}\" fill=\"{}\" fill-opacity=\"0.35\"/>",
                    self.theme.search_highlight
                ));
            }
            if self.state.highlighted == Some(id) && id != self.layout.selected && !self.is_leaving(id) {
                svg.push_str(&format!(
                    "<path d=\"{path}\" fill=\"{}\" fill-opacity=\"0.3\"/>",
                    self.theme.highlight_fill
                ));
            }
        }

        if self.draws_children(id) {
            for child in &node.children {
                self.push_wedges(svg, *child);
            }
            for run in self.layout.hidden_runs(self.tree, id, self.progress) {
                let current = self.layout.view(run.first()).resolve(self.progress);
                let path = annulus_path(
                    self.center,
                    run.radius_inner * self.radius,
                    self.radius,
                    run.angle_start,
                    run.angle_end,
                );
                let [r, g, b] = current.rgb;
                svg.push_str(&format!(
                    "<path class=\"hidden-run\" d=\"{path}\" fill=\"{}\" fill-opacity=\"{:.3}\"/>",
                    rgb_string(r, g, b),
                    current.alpha_wedge.max(MIN_ALPHA)
                ));
                svg.push_str(&format!(
                    "<path d=\"{path}\" fill=\"url(#hiddenPattern)\" opacity=\"{:.3}\"/>",
                    current.alpha_pattern
                ));
            }
        }
        if self.is_drawn(id) && id != self.layout.selected {
            self.push_lines(svg, id);
        }
    }

    fn push_lines(&self, svg: &mut String, id: NodeId) {
        let current = self.layout.view(id).resolve(self.progress);
        let inner = current.radius_inner * self.radius;
        let stroke = &self.theme.line_color;
        if current.alpha_arc > MIN_ALPHA && inner > 0.0 {
            let (start, end) = clamp_full_circle(current.angle_start, current.angle_end, self.radius);
            let (x0, y0) = polar(self.center, inner, start);
            let (x1, y1) = polar(self.center, inner, end);
            svg.push_str(&format!(
                "<path d=\"M{x0:.2},{y0:.2} A{inner:.2},{inner:.2} 0 {} 1 {x1:.2},{y1:.2}\" fill=\"none\" stroke=\"{stroke}\" stroke-opacity=\"{:.3}\"/>",
                large_arc(start, end),
                current.alpha_arc
            ));
        }
        if current.alpha_line > MIN_ALPHA {
            let (x0, y0) = polar(self.center, inner, current.angle_end);
            let (x1, y1) = polar(self.center, self.radius, current.angle_end);
            svg.push_str(&format!(
                "<line x1=\"{x0:.2}\" y1=\"{y0:.2}\" x2=\"{x1:.2}\" y2=\"{y1:.2}\" stroke=\"{stroke}\" stroke-opacity=\"{:.3}\"/>",
                current.alpha_line
            ));
        }
    }

    /// The slice of the selected node its children do not cover.
    fn push_unclassified(&self, svg: &mut String) {
        let unclassified = self.layout.unclassified;
        if unclassified.arc <= 0.0 {
            return;
        }
        let selected = self.layout.view(self.layout.selected).resolve(self.progress);
        if selected.alpha_other <= MIN_ALPHA {
            return;
        }
        let inner = self.layout.radii.first().copied().unwrap_or(1.0) * self.radius;
        let end = selected.angle_end;
        let path = annulus_path(self.center, inner, self.radius, end - unclassified.arc, end);
        svg.push_str(&format!(
            "<path class=\"unclassified\" d=\"{path}\" fill=\"{}\" fill-opacity=\"{:.3}\" stroke=\"{}\"/>",
            self.theme.unclassified_color, selected.alpha_other, self.theme.line_color
        ));
    }

    fn push_reference_circles(&self, svg: &mut String) {
        let (cx, cy) = self.center;
        let inner = self.layout.radii.first().copied().unwrap_or(0.0) * self.radius;
        svg.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{inner:.2}\" fill=\"{}\" stroke=\"{}\"/>",
            self.config.render.background, self.theme.line_color
        ));
        svg.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"none\" stroke=\"{}\"/>",
            self.radius, self.theme.line_color
        ));
    }

    fn push_labels(&self, svg: &mut String, id: NodeId) {
        let view = self.layout.view(id);
        if view.radius_inner.end >= 1.0 {
            return;
        }
        let node = self.tree.node(id);
        if self.is_drawn(id) && id != self.layout.selected {
            let current = view.resolve(self.progress);
            let switching = view.radial != view.radial_prev;
            // a label changing orientation fades between both forms
            let alpha = if switching && view.alpha_label.end == 1.0 {
                self.progress.factor
            } else {
                current.alpha_label
            };
            self.push_label(svg, id, &current, view.radial, alpha);
            if switching && view.alpha_label.start == 1.0 && !self.progress.is_done() {
                self.push_label(svg, id, &current, view.radial_prev, 1.0 - self.progress.factor);
            }
        }
        if !self.draws_children(id) {
            return;
        }
        for child in &node.children {
            self.push_labels(svg, *child);
        }
        for run in self.layout.hidden_runs(self.tree, id, self.progress) {
            let mid = (run.angle_start + run.angle_end) / 2.0;
            let distance = (run.radius_inner + 1.0) / 2.0 * self.radius;
            let arc = (run.angle_end - run.angle_start) * distance;
            if arc >= self.font_size {
                self.push_radial_text(svg, &run.label(), mid, distance, 1.0, false);
            }
        }
        if id == self.layout.selected
            && let Some(angle) = self.layout.unclassified.angle
        {
            let inner = self.layout.radii.first().copied().unwrap_or(1.0);
            let text = format!("[unassigned {}]", node.name);
            self.push_radial_text(svg, &text, angle, (inner + 1.0) / 2.0 * self.radius, 1.0, false);
        }
    }

    fn push_label(&self, svg: &mut String, id: NodeId, current: &ResolvedView, radial: bool, alpha: f64) {
        if alpha <= MIN_ALPHA {
            return;
        }
        let node = self.tree.node(id);
        let mid = (current.angle_start + current.angle_end) / 2.0;
        if radial {
            let text = node.name.clone();
            let distance = (current.radius_inner + 1.0) / 2.0 * self.radius;
            self.push_radial_text(svg, &text, mid, distance, alpha, node.is_search_result);
            return;
        }
        let distance = current.label_radius * self.radius;
        let text = if self.is_leaving(id) {
            node.name.clone()
        } else {
            self.layout.display_label(self.tree, id, self.progress)
        };
        if !self.is_leaving(id) {
            self.push_tick(svg, current, mid, distance, alpha);
        }
        self.push_tangential_text(svg, &text, mid, distance, alpha, node.is_search_result);
    }

    /// Tick from the wedge's inner edge up to a label pushed outward onto
    /// another track.
    fn push_tick(&self, svg: &mut String, current: &ResolvedView, mid: f64, distance: f64, alpha: f64) {
        let inner = current.radius_inner * self.radius;
        let arc = (current.angle_end - current.angle_start) * distance;
        if current.label_width <= arc || distance - inner <= self.font_size {
            return;
        }
        let (x0, y0) = polar(self.center, inner, mid);
        let (x1, y1) = polar(self.center, distance - self.font_size * 0.7, mid);
        svg.push_str(&format!(
            "<line x1=\"{x0:.2}\" y1=\"{y0:.2}\" x2=\"{x1:.2}\" y2=\"{y1:.2}\" stroke=\"{}\" stroke-opacity=\"{:.3}\"/>",
            self.theme.line_color, alpha
        ));
    }

    fn push_radial_text(&self, svg: &mut String, text: &str, angle: f64, distance: f64, alpha: f64, found: bool) {
        let (x, y) = polar(self.center, distance, angle);
        let degrees = angle.to_degrees();
        // keep text upright on the left half
        let rotation = if angle > PI { degrees + 90.0 } else { degrees - 90.0 };
        self.push_text(svg, text, x, y, rotation, alpha, found);
    }

    fn push_tangential_text(
        &self,
        svg: &mut String,
        text: &str,
        angle: f64,
        distance: f64,
        alpha: f64,
        found: bool,
    ) {
        let (x, y) = polar(self.center, distance, angle);
        let degrees = angle.to_degrees();
        let rotation = if angle > PI / 2.0 && angle < PI * 1.5 {
            degrees - 180.0
        } else {
            degrees
        };
        self.push_text(svg, text, x, y, rotation, alpha, found);
    }

    #[allow(clippy::too_many_arguments)]
    fn push_text(&self, svg: &mut String, text: &str, x: f64, y: f64, rotation: f64, alpha: f64, found: bool) {
        let weight = if found { " font-weight=\"bold\"" } else { "" };
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{y:.2}\" transform=\"rotate({rotation:.2} {x:.2} {y:.2})\" text-anchor=\"middle\" dominant-baseline=\"middle\" fill=\"{}\" fill-opacity=\"{alpha:.3}\"{weight}>{}</text>",
            self.theme.text_color,
            escape_xml(text)
        ));
    }

    fn push_selected_label(&self, svg: &mut String) {
        let node = self.tree.node(self.layout.selected);
        let (cx, cy) = self.center;
        svg.push_str(&format!(
            "<text x=\"{cx:.2}\" y=\"{cy:.2}\" text-anchor=\"middle\" font-weight=\"bold\" fill=\"{}\">{}</text>",
            self.theme.text_color,
            escape_xml(&node.name)
        ));
        let attribute = self
            .tree
            .attributes
            .get(self.tree.magnitude_attribute)
            .map(|attribute| attribute.display.as_str())
            .unwrap_or("");
        let magnitude = format_magnitude(node.magnitude);
        let caption = if attribute.is_empty() {
            magnitude
        } else {
            format!("{attribute}: {magnitude}")
        };
        svg.push_str(&format!(
            "<text x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\" fill=\"{}\">{}</text>",
            cy + self.font_size * 1.4,
            self.theme.text_color,
            escape_xml(&caption)
        ));
    }

    fn push_breadcrumbs(&self, svg: &mut String) {
        for crumb in self.layout.breadcrumbs(self.tree, self.policy, self.progress) {
            let view = self.layout.view(crumb.id);
            let alpha = view.alpha_label.current(self.progress);
            if alpha <= MIN_ALPHA {
                continue;
            }
            let fill = if self.state.highlighted == Some(crumb.id) {
                format!(" fill=\"{}\"", self.theme.highlight_fill)
            } else {
                " fill=\"none\"".to_string()
            };
            svg.push_str(&format!(
                "<rect class=\"breadcrumb\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\"{fill}/>",
                crumb.x, crumb.y, crumb.width, crumb.height
            ));
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"middle\" fill=\"{}\" fill-opacity=\"{alpha:.3}\">{}</text>",
                crumb.x + crumb.width / 2.0,
                crumb.y + crumb.height / 2.0,
                self.theme.text_color,
                escape_xml(&self.tree.node(crumb.id).name)
            ));
        }
    }

    fn push_keys(&self, svg: &mut String) {
        if self.layout.key_boxes.is_empty() {
            return;
        }
        svg.push_str("<g class=\"keys\">");
        for key in &self.layout.key_boxes {
            let (fill, angle) = match key.entry {
                KeyEntry::Node(id) => {
                    let current = self.layout.view(id).resolve(self.progress);
                    let [r, g, b] = current.rgb;
                    (rgb_string(r, g, b), (current.angle_start + current.angle_end) / 2.0)
                }
                KeyEntry::Unclassified(_) => {
                    let arc = self.layout.unclassified.arc;
                    (self.theme.unclassified_color.clone(), TAU - arc / 2.0)
                }
            };
            let row_y = key.y + key.height / 2.0;
            let (wx, wy) = polar(self.center, self.radius, angle);
            svg.push_str(&format!(
                "<polyline points=\"{wx:.2},{wy:.2} {:.2},{row_y:.2} {:.2},{row_y:.2}\" fill=\"none\" stroke=\"{}\"/>",
                key.x - key.swatch_size / 3.0,
                key.swatch_x,
                self.theme.line_color
            ));
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{size:.2}\" height=\"{size:.2}\" fill=\"{fill}\" stroke=\"{}\"/>",
                key.swatch_x,
                key.y,
                self.theme.line_color,
                size = key.swatch_size
            ));
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{row_y:.2}\" dominant-baseline=\"middle\" fill=\"{}\">{}</text>",
                key.x,
                self.theme.text_color,
                escape_xml(&key.label)
            ));
        }
        svg.push_str("</g>");
    }

    fn push_hue_legend(&self, svg: &mut String) {
        let Some(spec) = self.tree.hue_spec.as_ref() else {
            return;
        };
        let margin = self.layout.width.min(self.layout.height) * self.config.layout.margin_factor;
        let x = margin;
        let y = margin + self.font_size * 2.0;
        let width = self.font_size;
        let height = (self.layout.height / 3.0).min(200.0);
        let name = self
            .tree
            .attributes
            .get(spec.attribute)
            .map(|attribute| attribute.display.as_str())
            .unwrap_or("");
        svg.push_str("<g class=\"hue-legend\">");
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{:.2}\" fill=\"{}\">{}</text>",
            margin + self.font_size,
            self.theme.text_color,
            escape_xml(name)
        ));
        svg.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"url(#hueGradient)\" stroke=\"{}\"/>",
            self.theme.line_color
        ));
        for (value, value_y) in [(spec.value_end, y), (spec.value_start, y + height)] {
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{value_y:.2}\" dominant-baseline=\"middle\" fill=\"{}\">{}</text>",
                x + width * 1.5,
                self.theme.text_color,
                escape_xml(&format_magnitude(value))
            ));
        }
        svg.push_str("</g>");
    }

    fn push_search_summary(&self, svg: &mut String) {
        let query = &self.state.options.search;
        if query.is_empty() {
            return;
        }
        let count = self.state.search_results;
        let noun = if count == 1 { "result" } else { "results" };
        svg.push_str(&format!(
            "<text class=\"search\" x=\"{:.2}\" y=\"{:.2}\" fill=\"{}\">{count} {noun}</text>",
            self.font_size,
            self.layout.height - self.font_size,
            self.theme.text_color
        ));
    }
}

/// Closed path of the ring sector between `start` and `end` (radians
/// clockwise from the top) and the two radii.
fn annulus_path(center: (f64, f64), inner: f64, outer: f64, start: f64, end: f64) -> String {
    let (start, end) = clamp_full_circle(start, end, outer);
    let large = large_arc(start, end);
    let (ox0, oy0) = polar(center, outer, start);
    let (ox1, oy1) = polar(center, outer, end);
    if inner <= 0.0 {
        return format!(
            "M{:.2},{:.2} L{ox0:.2},{oy0:.2} A{outer:.2},{outer:.2} 0 {large} 1 {ox1:.2},{oy1:.2} Z",
            center.0, center.1
        );
    }
    let (ix0, iy0) = polar(center, inner, start);
    let (ix1, iy1) = polar(center, inner, end);
    format!(
        "M{ox0:.2},{oy0:.2} A{outer:.2},{outer:.2} 0 {large} 1 {ox1:.2},{oy1:.2} L{ix1:.2},{iy1:.2} A{inner:.2},{inner:.2} 0 {large} 0 {ix0:.2},{iy0:.2} Z"
    )
}

/// An SVG arc cannot close on itself; full circles stop just short.
fn clamp_full_circle(start: f64, end: f64, radius: f64) -> (f64, f64) {
    if end - start >= TAU - 1e-9 {
        (start, start + TAU - 0.1 / radius.max(1.0))
    } else {
        (start, end)
    }
}

fn large_arc(start: f64, end: f64) -> u8 {
    if end - start > PI { 1 } else { 0 }
}

fn format_magnitude(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.3}")
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options {
        font_family: theme.font_family.clone(),
        ..usvg::Options::default()
    };
    if let Some(size) = usvg::Size::from_wh(render_cfg.width as f32, render_cfg.height as f32) {
        opt.default_size = size;
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ROOT;
    use crate::parser::DocumentDefaults;
    use crate::session::Intent;
    use std::time::Duration;

    fn session(tree: Tree) -> Sunburst {
        let mut session = Sunburst::new(tree, &DocumentDefaults::default(), Config::default());
        session.settle();
        session
    }

    fn abc() -> Tree {
        let mut tree = Tree::with_magnitudes("all", 100.0);
        let a = tree.add_weighted(ROOT, "A", 60.0);
        tree.add_weighted(ROOT, "B & co", 30.0);
        tree.add_weighted(ROOT, "C", 10.0);
        tree.add_weighted(a, "A1", 40.0);
        tree.finalize(usize::MAX);
        tree
    }

    #[test]
    fn snapshot_has_title_and_wedges() {
        let svg = render_snapshot(&session(abc()));
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("<title>Sunburst (snapshot) - all</title>"));
        assert!(svg.contains("B &amp; co"));
        assert!(svg.contains(">A1<"));
        // A is missing 20 of its 60, but only the selected node shows its
        // unassigned share
        assert!(!svg.contains("class=\"unclassified\""));
    }

    #[test]
    fn selected_node_shows_its_unassigned_share() {
        let mut session = session(abc());
        let a = session.tree().root().children[0];
        session.push(Intent::Select(a));
        session.settle();
        let svg = render_snapshot(&session);
        assert!(svg.contains("<title>Sunburst (snapshot) - A</title>"));
        assert!(svg.contains("class=\"unclassified\""));
        assert!(svg.contains("[unassigned A]"));
        assert!(svg.contains("class=\"breadcrumb\""));
    }

    #[test]
    fn thin_siblings_merge_into_one_labelled_run() {
        let mut tree = Tree::with_magnitudes("all", 10_000.0);
        let big = tree.add_weighted(ROOT, "big", 9_000.0);
        tree.add_weighted(ROOT, "other", 1_000.0);
        tree.add_weighted(big, "main", 8_900.0);
        for index in 0..5 {
            tree.add_weighted(big, format!("speck-{index}"), 20.0);
        }
        tree.finalize(10);
        let svg = render_snapshot(&session(tree));
        assert_eq!(svg.matches("class=\"hidden-run\"").count(), 1);
        assert!(svg.contains(">5 more<"));
    }

    #[test]
    fn narrow_children_are_listed_in_the_key() {
        let mut tree = Tree::with_magnitudes("all", 1000.0);
        tree.add_weighted(ROOT, "wide", 997.0);
        tree.add_weighted(ROOT, "narrow", 1.0);
        tree.finalize(usize::MAX);
        let svg = render_snapshot(&session(tree));
        assert!(svg.contains("class=\"keys\""));
        assert!(svg.contains("narrow   "));
        assert!(svg.contains("[unassigned all]"));
    }

    #[test]
    fn label_changing_orientation_fades_between_forms() {
        let session = session(abc());
        let b = session.tree().root().children[1];
        let mut layout = session.layout().clone();
        let view = &mut layout.views[b];
        assert!(view.radial);
        view.radial_prev = false;
        view.alpha_label.set(1.0);

        let halfway = Progress::new(0.5, session.config().layout.tween_curvature);
        let svg = render_frame(session.tree(), &layout, session.state(), session.config(), halfway);
        assert_eq!(svg.matches(">B &amp; co<").count(), 2);
        let settled = render_frame(session.tree(), &layout, session.state(), session.config(), Progress::DONE);
        assert_eq!(settled.matches(">B &amp; co<").count(), 1);
    }

    #[test]
    fn previous_selection_is_not_highlighted_while_zooming_out() {
        let mut session = session(abc());
        let a = session.tree().root().children[0];
        session.push(Intent::Select(a));
        session.settle();
        session.push(Intent::Back);
        let start = Duration::from_secs(100);
        session.tick(start);
        let frame = session.tick(start + Duration::from_millis(300));
        assert!(!frame.progress.is_done());
        assert!(session.state().zoom_out);
        assert_eq!(session.state().selected_last, Some(a));

        let mut state = session.state().clone();
        state.highlighted = Some(a);
        let highlight = format!("fill=\"{}\" fill-opacity=\"0.3\"", session.config().theme.highlight_fill);
        let zooming = render_frame(session.tree(), session.layout(), &state, session.config(), frame.progress);
        assert!(!zooming.contains(&highlight));
        let settled = render_frame(session.tree(), session.layout(), &state, session.config(), Progress::DONE);
        assert!(settled.contains(&highlight));
    }

    #[test]
    fn search_summary_is_shown() {
        let mut session = session(abc());
        session.push(Intent::Search("a".to_string()));
        session.settle();
        let svg = render_snapshot(&session);
        assert!(svg.contains("class=\"search\""));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }

    #[test]
    fn full_ring_path_does_not_close_on_itself() {
        let path = annulus_path((0.0, 0.0), 10.0, 100.0, 0.0, TAU);
        assert!(path.contains(" 0 1 1 "));
        let (_, end) = clamp_full_circle(0.0, TAU, 100.0);
        assert!(end < TAU);
    }
}
