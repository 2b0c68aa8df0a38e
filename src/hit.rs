use serde::Serialize;

use crate::ir::{DepthPolicy, NodeId, Tree};
use crate::layout::{KeyEntry, SunburstLayout, polar_of};
use crate::tween::Progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum HitTarget {
    Wedge(NodeId),
    Key(NodeId),
    /// The unclassified legend row of the selected node.
    Unclassified(NodeId),
    Breadcrumb(NodeId),
}

impl HitTarget {
    pub fn node(&self) -> NodeId {
        match self {
            HitTarget::Wedge(id) | HitTarget::Key(id) | HitTarget::Unclassified(id) | HitTarget::Breadcrumb(id) => *id,
        }
    }
}

/// Finds what is under chart-local `(x, y)` using the geometry on screen at
/// `progress`. Breadcrumbs and legend rows win over wedges; deeper wedges
/// win over the ones they sit on.
pub fn hit_test(
    tree: &Tree,
    layout: &SunburstLayout,
    policy: DepthPolicy,
    x: f64,
    y: f64,
    progress: Progress,
) -> Option<HitTarget> {
    if let Some(crumb) = layout
        .breadcrumbs(tree, policy, progress)
        .into_iter()
        .find(|crumb| crumb.contains(x, y))
    {
        return Some(HitTarget::Breadcrumb(crumb.id));
    }
    if let Some(key) = layout.key_boxes.iter().find(|key| key.contains(x, y)) {
        return Some(match key.entry {
            KeyEntry::Node(id) => HitTarget::Key(id),
            KeyEntry::Unclassified(id) => HitTarget::Unclassified(id),
        });
    }

    let (angle, distance) = polar_of(layout.center(), x, y);
    let probe = Probe {
        tree,
        layout,
        policy,
        angle,
        distance,
        radius: layout.radius.current(progress),
        progress,
    };
    probe.wedge(layout.selected).map(HitTarget::Wedge)
}

struct Probe<'a> {
    tree: &'a Tree,
    layout: &'a SunburstLayout,
    policy: DepthPolicy,
    angle: f64,
    distance: f64,
    radius: f64,
    progress: Progress,
}

impl Probe<'_> {
    fn wedge(&self, id: NodeId) -> Option<NodeId> {
        let view = self.layout.view(id);
        if view.hide || view.radius_inner.end == 1.0 {
            return None;
        }
        let node = self.tree.node(id);
        if let Some(hit) = node.children.iter().find_map(|child| self.wedge(*child)) {
            return Some(hit);
        }
        if node.magnitude <= 0.0 || (id != self.layout.selected && self.tree.is_collapsed(id, self.policy)) {
            return None;
        }
        let current = view.resolve(self.progress);
        let inside = self.distance >= current.radius_inner * self.radius
            && self.distance <= self.radius
            && self.angle >= current.angle_start
            && self.angle < current.angle_end;
        inside.then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::ROOT;
    use crate::layout::{TextStyle, ViewContext, polar};
    use std::f64::consts::PI;

    const POLICY: DepthPolicy = DepthPolicy {
        collapse: true,
        max_absolute_depth: 10,
    };

    fn laid_out(selected: NodeId) -> (Tree, SunburstLayout) {
        let mut tree = Tree::with_magnitudes("all", 100.0);
        let a = tree.add_weighted(ROOT, "A", 60.0);
        tree.add_weighted(ROOT, "B", 30.0);
        tree.add_weighted(ROOT, "C", 10.0);
        tree.add_weighted(a, "A1", 40.0);
        tree.add_weighted(a, "A2", 20.0);
        tree.finalize(10);
        let config = LayoutConfig::default();
        let ctx = ViewContext {
            selected,
            policy: POLICY,
            use_hue: false,
            show_keys: true,
            text: TextStyle::new(11.0, "sans-serif", true),
            width: 1000.0,
            height: 700.0,
            progress: Progress::DONE,
            config: &config,
        };
        let mut layout = SunburstLayout::new(&tree);
        layout.update_view(&tree, &ctx);
        (tree, layout)
    }

    fn at(layout: &SunburstLayout, fraction: f64, angle: f64) -> (f64, f64) {
        polar(layout.center(), fraction * layout.radius.end, angle)
    }

    #[test]
    fn deeper_wedges_win() {
        let (tree, layout) = laid_out(ROOT);
        let a = tree.root().children[0];
        let a1 = tree.node(a).children[0];
        let (x, y) = at(&layout, 0.99, 0.1);
        assert_eq!(hit_test(&tree, &layout, POLICY, x, y, Progress::DONE), Some(HitTarget::Wedge(a1)));

        let ring = layout.radii[0];
        let (x, y) = at(&layout, ring + 0.01, 0.1);
        assert_eq!(hit_test(&tree, &layout, POLICY, x, y, Progress::DONE), Some(HitTarget::Wedge(a)));

        let c = tree.root().children[2];
        let (x, y) = at(&layout, 0.9, 1.9 * PI);
        assert_eq!(hit_test(&tree, &layout, POLICY, x, y, Progress::DONE), Some(HitTarget::Wedge(c)));
    }

    #[test]
    fn centre_is_the_selected_node_and_outside_is_nothing() {
        let (tree, layout) = laid_out(ROOT);
        let (cx, cy) = layout.center();
        assert_eq!(hit_test(&tree, &layout, POLICY, cx + 1.0, cy + 1.0, Progress::DONE), Some(HitTarget::Wedge(ROOT)));
        let (x, y) = at(&layout, 1.2, 1.0);
        assert_eq!(hit_test(&tree, &layout, POLICY, x, y, Progress::DONE), None);
    }

    #[test]
    fn ancestors_are_hit_through_breadcrumbs() {
        let (tree, layout) = laid_out(1);
        let crumbs = layout.breadcrumbs(&tree, POLICY, Progress::DONE);
        assert_eq!(crumbs.len(), 1);
        let crumb = &crumbs[0];
        let (x, y) = (crumb.x + crumb.width / 2.0, crumb.y + crumb.height / 2.0);
        assert_eq!(hit_test(&tree, &layout, POLICY, x, y, Progress::DONE), Some(HitTarget::Breadcrumb(ROOT)));
        assert_eq!(HitTarget::Breadcrumb(ROOT).node(), ROOT);
    }
}
