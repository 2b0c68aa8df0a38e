use std::f64::consts::{PI, TAU};
use std::path::Path;
use std::time::Duration;

use sunburst_rs::hit::HitTarget;
use sunburst_rs::layout::polar;
use sunburst_rs::tween::Progress;
use sunburst_rs::{Config, Intent, NodeId, ROOT, Sunburst, Tree, parse_tree, render_snapshot};

const EPSILON: f64 = 1e-9;

fn fixture_source(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).expect("fixture read failed")
}

fn load(name: &str) -> Sunburst {
    let mut session = Sunburst::from_document(&fixture_source(name), Config::default()).expect("parse failed");
    session.settle();
    session
}

fn find(tree: &Tree, name: &str) -> NodeId {
    tree.nodes()
        .iter()
        .find(|node| node.name == name)
        .map(|node| node.id)
        .unwrap_or_else(|| panic!("no node named {name}"))
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn assert_valid_svg(svg: &str, fixture: &str) {
    assert!(svg.starts_with("<svg"), "{fixture}: missing <svg tag");
    assert!(svg.ends_with("</svg>"), "{fixture}: missing </svg tag");
    assert!(svg.contains("<title>Sunburst (snapshot) - "), "{fixture}: missing title");
    assert!(!svg.contains("NaN"), "{fixture}: NaN in markup");
}

// Keep this list explicit so new fixtures must be added intentionally.
const FIXTURES: [&str; 4] = ["abc.json5", "collapse.json5", "datasets.json5", "wide.json5"];

#[test]
fn render_all_fixtures() {
    for fixture in FIXTURES {
        let session = load(fixture);
        let svg = render_snapshot(&session);
        assert_valid_svg(&svg, fixture);
    }
}

#[test]
fn children_partition_their_parent() {
    for fixture in FIXTURES {
        let tree = parse_tree(&fixture_source(fixture)).expect("parse failed").tree;
        for node in tree.nodes() {
            let mut base = node.base_magnitude;
            let mut sum = 0.0;
            for child in &node.children {
                let child = tree.node(*child);
                assert!(close(child.base_magnitude, base), "{fixture}: {}", child.name);
                base += child.magnitude;
                sum += child.magnitude;
            }
            assert!(sum <= node.magnitude + EPSILON, "{fixture}: {} overflows", node.name);
        }
    }
}

#[test]
fn root_children_split_the_circle_by_magnitude() {
    let session = load("abc.json5");
    let tree = session.tree();
    let layout = session.layout();
    let expected = [("A", 0.0, 1.2 * PI), ("B", 1.2 * PI, 1.8 * PI), ("C", 1.8 * PI, TAU)];
    for (name, start, end) in expected {
        let view = layout.view(find(tree, name)).resolve(Progress::DONE);
        assert!(close(view.angle_start, start), "{name} starts at {}", view.angle_start);
        assert!(close(view.angle_end, end), "{name} ends at {}", view.angle_end);
    }
}

#[test]
fn selecting_a_node_rescales_its_subtree() {
    let mut session = load("abc.json5");
    let a = find(session.tree(), "A");
    session.push(Intent::Select(a));
    session.settle();

    let tree = session.tree();
    let layout = session.layout();
    let view = layout.view(a).resolve(Progress::DONE);
    assert!(close(view.angle_start, 0.0) && close(view.angle_end, TAU));
    let scale = TAU / 60.0;
    let a1 = layout.view(find(tree, "A1")).resolve(Progress::DONE);
    let a2 = layout.view(find(tree, "A2")).resolve(Progress::DONE);
    assert!(close(a1.angle_end - a1.angle_start, 40.0 * scale));
    assert!(close(a2.angle_start, 40.0 * scale));
    assert!(close(a2.angle_end, TAU));
}

#[test]
fn search_marks_one_leaf_and_counts_up_the_chain() {
    let mut session = load("abc.json5");
    session.push(Intent::Search("a2".to_string()));
    session.settle();

    let tree = session.tree();
    let a2 = find(tree, "A2");
    assert_eq!(session.state().search_results, 1);
    assert!(tree.node(a2).is_search_result);
    for ancestor in tree.ancestors(a2) {
        assert_eq!(tree.node(ancestor).search_results, 1);
        assert!(!tree.node(ancestor).is_search_result);
    }
    assert_eq!(tree.node(find(tree, "B")).search_results, 0);
}

#[test]
fn animation_progress_is_monotonic_and_finishes_on_time() {
    let mut session = load("abc.json5");
    let a = find(session.tree(), "A");
    let start = 10_000;
    session.tick(ms(start));
    session.push(Intent::Select(a));

    let mut now = start;
    let mut last = -1.0;
    loop {
        let frame = session.tick(ms(now));
        assert!(frame.progress.raw >= last);
        last = frame.progress.raw;
        if frame.progress.is_done() {
            break;
        }
        now += 20;
        assert!(now - start <= 850 + 20, "still animating after {}ms", now - start);
    }
    assert_eq!(last, 1.0);
}

#[test]
fn retargeting_mid_animation_starts_from_the_screen() {
    let mut session = load("abc.json5");
    let tree = session.tree();
    let (a, b) = (find(tree, "A"), find(tree, "B"));
    session.tick(ms(1_000));
    session.push(Intent::Select(a));
    session.tick(ms(1_000));
    let frame = session.tick(ms(1_300));
    assert!(!frame.progress.is_done());
    let before: Vec<_> = session
        .layout()
        .views
        .iter()
        .map(|view| view.resolve(frame.progress))
        .collect();
    let radius_before = session.layout().radius.current(frame.progress);

    session.push(Intent::Select(b));
    let frame = session.tick(ms(1_300));
    assert_eq!(frame.progress.raw, 0.0);
    for (old, view) in before.iter().zip(&session.layout().views) {
        let new = view.resolve(frame.progress);
        assert!(close(old.angle_start, new.angle_start), "node {}", view.id);
        assert!(close(old.angle_end, new.angle_end), "node {}", view.id);
        assert!(close(old.radius_inner, new.radius_inner), "node {}", view.id);
        assert!(close(old.alpha_wedge, new.alpha_wedge), "node {}", view.id);
    }
    assert!(close(radius_before, session.layout().radius.current(frame.progress)));
}

#[test]
fn font_then_depth_change_mid_tween_stays_finite() {
    let mut session = load("datasets.json5");
    session.tick(ms(1_000));
    session.push(Intent::SetFontSize(24.0));
    session.tick(ms(1_000));
    session.tick(ms(1_100));
    session.push(Intent::DecreaseDepth);
    session.tick(ms(1_150));

    let layout = session.layout();
    for step in 0..=20 {
        let progress = Progress::new(step as f64 / 20.0, 13.0);
        assert!(layout.radius.current(progress) >= 0.0);
        for view in &layout.views {
            for tween in view.tweens() {
                let value = tween.current(progress);
                assert!(value.is_finite(), "node {} at {}", view.id, progress.raw);
                assert!(value >= 0.0, "node {} went negative at {}", view.id, progress.raw);
            }
        }
    }
}

#[test]
fn depth_fit_terminates_on_deep_trees() {
    let mut tree = Tree::with_magnitudes("all", 1_000_000.0);
    let mut parent = ROOT;
    let mut magnitude = 1_000_000.0;
    for depth in 0..30 {
        magnitude *= 0.7;
        tree.add_weighted(parent, format!("side-{depth}"), magnitude * 0.3);
        parent = tree.add_weighted(parent, format!("spine-{depth}"), magnitude);
    }
    tree.finalize(usize::MAX);
    let deepest = tree.root().max_depth;

    let mut session = Sunburst::new(tree, &Default::default(), Config::default());
    session.settle();
    let layout = session.layout();
    assert!(layout.max_display_depth() <= deepest);
    assert!(layout.depth_fit_iterations <= 8, "{} passes", layout.depth_fit_iterations);
    assert!(layout.radii.iter().all(|ring| ring.is_finite() && *ring > 0.0 && *ring <= 1.0));
}

#[test]
fn collapse_skips_exactly_the_single_child_links() {
    let mut session = load("collapse.json5");
    let tree = session.tree();
    let (x, y, z) = (find(tree, "x"), find(tree, "y"), find(tree, "z"));
    let flagged: Vec<&str> = tree
        .nodes()
        .iter()
        .filter(|node| node.collapse)
        .map(|node| node.name.as_str())
        .collect();
    assert_eq!(flagged, vec!["x"]);

    let policy = session.state().policy();
    assert!(policy.collapse);
    let chain: Vec<NodeId> = std::iter::successors(Some(z), |id| tree.display_parent(*id, policy)).collect();
    assert_eq!(chain, vec![z, y, ROOT]);

    session.push(Intent::SetCollapse(false));
    session.settle();
    let tree = session.tree();
    let policy = session.state().policy();
    let chain: Vec<NodeId> = std::iter::successors(Some(z), |id| tree.display_parent(*id, policy)).collect();
    assert_eq!(chain, vec![z, y, x, ROOT]);
}

#[test]
fn selecting_a_collapsed_node_moves_down_its_chain() {
    let mut session = load("collapse.json5");
    let tree = session.tree();
    let (x, y) = (find(tree, "x"), find(tree, "y"));
    session.push(Intent::Select(x));
    session.settle();
    assert_eq!(session.state().selected, y);
}

#[test]
fn hidden_groups_are_stable_across_relayouts() {
    let mut session = load("wide.json5");
    let big = find(session.tree(), "big");
    let boundaries = |session: &Sunburst| -> Vec<Option<usize>> {
        session
            .tree()
            .node(big)
            .children
            .iter()
            .map(|id| session.layout().view(*id).hidden_end)
            .collect()
    };
    let first = boundaries(&session);
    assert_eq!(first, vec![None, Some(5), None, None, None, None]);

    let (width, height) = (session.layout().width, session.layout().height);
    session.push(Intent::Resize { width, height });
    session.settle();
    assert_eq!(boundaries(&session), first);

    let svg = render_snapshot(&session);
    assert!(svg.contains(">5 more<"));
}

#[test]
fn thin_root_children_are_keyed() {
    let session = load("wide.json5");
    let sliver = find(session.tree(), "sliver");
    let layout = session.layout();
    assert!(layout.view(sliver).keyed);
    assert!(layout.keys.contains(&sliver));
    assert!(layout.key_boxes.iter().any(|key| key.label.starts_with("sliver   ")));
}

#[test]
fn navigation_history_round_trip() {
    let mut session = load("abc.json5");
    let tree = session.tree();
    let (a, a1) = (find(tree, "A"), find(tree, "A1"));
    session.push(Intent::Select(a));
    session.settle();
    assert!(session.state().can_go_back());

    session.push(Intent::Back);
    session.settle();
    assert_eq!(session.state().selected, ROOT);
    assert!(session.state().can_go_forward());

    session.push(Intent::Forward);
    session.settle();
    assert_eq!(session.state().selected, a);

    // a leaf has no ring of its own, so the selection lands on its parent
    session.push(Intent::Select(a1));
    session.settle();
    assert_eq!(session.state().selected, a);

    session.push(Intent::Up);
    session.settle();
    assert_eq!(session.state().selected, ROOT);
}

#[test]
fn link_restores_the_view() {
    let mut session = load("datasets.json5");
    let bacteria = find(session.tree(), "Bacteria");
    session.push(Intent::Select(bacteria));
    session.push(Intent::SetDataset(1));
    session.push(Intent::SetShowKeys(false));
    session.settle();
    let link = session.link();
    assert!(link.contains("dataset=1"));
    assert!(link.contains(&format!("node={bacteria}")));
    assert!(link.contains("key=false"));

    let mut restored = load("datasets.json5");
    restored.push(Intent::ApplyLink(format!("?{link}")));
    restored.settle();
    assert_eq!(restored.state().selected, bacteria);
    assert_eq!(restored.state().options.dataset, 1);
    assert!(!restored.state().options.show_keys);
    assert_eq!(restored.link(), link);
}

#[test]
fn opening_link_orders_by_its_dataset() {
    let mut session =
        Sunburst::from_document(&fixture_source("datasets.json5"), Config::default()).expect("parse failed");
    session.push(Intent::ApplyLink("dataset=1&node=1".to_string()));
    session.settle();

    let tree = session.tree();
    let order: Vec<&str> = tree.root().children.iter().map(|id| tree.node(*id).name.as_str()).collect();
    assert_eq!(order, vec!["Archaea", "Bacteria", "Viruses"]);
    let magnitudes: Vec<f64> = tree.root().children.iter().map(|id| tree.node(*id).magnitude).collect();
    assert!(magnitudes.windows(2).all(|pair| pair[0] >= pair[1]));
    assert_eq!(tree.node(find(tree, "Bacteria")).base_magnitude, 50.0);

    // the link opens on Bacteria without a way back to the root
    assert_eq!(session.state().selected, find(tree, "Bacteria"));
    assert!(session.state().history().is_empty());
    assert!(!session.state().can_go_back());
}

#[test]
fn switching_datasets_keeps_order_and_changes_magnitudes() {
    let mut session = load("datasets.json5");
    let order: Vec<String> = {
        let tree = session.tree();
        tree.root().children.iter().map(|id| tree.node(*id).name.clone()).collect()
    };
    assert_eq!(order, vec!["Bacteria", "Archaea", "Viruses"]);

    session.push(Intent::NextDataset);
    session.settle();
    let tree = session.tree();
    assert_eq!(tree.root().magnitude, 80.0);
    let after: Vec<String> = tree.root().children.iter().map(|id| tree.node(*id).name.clone()).collect();
    assert_eq!(after, order);
    let archaea = session.layout().view(find(tree, "Archaea")).resolve(Progress::DONE);
    assert!(close(archaea.angle_end - archaea.angle_start, 50.0 / 80.0 * TAU));
}

#[test]
fn hue_colouring_draws_a_legend() {
    let session = load("datasets.json5");
    assert!(session.state().options.use_hue);
    let svg = render_snapshot(&session);
    assert!(svg.contains("hueGradient"));
    assert!(svg.contains("GC content"));
}

#[test]
fn pointer_hits_follow_the_geometry() {
    let session = load("abc.json5");
    let tree = session.tree();
    let layout = session.layout();
    let (cx, cy) = layout.center();
    assert_eq!(session.hit(cx, cy + 1.0), Some(HitTarget::Wedge(ROOT)));

    let b = find(tree, "B");
    let (x, y) = polar(layout.center(), layout.radius.end * 0.95, 1.5 * PI);
    assert_eq!(session.hit(x, y), Some(HitTarget::Wedge(b)));
    assert_eq!(session.hit(1.0, 1.0), None);
}

#[test]
fn malformed_documents_are_rejected() {
    assert!(Sunburst::from_document("{ node: ", Config::default()).is_err());
    assert!(Sunburst::from_document("{}", Config::default()).is_err());
}
