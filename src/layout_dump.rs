use crate::ir::{NodeId, Tree};
use crate::layout::{KeyBox, ResolvedView, SunburstLayout};
use crate::session::Sunburst;
use crate::tween::Progress;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub selected: NodeId,
    pub focus: NodeId,
    pub progress: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub radii: Vec<f64>,
    pub label_counts: Vec<usize>,
    pub font_size: f64,
    pub depth_fit_iterations: usize,
    pub hidden_groups: usize,
    pub link: String,
    pub nodes: Vec<NodeDump>,
    pub keys: Vec<KeyBox>,
    pub hidden_runs: Vec<HiddenRunDump>,
    pub breadcrumbs: Vec<NodeId>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: NodeId,
    pub name: String,
    pub depth: usize,
    pub magnitude: f64,
    #[serde(flatten)]
    pub view: ResolvedView,
    pub label: String,
    pub radial: bool,
    pub hide: bool,
    pub keyed: bool,
    pub breadcrumb: bool,
    pub search_result: bool,
}

#[derive(Debug, Serialize)]
pub struct HiddenRunDump {
    pub parent: NodeId,
    pub members: Vec<NodeId>,
    pub label: String,
    pub angle_start: f64,
    pub angle_end: f64,
}

impl LayoutDump {
    /// Every node's resolved view at the session's current progress.
    pub fn from_session(session: &Sunburst) -> Self {
        let tree = session.tree();
        let layout = session.layout();
        let state = session.state();
        let progress = session.progress();
        let policy = state.policy();

        let nodes = tree
            .nodes()
            .iter()
            .map(|node| {
                let view = layout.view(node.id);
                NodeDump {
                    id: node.id,
                    name: node.name.clone(),
                    depth: node.depth,
                    magnitude: node.magnitude,
                    view: view.resolve(progress),
                    label: layout.display_label(tree, node.id, progress),
                    radial: view.radial,
                    hide: view.hide,
                    keyed: view.keyed,
                    breadcrumb: view.breadcrumb,
                    search_result: node.is_search_result,
                }
            })
            .collect();

        LayoutDump {
            selected: layout.selected,
            focus: state.focus,
            progress: progress.raw,
            width: layout.width,
            height: layout.height,
            radius: layout.radius.current(progress),
            radii: layout.radii.clone(),
            label_counts: layout.label_counts.clone(),
            font_size: layout.font_size,
            depth_fit_iterations: layout.depth_fit_iterations,
            hidden_groups: layout.hidden_groups,
            link: session.link(),
            nodes,
            keys: layout.key_boxes.clone(),
            hidden_runs: hidden_runs(tree, layout, progress),
            breadcrumbs: layout
                .breadcrumbs(tree, policy, progress)
                .into_iter()
                .map(|crumb| crumb.id)
                .collect(),
        }
    }
}

fn hidden_runs(tree: &Tree, layout: &SunburstLayout, progress: Progress) -> Vec<HiddenRunDump> {
    tree.nodes()
        .iter()
        .flat_map(|node| layout.hidden_runs(tree, node.id, progress))
        .map(|run| HiddenRunDump {
            parent: run.parent,
            label: run.label(),
            angle_start: run.angle_start,
            angle_end: run.angle_end,
            members: run.members,
        })
        .collect()
}

pub fn write_layout_dump(path: &Path, session: &Sunburst) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_session(session);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ir::ROOT;
    use crate::parser::DocumentDefaults;

    #[test]
    fn dump_lists_every_node_with_settled_geometry() {
        let mut tree = Tree::with_magnitudes("all", 10.0);
        tree.add_weighted(ROOT, "A", 6.0);
        tree.add_weighted(ROOT, "B", 4.0);
        tree.finalize(usize::MAX);
        let mut session = Sunburst::new(tree, &DocumentDefaults::default(), Config::default());
        session.settle();

        let dump = LayoutDump::from_session(&session);
        assert_eq!(dump.nodes.len(), 3);
        assert_eq!(dump.progress, 1.0);
        assert_eq!(dump.nodes[1].name, "A");
        assert!(dump.link.contains("node=0"));

        let json = serde_json::to_value(&dump).unwrap();
        let first = &json["nodes"][1];
        assert!(first["angle_start"].is_number());
        assert_eq!(first["radial"], serde_json::Value::Bool(true));
    }
}
