use url::form_urlencoded;

use crate::ir::{NodeId, ROOT, Tree};
use crate::state::AppState;

/// Shareable view state, as carried in a query string.
///
/// `depth` counts rings below the root, one less than the absolute depth
/// ceiling. Keys this type does not know are kept and written back first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub dataset: Option<usize>,
    pub node: Option<NodeId>,
    pub collapse: Option<bool>,
    pub color: Option<bool>,
    pub depth: Option<usize>,
    pub font: Option<f64>,
    pub key: Option<bool>,
    pub extra: Vec<(String, String)>,
}

impl Link {
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut link = Self::default();
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "dataset" => link.dataset = number(&name, &value),
                "node" => link.node = number(&name, &value),
                "collapse" => link.collapse = Some(value == "true"),
                "color" => link.color = Some(value == "true"),
                "depth" => link.depth = number(&name, &value),
                "font" => link.font = number(&name, &value),
                "key" => link.key = Some(value == "true"),
                _ => link.extra.push((name.into_owned(), value.into_owned())),
            }
        }
        link
    }

    pub fn from_state(state: &AppState) -> Self {
        let options = &state.options;
        Self {
            dataset: Some(options.dataset),
            node: Some(state.selected),
            collapse: Some(options.collapse),
            color: Some(options.use_hue),
            depth: Some(options.max_absolute_depth.saturating_sub(1)),
            font: Some(options.font_size),
            key: Some(options.show_keys),
            extra: Vec::new(),
        }
    }

    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.extra {
            query.append_pair(name, value);
        }
        if let Some(dataset) = self.dataset {
            query.append_pair("dataset", &dataset.to_string());
        }
        if let Some(node) = self.node {
            query.append_pair("node", &node.to_string());
        }
        if let Some(collapse) = self.collapse {
            query.append_pair("collapse", flag(collapse));
        }
        if let Some(color) = self.color {
            query.append_pair("color", flag(color));
        }
        if let Some(depth) = self.depth {
            query.append_pair("depth", &depth.to_string());
        }
        if let Some(font) = self.font {
            query.append_pair("font", &format_number(font));
        }
        if let Some(key) = self.key {
            query.append_pair("key", flag(key));
        }
        query.finish()
    }

    /// Applies every present key, clamping out-of-range values. The node is
    /// applied last so it is checked against the final depth ceiling.
    pub fn apply(&self, tree: &mut Tree, state: &mut AppState) {
        self.apply_with(tree, state, false);
    }

    /// Applies the link to a view that has not been laid out yet. Children
    /// are ordered by the linked dataset and the selection starts with an
    /// empty history.
    pub fn open(&self, tree: &mut Tree, state: &mut AppState) {
        self.apply_with(tree, state, true);
    }

    fn apply_with(&self, tree: &mut Tree, state: &mut AppState, opening: bool) {
        if let Some(collapse) = self.collapse {
            state.options.collapse = collapse;
        }
        if let Some(color) = self.color {
            if color && tree.hue_spec.is_none() {
                log::warn!("link asks for hue colouring but the tree has no hue attribute");
            } else {
                state.options.use_hue = color;
            }
        }
        if let Some(key) = self.key {
            state.options.show_keys = key;
        }
        if let Some(font) = self.font {
            state.set_font_size(font);
            if state.options.font_size != font {
                log::warn!("link font size {font} clamped to {}", state.options.font_size);
            }
        }
        if let Some(dataset) = self.dataset {
            if dataset >= tree.dataset_count() {
                log::warn!("link dataset {dataset} out of range; using the last one");
            }
            if opening {
                tree.sort(dataset.min(tree.dataset_count() - 1));
                tree.set_dataset(state.options.dataset, state.options.max_absolute_depth);
            }
            state.set_dataset(tree, dataset);
        }
        if let Some(depth) = self.depth {
            let requested = depth.saturating_add(1);
            state.set_max_absolute_depth(tree, requested);
            if state.options.max_absolute_depth != requested {
                log::warn!(
                    "link depth {depth} clamped to {}",
                    state.options.max_absolute_depth.saturating_sub(1)
                );
            }
        }
        if let Some(node) = self.node {
            let node = if node < tree.len() {
                node
            } else {
                log::warn!("link node {node} does not exist; selecting the root");
                ROOT
            };
            if opening {
                state.open_at(tree, node);
            } else {
                state.select(tree, node);
                state.set_focus(tree, node);
            }
            state.update_max_absolute_depth(tree);
        }
    }
}

fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn number<T: std::str::FromStr>(name: &str, value: &str) -> Option<T> {
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        log::warn!("ignoring link value {name}={value}");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ViewOptions;
    use crate::theme::Theme;

    fn tree() -> Tree {
        let mut tree = Tree::with_magnitudes("all", 10.0);
        let a = tree.add_weighted(ROOT, "A", 6.0);
        tree.add_weighted(ROOT, "B", 4.0);
        let a1 = tree.add_weighted(a, "A1", 3.0);
        tree.add_weighted(a, "A2", 3.0);
        tree.add_weighted(a1, "A1x", 2.0);
        tree.finalize(usize::MAX);
        tree
    }

    #[test]
    fn writes_the_shared_key_set() {
        let mut tree = tree();
        let state = AppState::new(&mut tree, ViewOptions::new(&Theme::krona(), 800.0, 600.0));
        let query = Link::from_state(&state).to_query();
        assert_eq!(query, "dataset=0&node=0&collapse=true&color=false&depth=3&font=11&key=true");
    }

    #[test]
    fn unknown_keys_pass_through() {
        let link = Link::parse("?theme=dark&node=2&collapse=false&x=a%20b");
        assert_eq!(link.node, Some(2));
        assert_eq!(link.collapse, Some(false));
        assert_eq!(
            link.extra,
            vec![("theme".to_string(), "dark".to_string()), ("x".to_string(), "a b".to_string())]
        );
        assert!(link.to_query().starts_with("theme=dark&x=a+b&node=2"));
    }

    #[test]
    fn anything_but_true_is_false() {
        let link = Link::parse("key=TRUE&color=1&collapse=true");
        assert_eq!(link.key, Some(false));
        assert_eq!(link.color, Some(false));
        assert_eq!(link.collapse, Some(true));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut tree = tree();
        let mut state = AppState::new(&mut tree, ViewOptions::new(&Theme::krona(), 800.0, 600.0));
        Link::parse("node=99&depth=40&font=0&dataset=7&font_extra=1").apply(&mut tree, &mut state);
        assert_eq!(state.selected, ROOT);
        assert_eq!(state.options.max_absolute_depth, 4);
        assert_eq!(state.options.font_size, 1.0);
        assert_eq!(state.options.dataset, 0);
    }

    #[test]
    fn deep_node_pulls_selection_inside_depth() {
        let mut tree = tree();
        let mut state = AppState::new(&mut tree, ViewOptions::new(&Theme::krona(), 800.0, 600.0));
        let a1 = tree.node(tree.root().children[0]).children[0];
        assert_eq!(tree.node(a1).name, "A1");
        Link::parse(&format!("node={a1}&depth=2")).apply(&mut tree, &mut state);
        assert_eq!(state.options.max_absolute_depth, 3);
        // A1 sits at depth 3 and would have no ring left for its children
        assert_eq!(tree.node(state.selected).name, "A");
    }

    #[test]
    fn malformed_numbers_are_ignored() {
        let link = Link::parse("node=abc&depth=-1&font=12.5");
        assert_eq!(link.node, None);
        assert_eq!(link.depth, None);
        assert_eq!(link.font, Some(12.5));
        assert!(link.to_query().contains("font=12.5"));
    }
}
