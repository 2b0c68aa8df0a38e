use serde::Serialize;

pub type NodeId = usize;

pub const ROOT: NodeId = 0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(value) => Some(*value),
            AttributeValue::Text(text) => text.trim().parse().ok(),
            AttributeValue::List(_) => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            AttributeValue::Number(value) => {
                if value.fract() == 0.0 && value.abs() < 1e15 {
                    format!("{value:.0}")
                } else {
                    format!("{value}")
                }
            }
            AttributeValue::Text(text) => text.clone(),
            AttributeValue::List(items) => items.join(", "),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: String,
    pub display: String,
}

/// Maps an attribute value range linearly onto a hue range (both hues in
/// `[0, 1]`).
#[derive(Debug, Clone, Serialize)]
pub struct HueSpec {
    pub attribute: usize,
    pub hue_start: f64,
    pub hue_end: f64,
    pub value_start: f64,
    pub value_end: f64,
    pub default: bool,
}

impl HueSpec {
    pub fn hue_for(&self, value: f64) -> f64 {
        let (low, high) = if self.hue_start <= self.hue_end {
            (self.hue_start, self.hue_end)
        } else {
            (self.hue_end, self.hue_start)
        };
        let span = self.value_end - self.value_start;
        if span == 0.0 || !value.is_finite() {
            return self.hue_start;
        }
        let hue = (value - self.value_start) * (self.hue_end - self.hue_start) / span + self.hue_start;
        hue.clamp(low, high)
    }

    /// Gradient stops `(offset, hue)` from `hue_start` to `hue_end`, no more
    /// than 1/12 of the wheel apart.
    pub fn stops(&self) -> Vec<(f64, f64)> {
        let span = self.hue_end - self.hue_start;
        let steps = ((span.abs() * 12.0).ceil() as usize).max(1);
        (0..=steps)
            .map(|step| {
                let offset = step as f64 / steps as f64;
                (offset, self.hue_start + span * offset)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthPolicy {
    pub collapse: bool,
    pub max_absolute_depth: usize,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub href: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Indexed by attribute, then by dataset.
    pub values: Vec<Vec<Option<AttributeValue>>>,
    /// Precomputed hue per dataset when the tree has a hue source.
    pub hues: Vec<Option<f64>>,

    pub magnitude: f64,
    pub base_magnitude: f64,
    pub depth: usize,
    pub depth_collapsed: usize,
    pub collapse: bool,
    pub max_depth: usize,
    pub max_depth_collapsed: usize,
    pub is_search_result: bool,
    pub search_results: usize,
}

impl Node {
    fn new(id: NodeId, name: String, parent: Option<NodeId>, attributes: usize) -> Self {
        Self {
            id,
            name,
            href: None,
            parent,
            children: Vec::new(),
            values: vec![Vec::new(); attributes],
            hues: Vec::new(),
            magnitude: 0.0,
            base_magnitude: 0.0,
            depth: 1,
            depth_collapsed: 1,
            collapse: false,
            max_depth: 1,
            max_depth_collapsed: 1,
            is_search_result: false,
            search_results: 0,
        }
    }

    pub fn value(&self, attribute: usize, dataset: usize) -> Option<&AttributeValue> {
        let per_dataset = self.values.get(attribute)?;
        per_dataset
            .get(dataset)
            .or_else(|| if per_dataset.len() == 1 { per_dataset.first() } else { None })
            .and_then(|value| value.as_ref())
    }

    pub fn hue(&self, dataset: usize) -> Option<f64> {
        self.hues.get(dataset).copied().flatten()
    }

    pub fn magnitude_end(&self) -> f64 {
        self.base_magnitude + self.magnitude
    }
}

/// Arena-backed hierarchy. Parents are plain indices; the child lists own
/// the structure. The node set never changes after [`Tree::finalize`].
#[derive(Debug, Clone)]
pub struct Tree {
    pub attributes: Vec<Attribute>,
    pub magnitude_attribute: usize,
    pub datasets: Vec<String>,
    pub hue_spec: Option<HueSpec>,
    nodes: Vec<Node>,
    dataset: usize,
}

impl Tree {
    pub fn new(root_name: impl Into<String>, attributes: Vec<Attribute>, magnitude_attribute: usize) -> Self {
        let attribute_count = attributes.len().max(magnitude_attribute + 1);
        Self {
            attributes,
            magnitude_attribute,
            datasets: vec![String::new()],
            hue_spec: None,
            nodes: vec![Node::new(ROOT, root_name.into(), None, attribute_count)],
            dataset: 0,
        }
    }

    /// A tree whose only attribute is the magnitude; handy for callers that
    /// just have names and weights.
    pub fn with_magnitudes(root_name: impl Into<String>, magnitude: f64) -> Self {
        let mut tree = Self::new(
            root_name,
            vec![Attribute {
                name: "magnitude".to_string(),
                display: "Total".to_string(),
            }],
            0,
        );
        tree.set_value(ROOT, 0, 0, AttributeValue::Number(magnitude));
        tree
    }

    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = self.nodes.len();
        let attribute_count = self.nodes[ROOT].values.len();
        self.nodes.push(Node::new(id, name.into(), Some(parent), attribute_count));
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(id);
        }
        id
    }

    pub fn add_weighted(&mut self, parent: NodeId, name: impl Into<String>, magnitude: f64) -> NodeId {
        let id = self.add_child(parent, name);
        let attribute = self.magnitude_attribute;
        self.set_value(id, attribute, 0, AttributeValue::Number(magnitude));
        id
    }

    pub fn set_value(&mut self, id: NodeId, attribute: usize, dataset: usize, value: AttributeValue) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.values.len() <= attribute {
            node.values.resize(attribute + 1, Vec::new());
        }
        let slot = &mut node.values[attribute];
        if slot.len() <= dataset {
            slot.resize(dataset + 1, None);
        }
        slot[dataset] = Some(value);
    }

    pub fn set_href(&mut self, id: NodeId, href: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.href = Some(href.into());
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &Node {
        &self.nodes[ROOT]
    }

    pub fn dataset(&self) -> usize {
        self.dataset
    }

    pub fn dataset_count(&self) -> usize {
        self.datasets.len().max(1)
    }

    /// One-time preparation after loading: hues, sorting, magnitudes and
    /// depth bookkeeping for dataset 0.
    pub fn finalize(&mut self, max_absolute_depth: usize) {
        self.compute_hues();
        self.sort(0);
        self.set_dataset(0, max_absolute_depth);
    }

    /// Recomputes every magnitude-derived field for `dataset`.
    pub fn set_dataset(&mut self, dataset: usize, max_absolute_depth: usize) {
        self.dataset = dataset.min(self.dataset_count() - 1);
        self.set_magnitudes(self.dataset);
        self.set_depths();
        self.set_max_depths(max_absolute_depth);
    }

    pub fn raw_magnitude(&self, id: NodeId, dataset: usize) -> f64 {
        self.nodes[id]
            .value(self.magnitude_attribute, dataset)
            .and_then(AttributeValue::as_f64)
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
            .max(0.0)
    }

    /// Orders every child list by descending magnitude. Ties keep document
    /// order, so sorting again by another dataset gives the same result as
    /// sorting a freshly loaded tree.
    pub fn sort(&mut self, dataset: usize) {
        let mut magnitudes = vec![0.0; self.nodes.len()];
        for id in self.post_order() {
            let children: f64 = self.nodes[id].children.iter().map(|child| magnitudes[*child]).sum();
            magnitudes[id] = self.raw_magnitude(id, dataset).max(children);
        }
        for node in &mut self.nodes {
            node.children.sort_by(|a, b| {
                magnitudes[*b]
                    .partial_cmp(&magnitudes[*a])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(b))
            });
        }
    }

    fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(ROOT, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.nodes[id].children.iter().rev() {
                stack.push((*child, false));
            }
        }
        order
    }

    fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.nodes[id].children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    fn set_magnitudes(&mut self, dataset: usize) {
        for id in self.post_order() {
            let own = self.raw_magnitude(id, dataset);
            let children: f64 = self.nodes[id]
                .children
                .iter()
                .map(|child| self.nodes[*child].magnitude)
                .sum();
            let magnitude = if children > own * (1.0 + 1e-9) {
                log::warn!(
                    "children of '{}' sum to {children}, more than its magnitude {own}; raising it",
                    self.nodes[id].name
                );
                children
            } else {
                own
            };
            self.nodes[id].magnitude = magnitude;
        }

        self.nodes[ROOT].base_magnitude = 0.0;
        for id in self.pre_order() {
            let mut base = self.nodes[id].base_magnitude;
            let children = self.nodes[id].children.clone();
            for child in children {
                self.nodes[child].base_magnitude = base;
                base += self.nodes[child].magnitude;
            }
        }
    }

    fn set_depths(&mut self) {
        let root_has_siblings = self.nodes[ROOT].children.len() > 1;
        let mut stack = vec![(ROOT, 1usize, 1usize)];
        while let Some((id, depth, mut depth_collapsed)) = stack.pop() {
            let collapse = {
                let node = &self.nodes[id];
                match node.children.as_slice() {
                    [only] => {
                        let child = &self.nodes[*only];
                        child.magnitude == node.magnitude
                            && (root_has_siblings || !child.children.is_empty())
                    }
                    _ => false,
                }
            };
            let node = &mut self.nodes[id];
            node.depth = depth;
            node.depth_collapsed = depth_collapsed;
            node.collapse = collapse;
            if !collapse {
                depth_collapsed += 1;
            }
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1, depth_collapsed));
            }
        }
    }

    /// Deepest descendant depth per node; the collapsed variant only counts
    /// descendants within `max_absolute_depth`.
    pub fn set_max_depths(&mut self, max_absolute_depth: usize) {
        for id in self.post_order() {
            let mut max_depth = self.nodes[id].depth;
            let mut max_depth_collapsed = self.nodes[id].depth_collapsed;
            for child in &self.nodes[id].children {
                let child = &self.nodes[*child];
                max_depth = max_depth.max(child.max_depth);
                if child.depth <= max_absolute_depth {
                    max_depth_collapsed = max_depth_collapsed.max(child.max_depth_collapsed);
                }
            }
            let node = &mut self.nodes[id];
            node.max_depth = max_depth;
            node.max_depth_collapsed = max_depth_collapsed;
        }
    }

    fn compute_hues(&mut self) {
        let Some(spec) = self.hue_spec.clone() else {
            return;
        };
        let datasets = self.dataset_count();
        for node in &mut self.nodes {
            node.hues = (0..datasets)
                .map(|dataset| {
                    node.value(spec.attribute, dataset)
                        .and_then(AttributeValue::as_f64)
                        .map(|value| spec.hue_for(value))
                })
                .collect();
        }
    }

    pub fn is_collapsed(&self, id: NodeId, policy: DepthPolicy) -> bool {
        let node = &self.nodes[id];
        policy.collapse && node.collapse && node.depth != policy.max_absolute_depth
    }

    pub fn display_depth(&self, id: NodeId, policy: DepthPolicy) -> usize {
        let node = &self.nodes[id];
        if policy.collapse {
            node.depth_collapsed
        } else {
            node.depth
        }
    }

    pub fn display_max_depth(&self, id: NodeId, policy: DepthPolicy) -> usize {
        let node = &self.nodes[id];
        if policy.collapse {
            node.max_depth_collapsed
        } else {
            node.max_depth.min(policy.max_absolute_depth)
        }
    }

    /// Nearest ancestor that is drawn as its own ring.
    pub fn display_parent(&self, id: NodeId, policy: DepthPolicy) -> Option<NodeId> {
        let mut parent = self.nodes[id].parent;
        while let Some(candidate) = parent {
            if !self.is_collapsed(candidate, policy) {
                return Some(candidate);
            }
            parent = self.nodes[candidate].parent;
        }
        None
    }

    /// Strict ancestry test.
    pub fn has_ancestor(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut parent = self.nodes[id].parent;
        while let Some(candidate) = parent {
            if candidate == ancestor {
                return true;
            }
            parent = self.nodes[candidate].parent;
        }
        false
    }

    pub fn has_children(&self, id: NodeId, policy: DepthPolicy) -> bool {
        let node = &self.nodes[id];
        !node.children.is_empty() && node.depth < policy.max_absolute_depth
    }

    /// Case-insensitive substring search. Collapsed nodes never match and an
    /// empty query clears every result. Returns the number of matches.
    pub fn search(&mut self, query: &str, policy: DepthPolicy) -> usize {
        let needle = query.to_lowercase();
        let mut matches = 0;
        for id in self.post_order() {
            let is_match = !needle.is_empty()
                && !self.is_collapsed(id, policy)
                && self.nodes[id].name.to_lowercase().contains(&needle);
            let below: usize = self.nodes[id]
                .children
                .iter()
                .map(|child| self.nodes[*child].search_results)
                .sum();
            let node = &mut self.nodes[id];
            node.is_search_result = is_match;
            node.search_results = below + usize::from(is_match);
            if is_match {
                matches += 1;
            }
        }
        matches
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id].parent, |current| self.nodes[*current].parent)
    }
}
