use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::LoadError;
use crate::ir::{Attribute, AttributeValue, HueSpec, NodeId, ROOT, Tree};

/// Display defaults a document may carry alongside its tree.
#[derive(Debug, Clone, Default)]
pub struct DocumentDefaults {
    pub collapse: Option<bool>,
    pub show_keys: Option<bool>,
    pub use_hue: bool,
}

#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub tree: Tree,
    pub defaults: DocumentDefaults,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeDocument {
    #[serde(default)]
    attributes: Vec<AttributeDecl>,
    #[serde(default = "default_magnitude")]
    magnitude: String,
    #[serde(default)]
    datasets: Vec<String>,
    color: Option<ColorDecl>,
    collapse: Option<bool>,
    key: Option<bool>,
    node: Option<NodeDecl>,
}

fn default_magnitude() -> String {
    "magnitude".to_string()
}

#[derive(Debug, Deserialize)]
struct AttributeDecl {
    name: String,
    display: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorDecl {
    attribute: String,
    #[serde(default)]
    hue_start: f64,
    #[serde(default = "default_hue_end")]
    hue_end: f64,
    #[serde(default)]
    value_start: f64,
    #[serde(default = "default_value_end")]
    value_end: f64,
    #[serde(default)]
    default: bool,
}

fn default_hue_end() -> f64 {
    120.0
}

fn default_value_end() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct NodeDecl {
    name: String,
    href: Option<String>,
    #[serde(default)]
    children: Vec<NodeDecl>,
    #[serde(flatten)]
    values: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Many(Vec<Scalar>),
    One(Scalar),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl From<Scalar> for AttributeValue {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Number(number) => AttributeValue::Number(number),
            Scalar::Text(text) => AttributeValue::Text(text),
            Scalar::List(items) => AttributeValue::List(items),
        }
    }
}

impl FieldValue {
    fn into_values(self) -> Vec<Scalar> {
        match self {
            FieldValue::Many(values) => values,
            FieldValue::One(value) => vec![value],
        }
    }

    fn len(&self) -> usize {
        match self {
            FieldValue::Many(values) => values.len(),
            FieldValue::One(_) => 1,
        }
    }
}

/// Parses a JSON/JSON5 tree document into a finalized [`Tree`].
pub fn parse_tree(input: &str) -> Result<ParseOutput, LoadError> {
    let document: TreeDocument = json5::from_str(input)?;
    let root = document.node.ok_or(LoadError::EmptyTree)?;

    let mut attributes: Vec<Attribute> = document
        .attributes
        .into_iter()
        .map(|decl| Attribute {
            display: decl.display.unwrap_or_else(|| decl.name.clone()),
            name: decl.name,
        })
        .collect();
    let mut widest = 1;
    collect_fields(&root, &mut attributes, &mut widest);

    let index_of = |name: &str| attributes.iter().position(|attr| attr.name == name);
    let magnitude = index_of(&document.magnitude)
        .ok_or_else(|| LoadError::UnknownMagnitude(document.magnitude.clone()))?;
    let hue_spec = match document.color {
        Some(color) => {
            let attribute = index_of(&color.attribute)
                .ok_or_else(|| LoadError::UnknownColorAttribute(color.attribute.clone()))?;
            Some(HueSpec {
                attribute,
                hue_start: color.hue_start / 360.0,
                hue_end: color.hue_end / 360.0,
                value_start: color.value_start,
                value_end: color.value_end,
                default: color.default,
            })
        }
        None => None,
    };

    let dataset_count = if document.datasets.is_empty() {
        widest
    } else {
        document.datasets.len()
    };
    let datasets = if document.datasets.is_empty() {
        (0..dataset_count).map(|index| format!("dataset {}", index + 1)).collect()
    } else {
        document.datasets
    };

    let names: Vec<String> = attributes.iter().map(|attr| attr.name.clone()).collect();
    let mut tree = Tree::new(root.name.clone(), attributes, magnitude);
    tree.datasets = datasets;
    tree.hue_spec = hue_spec;

    let use_hue = tree.hue_spec.as_ref().is_some_and(|spec| spec.default);
    // ids are handed out as nodes are popped, which numbers them in pre-order
    let mut stack: Vec<(Option<NodeId>, NodeDecl)> = vec![(None, root)];
    while let Some((parent, decl)) = stack.pop() {
        let id = match parent {
            Some(parent) => tree.add_child(parent, decl.name.clone()),
            None => ROOT,
        };
        if let Some(href) = decl.href {
            tree.set_href(id, href);
        }
        for (field, value) in decl.values {
            let Some(attribute) = names.iter().position(|name| *name == field) else {
                continue;
            };
            if value.len() > 1 && value.len() != dataset_count {
                return Err(LoadError::DatasetMismatch {
                    node: decl.name,
                    attribute: field,
                    found: value.len(),
                    expected: dataset_count,
                });
            }
            for (dataset, scalar) in value.into_values().into_iter().enumerate() {
                tree.set_value(id, attribute, dataset, scalar.into());
            }
        }
        // reversed so siblings are visited in document order
        stack.extend(decl.children.into_iter().rev().map(|child| (Some(id), child)));
    }

    tree.finalize(usize::MAX);
    log::debug!(
        "loaded tree '{}' with {} nodes, {} datasets",
        tree.root().name,
        tree.len(),
        tree.dataset_count()
    );

    Ok(ParseOutput {
        tree,
        defaults: DocumentDefaults {
            collapse: document.collapse,
            show_keys: document.key,
            use_hue,
        },
    })
}

fn collect_fields(node: &NodeDecl, attributes: &mut Vec<Attribute>, widest: &mut usize) {
    for (field, value) in &node.values {
        *widest = (*widest).max(value.len());
        if !attributes.iter().any(|attr| attr.name == *field) {
            attributes.push(Attribute {
                name: field.clone(),
                display: field.clone(),
            });
        }
    }
    for child in &node.children {
        collect_fields(child, attributes, widest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        // json5 comments are fine
        attributes: [{ name: "count", display: "Reads" }, { name: "score" }],
        magnitude: "count",
        color: { attribute: "score", hueStart: 0, hueEnd: 120, valueStart: 0, valueEnd: 1, default: true },
        node: {
            name: "all", count: 100, score: 0.5,
            children: [
                { name: "small", count: 10, score: 0.1 },
                { name: "big", count: 90, score: 1.0, href: "https://example.org/big" },
            ],
        },
    }"#;

    #[test]
    fn parses_and_sorts_document() {
        let parsed = parse_tree(DOC).unwrap();
        let tree = &parsed.tree;
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.root().magnitude, 100.0);
        let first = tree.node(tree.root().children[0]);
        assert_eq!(first.name, "big");
        assert_eq!(first.href.as_deref(), Some("https://example.org/big"));
        assert_eq!(tree.attributes[0].display, "Reads");
        assert!(parsed.defaults.use_hue);
    }

    #[test]
    fn ids_follow_document_pre_order() {
        let doc = r#"{ node: { name: "root", magnitude: 10, children: [
            { name: "A", magnitude: 4, children: [{ name: "A1", magnitude: 1 }, { name: "A2", magnitude: 3 }] },
            { name: "B", magnitude: 6 },
        ] } }"#;
        let tree = parse_tree(doc).unwrap().tree;
        let names: Vec<&str> = tree.nodes().iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, vec!["root", "A", "A1", "A2", "B"]);
        assert_eq!(tree.node(3).parent, Some(1));
        // sorting reorders children but never renumbers them
        assert_eq!(tree.root().children, vec![4, 1]);
        assert_eq!(tree.node(1).children, vec![3, 2]);
    }

    #[test]
    fn hue_comes_from_color_attribute() {
        let parsed = parse_tree(DOC).unwrap();
        let tree = &parsed.tree;
        let big = tree.node(tree.root().children[0]);
        assert!((big.hue(0).unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn per_dataset_values() {
        let doc = r#"{ datasets: ["a", "b"], node: { name: "r", magnitude: [4, 8],
            children: [{ name: "x", magnitude: [1, 6] }, { name: "y", magnitude: [3, 2] }] } }"#;
        let mut tree = parse_tree(doc).unwrap().tree;
        assert_eq!(tree.dataset_count(), 2);
        assert_eq!(tree.root().magnitude, 4.0);
        tree.set_dataset(1, usize::MAX);
        assert_eq!(tree.root().magnitude, 8.0);
    }

    #[test]
    fn unknown_magnitude_is_an_error() {
        let doc = r#"{ magnitude: "weight", node: { name: "r", count: 1 } }"#;
        assert!(matches!(parse_tree(doc), Err(LoadError::UnknownMagnitude(_))));
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(matches!(parse_tree("{}"), Err(LoadError::EmptyTree)));
    }

    #[test]
    fn mismatched_dataset_counts_are_rejected() {
        let doc = r#"{ datasets: ["a", "b", "c"], node: { name: "r", magnitude: [1, 2] } }"#;
        assert!(matches!(parse_tree(doc), Err(LoadError::DatasetMismatch { .. })));
    }
}
