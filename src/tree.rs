//! Reconstruction of nested documentation trees.
//!
//! The worker flattens each node's children into a path-keyed mapping and
//! reduces the five category lists to path references, which keeps its
//! JSON output free of duplicate encodings and reference cycles. This
//! module folds the wire form back: owned child nodes in emission order,
//! with the category lists as index views into them, so a category entry
//! and the corresponding child are one and the same node.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::worker::protocol::{Category, FlatObject};
use crate::worker::{CollectionError, CollectionResult};

/// A reconstructed documentation node.
///
/// `children` owns the direct child nodes, in the order the worker emitted
/// them. Category membership is stored as positions into `children` rather
/// than as copies, so the two views can never diverge.
#[derive(Debug, Clone, PartialEq)]
pub struct DocNode {
    /// Dotted path uniquely identifying this object.
    pub path: String,
    /// Which of the five partitions this object belongs to.
    pub category: Category,
    /// Direct children, in worker emission order.
    pub children: Vec<DocNode>,
    /// Remaining worker-emitted fields (name, docstring, source, ...),
    /// untouched, for the renderer.
    pub extra: Map<String, Value>,
    attributes: Vec<usize>,
    classes: Vec<usize>,
    functions: Vec<usize>,
    methods: Vec<usize>,
    modules: Vec<usize>,
}

impl DocNode {
    /// Children belonging to `category`, in the worker's category order.
    pub fn members(&self, category: Category) -> impl Iterator<Item = &DocNode> {
        self.indices(category).iter().map(|&i| &self.children[i])
    }

    /// Attribute children, in category order.
    pub fn attributes(&self) -> impl Iterator<Item = &DocNode> {
        self.members(Category::Attribute)
    }

    /// Class children, in category order.
    pub fn classes(&self) -> impl Iterator<Item = &DocNode> {
        self.members(Category::Class)
    }

    /// Function children, in category order.
    pub fn functions(&self) -> impl Iterator<Item = &DocNode> {
        self.members(Category::Function)
    }

    /// Method children, in category order.
    pub fn methods(&self) -> impl Iterator<Item = &DocNode> {
        self.members(Category::Method)
    }

    /// Module children, in category order.
    pub fn modules(&self) -> impl Iterator<Item = &DocNode> {
        self.members(Category::Module)
    }

    /// Positions into `children` for the members of `category`.
    pub fn indices(&self, category: Category) -> &[usize] {
        match category {
            Category::Attribute => &self.attributes,
            Category::Class => &self.classes,
            Category::Function => &self.functions,
            Category::Method => &self.methods,
            Category::Module => &self.modules,
        }
    }

    /// Total number of nodes in this tree, the root included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(DocNode::count).sum::<usize>()
    }
}

/// Rebuild a flattened object into a nested [`DocNode`] tree.
///
/// Each category path is resolved to the position of the matching
/// `children` key, the children mapping becomes an owned child vector in
/// its iteration order, and the same transformation recurses into every
/// child. Every node is visited exactly once, so the whole rebuild is
/// linear in the number of descendants; a per-node positional index keeps
/// each category lookup constant-time.
///
/// Rebuilding consumes the wire form, so a tree cannot be rebuilt twice.
///
/// # Errors
///
/// [`CollectionError::MissingChild`] when a category list references a
/// path that is not a key of the same node's `children` mapping. That is a
/// contract violation by the worker (a version mismatch, not bad input),
/// so it fails the collection rather than being skipped.
pub fn rebuild(flat: FlatObject) -> CollectionResult<DocNode> {
    let FlatObject {
        path,
        category,
        children,
        attributes,
        classes,
        functions,
        methods,
        modules,
        extra,
    } = flat;

    let entries = children.into_entries();

    let (attributes, classes, functions, methods, modules) = {
        let positions: HashMap<&str, usize> = entries
            .iter()
            .enumerate()
            .map(|(index, (key, _))| (key.as_str(), index))
            .collect();

        let resolve = |paths: Vec<String>| -> CollectionResult<Vec<usize>> {
            paths
                .into_iter()
                .map(|child_path| {
                    positions.get(child_path.as_str()).copied().ok_or_else(|| {
                        CollectionError::MissingChild {
                            parent: path.clone(),
                            path: child_path,
                        }
                    })
                })
                .collect()
        };

        (
            resolve(attributes)?,
            resolve(classes)?,
            resolve(functions)?,
            resolve(methods)?,
            resolve(modules)?,
        )
    };

    let children = entries
        .into_iter()
        .map(|(_, child)| rebuild(child))
        .collect::<CollectionResult<Vec<_>>>()?;

    Ok(DocNode {
        path,
        category,
        children,
        extra,
        attributes,
        classes,
        functions,
        methods,
        modules,
    })
}
