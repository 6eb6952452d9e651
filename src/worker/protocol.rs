//! Wire types for the worker line protocol.
//!
//! One JSON object per line in each direction. A request names the dotted
//! path of the object to collect plus pass-through selection options; a
//! response carries either a worker-side error or exactly one collected
//! object in flattened form, along with non-fatal diagnostics.
//!
//! JSON string escaping guarantees a serialized request never contains a
//! raw newline, so one `write` + one `read_line` is a complete exchange.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Requests
// ============================================================================

/// Request sent to the worker.
///
/// The wire shape is `{"objects":[{"path":"pkg.Foo","filters":[...]}]}`:
/// selection options sit flattened next to `path`. The `objects` list always
/// holds exactly one entry; objects are collected one at a time.
#[derive(Debug, Clone, Serialize)]
pub struct CollectRequest {
    /// Objects to collect. Always a single entry.
    pub objects: Vec<RequestObject>,
}

impl CollectRequest {
    /// Build a single-object request from an identifier and its merged
    /// selection options.
    pub fn new(identifier: impl Into<String>, options: Map<String, Value>) -> Self {
        Self {
            objects: vec![RequestObject {
                path: identifier.into(),
                options,
            }],
        }
    }
}

/// One entry of a request's `objects` list.
#[derive(Debug, Clone, Serialize)]
pub struct RequestObject {
    /// Dotted path of the object to collect.
    pub path: String,
    /// Selection options, forwarded verbatim to the worker.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

// ============================================================================
// Responses
// ============================================================================

/// Response decoded from one line of worker output.
#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
    /// Fatal worker-side failure, when present.
    #[serde(default)]
    pub error: Option<String>,
    /// Worker-side traceback accompanying `error`.
    #[serde(default)]
    pub traceback: Option<String>,
    /// Non-fatal diagnostics from loading the target module.
    #[serde(default)]
    pub loading_errors: Vec<String>,
    /// Non-fatal diagnostics from parsing docstrings, keyed by object path.
    #[serde(default)]
    pub parsing_errors: OrderedMap<Vec<String>>,
    /// Collected objects. Exactly one on success.
    #[serde(default)]
    pub objects: Vec<FlatObject>,
}

/// Category of a collected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Module,
    Class,
    Function,
    Method,
    Attribute,
}

impl Category {
    /// The lowercase wire name of this category.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Module => "module",
            Category::Class => "class",
            Category::Function => "function",
            Category::Method => "method",
            Category::Attribute => "attribute",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collected object in flattened wire form.
///
/// The worker stores every descendant once, keyed by path in `children`,
/// and reduces the five category lists to path references into it. That
/// normalization is what keeps the serialized tree free of duplicate
/// encodings and reference cycles.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatObject {
    /// Dotted path uniquely identifying this object.
    pub path: String,
    /// Which of the five partitions this object belongs to.
    pub category: Category,
    /// Direct children, keyed by path, in worker emission order. Each value
    /// is itself a flattened node carrying its own descendants.
    #[serde(default)]
    pub children: OrderedMap<FlatObject>,
    /// Paths of children that are attributes.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Paths of children that are classes.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Paths of children that are functions.
    #[serde(default)]
    pub functions: Vec<String>,
    /// Paths of children that are methods.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Paths of children that are modules.
    #[serde(default)]
    pub modules: Vec<String>,
    /// All other worker-emitted fields (name, docstring, source, ...),
    /// carried through untouched for the renderer.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Ordered mapping
// ============================================================================

/// An insertion-ordered, string-keyed mapping.
///
/// The worker emits `children` in declaration order and that order is part
/// of the contract; a hash map would lose it. Entries are kept as a pair
/// vector in document order. Lookups are linear; callers resolving many
/// references build a positional index first.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up a value by key. Linear scan.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Append an entry, keeping insertion order.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.0.push((key.into(), value));
    }

    /// Consume the map into its entries, in insertion order.
    pub fn into_entries(self) -> Vec<(String, V)> {
        self.0
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a string-keyed map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}
