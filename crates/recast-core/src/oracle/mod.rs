/*!
# Type Oracle

Read-only queries over the host's resolved type information.

The host hands over a `TypeHierarchy` (every known type and its direct
supertypes). Building a `TypeOracle` computes, once, the subtype closure of
every known type against the configured family roots, so that
`family_of` is a map lookup during traversal.
*/

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ast::{simple_name, BindingId, Node, NodeKind, SyntaxNode};

/// A closure of types that rules treat as interchangeable receivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeFamily {
    RichIterable,
    MapIterable,
    JdkIterable,
    JdkCollection,
    JdkMap,
    JdkStream,
    Predicate,
    Optional,
    Array,
}

impl TypeFamily {
    pub const ALL: [TypeFamily; 9] = [
        TypeFamily::RichIterable,
        TypeFamily::MapIterable,
        TypeFamily::JdkIterable,
        TypeFamily::JdkCollection,
        TypeFamily::JdkMap,
        TypeFamily::JdkStream,
        TypeFamily::Predicate,
        TypeFamily::Optional,
        TypeFamily::Array,
    ];

    pub fn flag(self) -> FamilySet {
        match self {
            TypeFamily::RichIterable => FamilySet::RICH_ITERABLE,
            TypeFamily::MapIterable => FamilySet::MAP_ITERABLE,
            TypeFamily::JdkIterable => FamilySet::JDK_ITERABLE,
            TypeFamily::JdkCollection => FamilySet::JDK_COLLECTION,
            TypeFamily::JdkMap => FamilySet::JDK_MAP,
            TypeFamily::JdkStream => FamilySet::JDK_STREAM,
            TypeFamily::Predicate => FamilySet::PREDICATE,
            TypeFamily::Optional => FamilySet::OPTIONAL,
            TypeFamily::Array => FamilySet::ARRAY,
        }
    }
}

bitflags! {
    /// Set of type families a static type belongs to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FamilySet: u16 {
        const RICH_ITERABLE = 1 << 0;
        const MAP_ITERABLE = 1 << 1;
        const JDK_ITERABLE = 1 << 2;
        const JDK_COLLECTION = 1 << 3;
        const JDK_MAP = 1 << 4;
        const JDK_STREAM = 1 << 5;
        const PREDICATE = 1 << 6;
        const OPTIONAL = 1 << 7;
        const ARRAY = 1 << 8;
    }
}

impl From<TypeFamily> for FamilySet {
    fn from(family: TypeFamily) -> Self {
        family.flag()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("no resolved {what} for {node}")]
    Unresolved { what: &'static str, node: String },

    #[error("type '{0}' is not part of the resolved hierarchy")]
    UnknownType(String),
}

pub type OracleResult<T> = Result<T, OracleError>;

/// Known types and their direct supertypes, keyed by fully-qualified name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeHierarchy {
    types: IndexMap<String, Vec<String>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fqn: impl Into<String>, supertypes: &[&str]) -> &mut Self {
        self.types.insert(
            fqn.into(),
            supertypes.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with(mut self, fqn: &str, supertypes: &[&str]) -> Self {
        self.insert(fqn, supertypes);
        self
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.types.contains_key(fqn)
    }

    pub fn supertypes(&self, fqn: &str) -> &[String] {
        self.types.get(fqn).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Eclipse Collections and JDK collection types most code touches
    pub fn standard() -> Self {
        const EC: &str = "org.eclipse.collections";
        let mut h = Self::new();
        h.insert("java.lang.Iterable", &[])
            .insert("java.util.Collection", &["java.lang.Iterable"])
            .insert("java.util.List", &["java.util.Collection"])
            .insert("java.util.Set", &["java.util.Collection"])
            .insert("java.util.SortedSet", &["java.util.Set"])
            .insert("java.util.Queue", &["java.util.Collection"])
            .insert("java.util.Deque", &["java.util.Queue"])
            .insert("java.util.ArrayList", &["java.util.List"])
            .insert("java.util.LinkedList", &["java.util.List", "java.util.Deque"])
            .insert("java.util.HashSet", &["java.util.Set"])
            .insert("java.util.LinkedHashSet", &["java.util.HashSet"])
            .insert("java.util.TreeSet", &["java.util.SortedSet"])
            .insert("java.util.Map", &[])
            .insert("java.util.SortedMap", &["java.util.Map"])
            .insert("java.util.HashMap", &["java.util.Map"])
            .insert("java.util.LinkedHashMap", &["java.util.HashMap"])
            .insert("java.util.TreeMap", &["java.util.SortedMap"])
            .insert("java.util.Optional", &[])
            .insert("java.util.stream.BaseStream", &[])
            .insert("java.util.stream.Stream", &["java.util.stream.BaseStream"])
            .insert("java.util.function.Predicate", &[]);

        let ec = |suffix: &str| format!("{EC}.{suffix}");
        let ec_types: [(&str, &[&str]); 16] = [
            ("api.InternalIterable", &["java.lang.Iterable"]),
            ("api.RichIterable", &["api.InternalIterable"]),
            ("api.collection.MutableCollection", &["api.RichIterable", "java.util.Collection"]),
            ("api.collection.ImmutableCollection", &["api.RichIterable"]),
            ("api.list.ListIterable", &["api.RichIterable"]),
            ("api.list.MutableList", &["api.collection.MutableCollection", "api.list.ListIterable", "java.util.List"]),
            ("api.list.ImmutableList", &["api.collection.ImmutableCollection", "api.list.ListIterable"]),
            ("api.set.SetIterable", &["api.RichIterable"]),
            ("api.set.MutableSet", &["api.collection.MutableCollection", "api.set.SetIterable", "java.util.Set"]),
            ("api.set.ImmutableSet", &["api.collection.ImmutableCollection", "api.set.SetIterable"]),
            ("api.bag.MutableBag", &["api.collection.MutableCollection"]),
            ("api.map.MapIterable", &["api.RichIterable"]),
            ("api.map.MutableMap", &["api.map.MapIterable", "java.util.Map"]),
            ("impl.list.mutable.FastList", &["api.list.MutableList"]),
            ("impl.set.mutable.UnifiedSet", &["api.set.MutableSet"]),
            ("impl.map.mutable.UnifiedMap", &["api.map.MutableMap"]),
        ];
        for (name, supers) in ec_types {
            let supers: Vec<String> = supers
                .iter()
                .map(|s| if s.starts_with("java.") { s.to_string() } else { ec(s) })
                .collect();
            let supers: Vec<&str> = supers.iter().map(String::as_str).collect();
            h.insert(ec(name), &supers);
        }
        h.insert(
            ec("api.block.predicate.Predicate"),
            &["java.util.function.Predicate"],
        );
        h
    }
}

/// Root types of each family. Everything that (transitively) extends a root
/// is a member of that root's family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub family_roots: IndexMap<TypeFamily, Vec<String>>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        let mut family_roots = IndexMap::new();
        let mut root = |family, names: &[&str]| {
            family_roots.insert(family, names.iter().map(|s| s.to_string()).collect());
        };
        root(TypeFamily::RichIterable, &["org.eclipse.collections.api.RichIterable"]);
        root(TypeFamily::MapIterable, &["org.eclipse.collections.api.map.MapIterable"]);
        root(TypeFamily::JdkIterable, &["java.lang.Iterable"]);
        root(TypeFamily::JdkCollection, &["java.util.Collection"]);
        root(TypeFamily::JdkMap, &["java.util.Map"]);
        root(TypeFamily::JdkStream, &["java.util.stream.Stream"]);
        root(
            TypeFamily::Predicate,
            &[
                "java.util.function.Predicate",
                "org.eclipse.collections.api.block.predicate.Predicate",
            ],
        );
        root(TypeFamily::Optional, &["java.util.Optional"]);
        Self { family_roots }
    }
}

const PRIMITIVES: [&str; 9] = [
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// Identity of a reference expression for `same_binding`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefId {
    This,
    Binding(BindingId),
}

/// Answers family membership and binding identity questions for one
/// compilation unit. Immutable once built; safe to share across threads.
#[derive(Debug, Clone)]
pub struct TypeOracle {
    hierarchy: TypeHierarchy,
    closure: HashMap<String, FamilySet>,
    by_simple_name: HashMap<String, Vec<String>>,
}

impl TypeOracle {
    pub fn new(hierarchy: TypeHierarchy, config: &OracleConfig) -> Self {
        let mut roots: HashMap<&str, FamilySet> = HashMap::new();
        for (family, names) in &config.family_roots {
            for name in names {
                *roots.entry(name.as_str()).or_default() |= family.flag();
            }
        }

        let mut closure = HashMap::with_capacity(hierarchy.len());
        for fqn in hierarchy.types.keys() {
            let mut visiting = HashSet::new();
            close_over(&hierarchy, &roots, fqn, &mut closure, &mut visiting);
        }

        let mut by_simple_name: HashMap<String, Vec<String>> = HashMap::new();
        for fqn in hierarchy.types.keys() {
            by_simple_name
                .entry(simple_name(fqn).to_string())
                .or_default()
                .push(fqn.clone());
        }

        debug!(types = closure.len(), "Computed type family closure");

        Self {
            hierarchy,
            closure,
            by_simple_name,
        }
    }

    /// Oracle over `TypeHierarchy::standard()` with default family roots
    pub fn standard() -> Self {
        Self::new(TypeHierarchy::standard(), &OracleConfig::default())
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Families of a node's resolved static type
    pub fn family_of(&self, node: &Node) -> OracleResult<FamilySet> {
        let node = SyntaxNode::unparenthesized(node);
        match &node.ty {
            Some(ty) => self.family_of_type(ty),
            None => Err(OracleError::Unresolved {
                what: "type",
                node: node.kind_name().to_string(),
            }),
        }
    }

    /// Families of a type name as the host spells it. Generic arguments are
    /// erased; a simple name resolves when it is unambiguous in the hierarchy.
    pub fn family_of_type(&self, ty: &str) -> OracleResult<FamilySet> {
        let erased = erase(ty);
        if erased.ends_with("[]") {
            return Ok(FamilySet::ARRAY);
        }
        if let Some(set) = self.closure.get(erased) {
            return Ok(*set);
        }
        if PRIMITIVES.contains(&erased) {
            return Ok(FamilySet::empty());
        }
        if let Some(candidates) = self.by_simple_name.get(erased) {
            if let [only] = candidates.as_slice() {
                return Ok(self.closure.get(only).copied().unwrap_or_default());
            }
        }
        if erased.starts_with("java.lang.") || is_java_lang_simple(erased) {
            return Ok(FamilySet::empty());
        }
        Err(OracleError::UnknownType(erased.to_string()))
    }

    /// Families a class declaration belongs to through its declared supertypes.
    /// Unknown supertypes are tolerated as long as one supertype resolves.
    pub fn family_of_declaration(&self, class: &Node) -> OracleResult<FamilySet> {
        let NodeKind::Class {
            name, supertypes, ..
        } = &class.kind
        else {
            return Err(OracleError::Unresolved {
                what: "class declaration",
                node: class.kind_name().to_string(),
            });
        };

        if let Ok(own) = self.family_of_type(name) {
            if !own.is_empty() {
                return Ok(own);
            }
        }

        let mut set = FamilySet::empty();
        let mut first_unknown = None;
        let mut resolved_any = supertypes.is_empty();
        for supertype in supertypes {
            match self.family_of_type(supertype) {
                Ok(families) => {
                    set |= families;
                    resolved_any = true;
                }
                Err(e) => {
                    first_unknown.get_or_insert(e);
                }
            }
        }

        match first_unknown {
            Some(e) if !resolved_any => Err(e),
            _ => Ok(set),
        }
    }

    /// Whether two reference expressions denote the same declaration.
    /// `this.f` and bare `f` agree when both resolve to the same field.
    /// Non-reference expressions are never the same binding.
    pub fn same_binding(&self, a: &Node, b: &Node) -> OracleResult<bool> {
        match (reference_id(a)?, reference_id(b)?) {
            (Some(x), Some(y)) => Ok(x == y),
            _ => Ok(false),
        }
    }

    /// Structural equivalence ignoring side data. References compare by
    /// binding identity; lambda parameters compare up to renaming.
    pub fn equivalent(&self, a: &Node, b: &Node) -> OracleResult<bool> {
        let mut renames = Vec::new();
        equivalent_in(a, b, &mut renames)
    }
}

fn close_over(
    hierarchy: &TypeHierarchy,
    roots: &HashMap<&str, FamilySet>,
    fqn: &str,
    closure: &mut HashMap<String, FamilySet>,
    visiting: &mut HashSet<String>,
) -> FamilySet {
    if let Some(set) = closure.get(fqn) {
        return *set;
    }
    // A cyclic hierarchy is malformed host input; stop instead of recursing
    if !visiting.insert(fqn.to_string()) {
        return FamilySet::empty();
    }

    let mut set = roots.get(fqn).copied().unwrap_or_default();
    for supertype in hierarchy.supertypes(fqn) {
        let supertype = erase(supertype);
        if hierarchy.contains(supertype) {
            set |= close_over(hierarchy, roots, supertype, closure, visiting);
        } else if let Some(root) = roots.get(supertype) {
            set |= *root;
        }
    }

    visiting.remove(fqn);
    closure.insert(fqn.to_string(), set);
    set
}

/// Strip generic arguments and bounds: `? extends List<T>` -> `List`
fn erase(ty: &str) -> &str {
    let ty = ty.trim();
    let ty = ty
        .strip_prefix("? extends ")
        .or_else(|| ty.strip_prefix("? super "))
        .unwrap_or(ty);
    match ty.find('<') {
        Some(idx) => {
            let base = &ty[..idx];
            // keep array suffix of a generic array type
            if ty.ends_with("[]") {
                ty
            } else {
                base.trim()
            }
        }
        None => ty,
    }
}

fn is_java_lang_simple(name: &str) -> bool {
    matches!(
        name,
        "Object"
            | "String"
            | "Integer"
            | "Long"
            | "Double"
            | "Float"
            | "Short"
            | "Byte"
            | "Character"
            | "Boolean"
            | "Number"
            | "CharSequence"
            | "Comparable"
    )
}

fn reference_id(node: &Node) -> OracleResult<Option<RefId>> {
    let node = SyntaxNode::unparenthesized(node);
    let binding = match &node.kind {
        NodeKind::This => return Ok(Some(RefId::This)),
        NodeKind::Identifier { binding, .. } => binding,
        NodeKind::FieldAccess {
            target, binding, ..
        } if matches!(SyntaxNode::unparenthesized(target).kind, NodeKind::This) => binding,
        _ => return Ok(None),
    };
    match binding {
        Some(id) => Ok(Some(RefId::Binding(*id))),
        None => Err(OracleError::Unresolved {
            what: "binding",
            node: node.kind_name().to_string(),
        }),
    }
}

fn equivalent_in(
    a: &Node,
    b: &Node,
    renames: &mut Vec<(BindingId, BindingId)>,
) -> OracleResult<bool> {
    let a = SyntaxNode::unparenthesized(a);
    let b = SyntaxNode::unparenthesized(b);

    if let (Some(x), Some(y)) = (reference_id(a)?, reference_id(b)?) {
        return Ok(match (x, y) {
            (RefId::Binding(x), RefId::Binding(y)) => {
                x == y || renames.iter().any(|&(l, r)| l == x && r == y)
            }
            (x, y) => x == y,
        });
    }

    let same_head = match (&a.kind, &b.kind) {
        (NodeKind::Int(x), NodeKind::Int(y)) => x == y,
        (NodeKind::Bool(x), NodeKind::Bool(y)) => x == y,
        (NodeKind::Str(x), NodeKind::Str(y)) => x == y,
        (NodeKind::Null, NodeKind::Null) => true,
        (NodeKind::TypeRef { name: x, fqn: fx }, NodeKind::TypeRef { name: y, fqn: fy }) => {
            match (fx, fy) {
                (Some(fx), Some(fy)) => fx == fy,
                _ => x == y,
            }
        }
        (NodeKind::FieldAccess { name: x, .. }, NodeKind::FieldAccess { name: y, .. }) => x == y,
        (
            NodeKind::MethodCall {
                receiver: rx,
                name: x,
                args: ax,
            },
            NodeKind::MethodCall {
                receiver: ry,
                name: y,
                args: ay,
            },
        ) => x == y && rx.is_some() == ry.is_some() && ax.len() == ay.len(),
        (NodeKind::New { args: x, .. }, NodeKind::New { args: y, .. }) => x.len() == y.len(),
        (NodeKind::Binary { op: x, .. }, NodeKind::Binary { op: y, .. }) => x == y,
        (NodeKind::Unary { op: x, .. }, NodeKind::Unary { op: y, .. }) => x == y,
        (NodeKind::Conditional { .. }, NodeKind::Conditional { .. }) => true,
        (NodeKind::MethodRef { name: x, .. }, NodeKind::MethodRef { name: y, .. }) => x == y,
        (NodeKind::Lambda { params: px, .. }, NodeKind::Lambda { params: py, .. }) => {
            if px.len() != py.len() {
                return Ok(false);
            }
            for (l, r) in px.iter().zip(py) {
                if let (Some(l), Some(r)) = (l.binding, r.binding) {
                    renames.push((l, r));
                }
            }
            true
        }
        _ => false,
    };
    if !same_head {
        return Ok(false);
    }

    let left = a.children();
    let right = b.children();
    if left.len() != right.len() {
        return Ok(false);
    }
    for (l, r) in left.iter().zip(&right) {
        if !equivalent_in(l, r, renames)? {
            return Ok(false);
        }
    }
    Ok(true)
}
