/*!
# Import Reconciliation

After a pass, the import list of a compilation unit is brought back in line
with what the tree references:

- a fully-qualified type spelled by a replacement and not already resolvable
  (explicit import, on-demand import, same package, `java.lang`) is imported;
- an explicit import whose simple name was mentioned before the pass and is
  mentioned nowhere afterwards is dropped.

Imports unrelated to the rewritten code are left exactly where they were.
Reconciling an already reconciled tree yields the same set.
*/

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::{package_of, simple_name, Import, Node, NodeKind, SyntaxNode};

/// Ordered import declarations of one compilation unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSet {
    imports: Vec<Import>,
}

impl ImportSet {
    pub fn new(imports: Vec<Import>) -> Self {
        Self { imports }
    }

    pub fn of(tree: &Node) -> Self {
        Self::new(tree.imports().to_vec())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Import> {
        self.imports.iter()
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.imports.iter().any(|i| i.path == path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.imports.iter().map(|i| i.path.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<Import> {
        self.imports
    }

    /// Explicit single-type import that brings `simple` into scope
    fn explicit(&self, simple: &str) -> Option<&Import> {
        self.imports
            .iter()
            .find(|i| !i.is_static && i.simple_name() == Some(simple))
    }
}

/// A required type whose simple name is already taken in the unit
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("importing {requested} clashes with {existing}")]
pub struct ImportConflict {
    pub requested: String,
    pub existing: String,
}

/// Name-resolution view of a compilation unit used to vet new type references
#[derive(Debug, Clone, Default)]
pub struct ImportScope {
    package: Option<String>,
    imports: ImportSet,
    local_types: Vec<String>,
}

impl ImportScope {
    pub fn of(tree: &Node) -> Self {
        let local_types = SyntaxNode::descendants(tree)
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::Class { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        Self {
            package: tree.package().map(str::to_string),
            imports: ImportSet::of(tree),
            local_types,
        }
    }

    pub fn imports(&self) -> &ImportSet {
        &self.imports
    }

    /// Whether `fqn` can already be written by its simple name
    pub fn resolves(&self, fqn: &str) -> bool {
        let package = package_of(fqn);
        package == "java.lang"
            || self.package.as_deref() == Some(package)
            || self.imports.iter().any(|import| {
                !import.is_static
                    && (import.path == fqn
                        || import
                            .path
                            .strip_suffix(".*")
                            .is_some_and(|p| p == package))
            })
    }

    /// Whether `fqn` names a type declared in this unit, top-level or nested
    fn declares(&self, fqn: &str) -> bool {
        let relative = match self.package.as_deref() {
            Some(package) => match fqn.strip_prefix(package).and_then(|r| r.strip_prefix('.')) {
                Some(relative) => relative,
                None => return false,
            },
            None => fqn,
        };
        relative
            .split('.')
            .all(|segment| self.local_types.iter().any(|t| t == segment))
    }

    /// `Ok(true)` when `fqn` needs a new import, `Ok(false)` when it already
    /// resolves, and a conflict when its simple name means something else here
    pub fn check_addable(&self, fqn: &str) -> Result<bool, ImportConflict> {
        if self.resolves(fqn) {
            return Ok(false);
        }
        let simple = simple_name(fqn);
        if let Some(existing) = self.imports.explicit(simple) {
            return Err(ImportConflict {
                requested: fqn.to_string(),
                existing: existing.path.clone(),
            });
        }
        if self.local_types.iter().any(|t| t == simple) {
            // a type nested in this unit is already in scope by its simple name
            if self.declares(fqn) {
                return Ok(false);
            }
            return Err(ImportConflict {
                requested: fqn.to_string(),
                existing: format!("local type {simple}"),
            });
        }
        Ok(true)
    }
}

/// Compute the import set `new_tree` needs, starting from the imports
/// declared on it and using `old_tree` to tell which uses went away
pub fn reconcile_imports(old_tree: &Node, new_tree: &Node) -> Result<ImportSet, ImportConflict> {
    let scope = ImportScope::of(new_tree);
    let before = mentioned_names(old_tree);
    let after = mentioned_names(new_tree);

    let mut imports: Vec<Import> = scope
        .imports()
        .iter()
        .filter(|import| match import.simple_name() {
            Some(simple) if !import.is_static => {
                !before.contains(simple) || after.contains(simple)
            }
            _ => true,
        })
        .cloned()
        .collect();

    // only references the rewrite introduced; existing ones already compile
    let existing = referenced_types(old_tree);
    let mut additions = Vec::new();
    for fqn in referenced_types(new_tree) {
        if existing.contains(&fqn) {
            continue;
        }
        if scope.check_addable(&fqn)? && !additions.contains(&fqn) {
            additions.push(fqn);
        }
    }
    additions.sort();
    imports.extend(additions.into_iter().map(Import::single));

    Ok(ImportSet::new(imports))
}

/// Fully-qualified names of types used in expression position, in tree order
pub fn referenced_types(tree: &Node) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for node in SyntaxNode::descendants(tree) {
        if let NodeKind::TypeRef { fqn: Some(fqn), .. } = &node.kind {
            if !out.contains(fqn) {
                out.push(fqn.clone());
            }
        }
    }
    out
}

/// Every simple type name the tree mentions, in expressions and in declared types
fn mentioned_names(tree: &Node) -> HashSet<String> {
    let mut names = HashSet::new();
    let add_type_text = |text: &str, names: &mut HashSet<String>| {
        for token in text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.')) {
            if !token.is_empty() {
                names.insert(simple_name(token).to_string());
            }
        }
    };

    for node in SyntaxNode::descendants(tree) {
        match &node.kind {
            NodeKind::TypeRef { name, .. } => {
                names.insert(name.clone());
            }
            NodeKind::LocalVar { declared_type, .. } | NodeKind::Field { declared_type, .. } => {
                add_type_text(declared_type, &mut names)
            }
            NodeKind::Method {
                params,
                return_type,
                ..
            } => {
                add_type_text(return_type, &mut names);
                for param in params {
                    add_type_text(&param.declared_type, &mut names);
                }
            }
            NodeKind::Class { supertypes, .. } => {
                for supertype in supertypes {
                    add_type_text(supertype, &mut names);
                }
            }
            _ => {}
        }
    }
    names
}
