/*!
# Anti-Recursion Guard

A rule that rewrites code into a call to operation X must not fire inside
the implementation of X itself: rewriting `noneSatisfy`'s own default body
into a call to `noneSatisfy` turns it into infinite recursion.

The check is lexical. The enclosing method's name is compared with the
target operation and its owner class is checked against the operation's
type family. Two-hop cycles are found with a bounded walk over sibling
methods' self-calls, so a method that the target operation itself calls
(for example `anySatisfy` implemented as `!noneSatisfy`) is protected too.
*/

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::ast::{Node, NodeKind, SyntaxNode};
use crate::oracle::{FamilySet, TypeOracle};

use super::Cursor;

/// The operation a rule's replacement invokes, e.g. `noneSatisfy` on the
/// RichIterable family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOperation {
    pub name: String,
    /// Owner families; empty means any owner
    pub family: FamilySet,
}

impl TargetOperation {
    pub fn new(name: &str, family: FamilySet) -> Self {
        Self {
            name: name.to_string(),
            family,
        }
    }
}

/// Whether a rewrite into a call to `target` is allowed at the position
/// described by `cursor`. `depth` bounds the callee walk: 1 only compares
/// the enclosing method itself, 2 also follows one hop of self-calls.
pub fn is_safe_context(
    cursor: &Cursor,
    target: &TargetOperation,
    oracle: &TypeOracle,
    depth: usize,
) -> bool {
    let Some(method) = cursor.enclosing_method() else {
        return true;
    };
    let NodeKind::Method { name, .. } = &method.kind else {
        return true;
    };

    let owner = cursor.enclosing_class();
    if !owner_in_family(owner, target, oracle) {
        return true;
    }

    if *name == target.name {
        trace!(method = %name, "Enclosing method implements the target operation");
        return false;
    }

    let Some(owner) = owner else {
        return true;
    };

    // Follow self-calls out of the target operation's own body; reaching the
    // enclosing method closes a cycle.
    let mut frontier = vec![target.name.clone()];
    let mut seen: HashSet<String> = frontier.iter().cloned().collect();
    for _ in 1..depth {
        let mut next = Vec::new();
        for callee in &frontier {
            for sibling in sibling_methods(owner, callee) {
                for called in self_calls(&sibling) {
                    if called == *name {
                        trace!(method = %name, via = %callee, "Two-hop recursion with target operation");
                        return false;
                    }
                    if seen.insert(called.clone()) {
                        next.push(called);
                    }
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    true
}

/// Unresolvable owners count as members
fn owner_in_family(owner: Option<&Node>, target: &TargetOperation, oracle: &TypeOracle) -> bool {
    if target.family.is_empty() {
        return true;
    }
    match owner {
        Some(class) => oracle
            .family_of_declaration(class)
            .map(|families| families.intersects(target.family))
            .unwrap_or(true),
        None => true,
    }
}

fn sibling_methods(class: &Node, name: &str) -> Vec<Node> {
    match &class.kind {
        NodeKind::Class { members, .. } => members
            .iter()
            .filter(|m| matches!(&m.kind, NodeKind::Method { name: n, .. } if n == name))
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

/// Names of methods called on `this` (explicitly or implicitly) in a method body
fn self_calls(method: &Node) -> Vec<String> {
    let NodeKind::Method {
        body: Some(body), ..
    } = &method.kind
    else {
        return Vec::new();
    };
    SyntaxNode::descendants(body)
        .iter()
        .filter_map(|node| match &node.kind {
            NodeKind::MethodCall { receiver, name, .. } => {
                let on_self = match receiver {
                    None => true,
                    Some(r) => matches!(SyntaxNode::unparenthesized(r).kind, NodeKind::This),
                };
                on_self.then(|| name.clone())
            }
            _ => None,
        })
        .collect()
}
