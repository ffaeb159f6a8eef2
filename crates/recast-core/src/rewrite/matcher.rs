/*!
# Matcher

Structural unification of a `Pattern` against a syntax node.

Pattern and node are walked in lock-step. A capture slot binds on first
occurrence; a repeated slot must see an equivalent node (same literal, same
binding identity for references). Parentheses around a node are transparent
to every structural pattern position; a capture keeps the node as written.
*/

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::ast::{simple_name, LambdaParam, Node, NodeKind, SyntaxNode, UnaryOp};
use crate::oracle::{FamilySet, OracleError, TypeOracle};

use super::imports::ImportConflict;
use super::pattern::{CaptureKind, Metavar, Pattern};

/// Metavariable name to captured node, for one successful match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    map: IndexMap<String, Node>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: &str) -> Option<&Node> {
        self.map.get(var)
    }

    /// The node bound to `var`; an unbound slot is a rule configuration error
    pub fn require(&self, var: &Metavar) -> Result<&Node, NoMatch> {
        self.map
            .get(var.as_str())
            .ok_or_else(|| NoMatch::Unbound(var.to_string()))
    }

    pub fn insert(&mut self, var: &Metavar, node: Node) {
        self.map.insert(var.0.clone(), node);
    }

    pub fn contains(&self, var: &str) -> bool {
        self.map.contains_key(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Why a rule does not apply at a node. Expected and frequent, not an error
/// of the pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoMatch {
    #[error("expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("expected name '{expected}', found '{found}'")]
    NameMismatch { expected: String, found: String },

    #[error("expected {expected} arguments, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("literal value differs")]
    LiteralMismatch,

    #[error("operator differs")]
    OperatorMismatch,

    #[error("{var} does not accept a {found} ({kind:?} capture)")]
    CaptureKindMismatch {
        var: String,
        kind: CaptureKind,
        found: &'static str,
    },

    #[error("{0} is bound to a different subtree")]
    InconsistentBinding(String),

    #[error("{0} is not bound by the pattern")]
    Unbound(String),

    #[error("guard {guard} failed: {detail}")]
    GuardFailed { guard: &'static str, detail: String },

    #[error("type resolution unavailable: {0}")]
    TypeResolutionUnavailable(#[from] OracleError),

    #[error("inside an implementation of {operation}")]
    UnsafeContext { operation: String },

    #[error(transparent)]
    ImportConflict(#[from] ImportConflict),

    #[error("rule panicked: {0}")]
    RulePanicked(String),
}

impl NoMatch {
    pub fn guard(guard: &'static str, detail: impl Into<String>) -> Self {
        NoMatch::GuardFailed {
            guard,
            detail: detail.into(),
        }
    }

    fn kind(expected: &'static str, found: &SyntaxNode) -> Self {
        NoMatch::KindMismatch {
            expected,
            found: found.kind_name(),
        }
    }
}

/// Match `pattern` against `node`, returning the captured bindings
pub fn match_pattern(
    node: &Node,
    pattern: &Pattern,
    oracle: &TypeOracle,
) -> Result<Bindings, NoMatch> {
    let mut bindings = Bindings::new();
    match_into(node, pattern, &mut bindings, oracle)?;
    Ok(bindings)
}

/// Bind `var` to `node`, or check consistency with an existing binding
fn bind(
    var: &Metavar,
    node: &Node,
    bindings: &mut Bindings,
    oracle: &TypeOracle,
) -> Result<(), NoMatch> {
    match bindings.get(var.as_str()) {
        Some(previous) => {
            if Arc::ptr_eq(previous, node) || oracle.equivalent(previous, node)? {
                Ok(())
            } else {
                Err(NoMatch::InconsistentBinding(var.to_string()))
            }
        }
        None => {
            bindings.insert(var, node.clone());
            Ok(())
        }
    }
}

fn check_capture_kind(
    var: &Metavar,
    kind: CaptureKind,
    node: &Node,
    oracle: &TypeOracle,
) -> Result<(), NoMatch> {
    let inner = SyntaxNode::unparenthesized(node);
    let accepted = match kind {
        CaptureKind::Any => true,
        CaptureKind::Reference => match &inner.kind {
            NodeKind::Identifier { .. } | NodeKind::This => true,
            NodeKind::FieldAccess { target, .. } => {
                matches!(SyntaxNode::unparenthesized(target).kind, NodeKind::This)
            }
            _ => false,
        },
        CaptureKind::Predicate => match &inner.kind {
            NodeKind::Lambda { .. } | NodeKind::MethodRef { .. } => true,
            _ => oracle.family_of(inner)?.contains(FamilySet::PREDICATE),
        },
    };
    if accepted {
        Ok(())
    } else {
        Err(NoMatch::CaptureKindMismatch {
            var: var.to_string(),
            kind,
            found: inner.kind_name(),
        })
    }
}

fn match_all(
    nodes: &[Node],
    patterns: &[Pattern],
    bindings: &mut Bindings,
    oracle: &TypeOracle,
) -> Result<(), NoMatch> {
    if nodes.len() != patterns.len() {
        return Err(NoMatch::ArityMismatch {
            expected: patterns.len(),
            found: nodes.len(),
        });
    }
    for (node, pattern) in nodes.iter().zip(patterns) {
        match_into(node, pattern, bindings, oracle)?;
    }
    Ok(())
}

fn param_reference(param: &LambdaParam) -> Node {
    SyntaxNode::new(NodeKind::Identifier {
        name: param.name.clone(),
        binding: param.binding,
    })
    .into_node()
}

fn match_into(
    node: &Node,
    pattern: &Pattern,
    bindings: &mut Bindings,
    oracle: &TypeOracle,
) -> Result<(), NoMatch> {
    match pattern {
        Pattern::Wildcard => return Ok(()),
        Pattern::Capture { var, kind } => {
            check_capture_kind(var, *kind, node, oracle)?;
            return bind(var, node, bindings, oracle);
        }
        Pattern::Bind { var, inner } => {
            match_into(node, inner, bindings, oracle)?;
            return bind(var, node, bindings, oracle);
        }
        Pattern::AnyOf(alternatives) => {
            let mut last = NoMatch::guard("AnyOf", "no alternatives");
            for alternative in alternatives {
                let mut attempt = bindings.clone();
                match match_into(node, alternative, &mut attempt, oracle) {
                    Ok(()) => {
                        *bindings = attempt;
                        return Ok(());
                    }
                    Err(reason) => last = reason,
                }
            }
            return Err(last);
        }
        _ => {}
    }

    let node = SyntaxNode::unparenthesized(node);
    match (pattern, &node.kind) {
        (Pattern::Int(expected), NodeKind::Int(found)) => literal(expected == found),
        (Pattern::Int(_), _) => Err(NoMatch::kind("int literal", node)),
        (Pattern::Bool(expected), NodeKind::Bool(found)) => literal(expected == found),
        (Pattern::Bool(_), _) => Err(NoMatch::kind("boolean literal", node)),
        (Pattern::Str(expected), NodeKind::Str(found)) => literal(expected == found),
        (Pattern::Str(_), _) => Err(NoMatch::kind("string literal", node)),
        (Pattern::Null, NodeKind::Null) => Ok(()),
        (Pattern::Null, _) => Err(NoMatch::kind("null literal", node)),
        (Pattern::This, NodeKind::This) => Ok(()),
        (Pattern::This, _) => Err(NoMatch::kind("this", node)),

        (Pattern::TypeRef(expected), NodeKind::TypeRef { name, fqn }) => {
            let same = match fqn {
                Some(fqn) => fqn == expected,
                None => name == simple_name(expected),
            };
            if same {
                Ok(())
            } else {
                Err(NoMatch::NameMismatch {
                    expected: expected.clone(),
                    found: fqn.clone().unwrap_or_else(|| name.clone()),
                })
            }
        }
        (Pattern::TypeRef(_), _) => Err(NoMatch::kind("type reference", node)),

        (
            Pattern::FieldAccess { target, name },
            NodeKind::FieldAccess {
                target: found_target,
                name: found_name,
                ..
            },
        ) => {
            same_name(name, found_name)?;
            match_into(found_target, target, bindings, oracle)
        }
        (Pattern::FieldAccess { .. }, _) => Err(NoMatch::kind("field access", node)),

        (
            Pattern::Call {
                receiver,
                name,
                args,
            },
            NodeKind::MethodCall {
                receiver: found_receiver,
                name: found_name,
                args: found_args,
            },
        ) => {
            same_name(name, found_name)?;
            if found_args.len() != args.len() {
                return Err(NoMatch::ArityMismatch {
                    expected: args.len(),
                    found: found_args.len(),
                });
            }
            match (receiver, found_receiver) {
                (Some(receiver), Some(found)) => match_into(found, receiver, bindings, oracle)?,
                (None, None) => {}
                (Some(_), None) => {
                    return Err(NoMatch::KindMismatch {
                        expected: "explicit receiver",
                        found: "implicit receiver",
                    })
                }
                (None, Some(_)) => {
                    return Err(NoMatch::KindMismatch {
                        expected: "implicit receiver",
                        found: "explicit receiver",
                    })
                }
            }
            match_all(found_args, args, bindings, oracle)
        }
        (Pattern::Call { .. }, _) => Err(NoMatch::kind("method call", node)),

        (
            Pattern::Binary { op, left, right },
            NodeKind::Binary {
                op: found_op,
                left: found_left,
                right: found_right,
            },
        ) => {
            if op != found_op {
                return Err(NoMatch::OperatorMismatch);
            }
            match_into(found_left, left, bindings, oracle)?;
            match_into(found_right, right, bindings, oracle)
        }
        (Pattern::Binary { .. }, _) => Err(NoMatch::kind("binary operation", node)),

        (
            Pattern::Not(inner),
            NodeKind::Unary {
                op: UnaryOp::Not,
                operand,
            },
        ) => match_into(SyntaxNode::unparenthesized(operand), inner, bindings, oracle),
        (Pattern::Not(_), _) => Err(NoMatch::kind("logical negation", node)),

        (
            Pattern::Lambda { params, body },
            NodeKind::Lambda {
                params: found_params,
                body: found_body,
            },
        ) => {
            if params.len() != found_params.len() {
                return Err(NoMatch::ArityMismatch {
                    expected: params.len(),
                    found: found_params.len(),
                });
            }
            for (var, param) in params.iter().zip(found_params) {
                bind(var, &param_reference(param), bindings, oracle)?;
            }
            match_into(found_body, body, bindings, oracle)
        }
        (Pattern::Lambda { .. }, _) => Err(NoMatch::kind("lambda", node)),

        (
            Pattern::MethodRef { target, name },
            NodeKind::MethodRef {
                target: found_target,
                name: found_name,
            },
        ) => {
            same_name(name, found_name)?;
            match_into(found_target, target, bindings, oracle)
        }
        (Pattern::MethodRef { .. }, _) => Err(NoMatch::kind("method reference", node)),

        (Pattern::Wildcard | Pattern::Capture { .. } | Pattern::Bind { .. } | Pattern::AnyOf(_), _) => {
            Ok(())
        }
    }
}

fn literal(same: bool) -> Result<(), NoMatch> {
    if same {
        Ok(())
    } else {
        Err(NoMatch::LiteralMismatch)
    }
}

fn same_name(expected: &str, found: &str) -> Result<(), NoMatch> {
    if expected == found {
        Ok(())
    } else {
        Err(NoMatch::NameMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}
