/*!
# Guards

Side conditions evaluated, in order, after a structural match succeeds.
The first failing guard rejects the match. Guards that need type
information fail with `TypeResolutionUnavailable` when the host could not
resolve it, which the engine treats as a skipped rule.
*/

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::{BindingId, Node, NodeKind, SyntaxNode, UnaryOp};
use crate::oracle::{FamilySet, OracleError};

use super::matcher::{Bindings, NoMatch};
use super::pattern::Metavar;
use super::RuleContext;

/// Constant a bound node can be compared against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Guard {
    /// Static type of the bound node is in at least one of `families`
    InFamily { var: Metavar, families: FamilySet },
    /// Static type of the bound node is in none of `families`
    NotInFamily { var: Metavar, families: FamilySet },
    LiteralEquals { var: Metavar, value: Literal },
    /// Bound node is (`negated`) or is not a logical negation. When negated,
    /// the negated operand is bound to `unwrap_into`.
    Polarity {
        var: Metavar,
        negated: bool,
        unwrap_into: Option<Metavar>,
    },
    /// The matched node is not itself the operand of a logical negation.
    /// Keeps a positive rule variant off the inside of its negated sibling.
    NotNegated,
    SameBinding(Metavar, Metavar),
    Equivalent(Metavar, Metavar),
    /// Walking receivers down from `var` passes exactly through `calls`
    /// (outermost first) and then reaches the node bound to `root`
    LinearChain {
        var: Metavar,
        root: Metavar,
        calls: Vec<String>,
    },
    /// Bound node is a call (or `new`) with exactly `args` arguments
    Arity { var: Metavar, args: usize },
    /// Bound subtree never refers to the declaration bound to `binding_of`
    NotReferencing { var: Metavar, binding_of: Metavar },
}

impl Guard {
    pub fn in_family(var: &str, families: FamilySet) -> Self {
        Guard::InFamily {
            var: Metavar::new(var),
            families,
        }
    }

    pub fn not_in_family(var: &str, families: FamilySet) -> Self {
        Guard::NotInFamily {
            var: Metavar::new(var),
            families,
        }
    }

    pub fn literal(var: &str, value: Literal) -> Self {
        Guard::LiteralEquals {
            var: Metavar::new(var),
            value,
        }
    }

    pub fn negated(var: &str, unwrap_into: &str) -> Self {
        Guard::Polarity {
            var: Metavar::new(var),
            negated: true,
            unwrap_into: Some(Metavar::new(unwrap_into)),
        }
    }

    pub fn not_negated(var: &str) -> Self {
        Guard::Polarity {
            var: Metavar::new(var),
            negated: false,
            unwrap_into: None,
        }
    }

    pub fn linear_chain(var: &str, root: &str, calls: &[&str]) -> Self {
        Guard::LinearChain {
            var: Metavar::new(var),
            root: Metavar::new(root),
            calls: calls.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn not_referencing(var: &str, binding_of: &str) -> Self {
        Guard::NotReferencing {
            var: Metavar::new(var),
            binding_of: Metavar::new(binding_of),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Guard::InFamily { .. } => "InFamily",
            Guard::NotInFamily { .. } => "NotInFamily",
            Guard::LiteralEquals { .. } => "LiteralEquals",
            Guard::Polarity { .. } => "Polarity",
            Guard::NotNegated => "NotNegated",
            Guard::SameBinding(..) => "SameBinding",
            Guard::Equivalent(..) => "Equivalent",
            Guard::LinearChain { .. } => "LinearChain",
            Guard::Arity { .. } => "Arity",
            Guard::NotReferencing { .. } => "NotReferencing",
        }
    }

    /// Check this guard; may extend `bindings` (polarity unwrapping)
    pub fn evaluate(&self, bindings: &mut Bindings, ctx: &RuleContext<'_>) -> Result<(), NoMatch> {
        match self {
            Guard::InFamily { var, families } => {
                let found = ctx.oracle.family_of(bindings.require(var)?)?;
                check(
                    found.intersects(*families),
                    self,
                    || format!("{var} is {found:?}, wanted {families:?}"),
                )
            }
            Guard::NotInFamily { var, families } => {
                let found = ctx.oracle.family_of(bindings.require(var)?)?;
                check(
                    !found.intersects(*families),
                    self,
                    || format!("{var} is {found:?}, excluded {families:?}"),
                )
            }
            Guard::LiteralEquals { var, value } => {
                let node = SyntaxNode::unparenthesized(bindings.require(var)?);
                let same = matches!(
                    (&node.kind, value),
                    (NodeKind::Int(a), Literal::Int(b)) if a == b
                ) || matches!(
                    (&node.kind, value),
                    (NodeKind::Bool(a), Literal::Bool(b)) if a == b
                ) || matches!(
                    (&node.kind, value),
                    (NodeKind::Str(a), Literal::Str(b)) if a == b
                ) || matches!((&node.kind, value), (NodeKind::Null, Literal::Null));
                check(same, self, || format!("{var} is not {value:?}"))
            }
            Guard::Polarity {
                var,
                negated,
                unwrap_into,
            } => {
                let operand = match &SyntaxNode::unparenthesized(bindings.require(var)?).kind {
                    NodeKind::Unary {
                        op: UnaryOp::Not,
                        operand,
                    } => Some(SyntaxNode::unparenthesized(operand).clone()),
                    _ => None,
                };
                match (operand, *negated) {
                    (Some(operand), true) => {
                        if let Some(target) = unwrap_into {
                            bindings.insert(target, operand);
                        }
                        Ok(())
                    }
                    (Some(_), false) => {
                        Err(NoMatch::guard(self.name(), format!("{var} is negated")))
                    }
                    (None, true) => Err(NoMatch::guard(self.name(), format!("{var} is not negated"))),
                    (None, false) => Ok(()),
                }
            }
            Guard::NotNegated => {
                let negated = ctx.cursor.parent().is_some_and(|parent| {
                    matches!(parent.kind, NodeKind::Unary { op: UnaryOp::Not, .. })
                });
                check(!negated, self, || "operand of a negation".to_string())
            }
            Guard::SameBinding(a, b) => {
                let same = ctx
                    .oracle
                    .same_binding(bindings.require(a)?, bindings.require(b)?)?;
                check(same, self, || format!("{a} and {b} differ"))
            }
            Guard::Equivalent(a, b) => {
                let same = ctx
                    .oracle
                    .equivalent(bindings.require(a)?, bindings.require(b)?)?;
                check(same, self, || format!("{a} and {b} are not equivalent"))
            }
            Guard::LinearChain { var, root, calls } => {
                let root_node = bindings.require(root)?;
                let mut current = SyntaxNode::unparenthesized(bindings.require(var)?);
                for expected in calls {
                    match &current.kind {
                        NodeKind::MethodCall {
                            receiver: Some(receiver),
                            name,
                            ..
                        } if name == expected => {
                            current = SyntaxNode::unparenthesized(receiver);
                        }
                        _ => {
                            return Err(NoMatch::guard(
                                self.name(),
                                format!("expected .{expected}() in the chain at {var}"),
                            ))
                        }
                    }
                }
                let reached = Arc::ptr_eq(current, SyntaxNode::unparenthesized(root_node));
                check(reached, self, || {
                    format!("{var} has intermediate calls before {root}")
                })
            }
            Guard::Arity { var, args } => {
                let node = SyntaxNode::unparenthesized(bindings.require(var)?);
                let found = match &node.kind {
                    NodeKind::MethodCall { args, .. } | NodeKind::New { args, .. } => args.len(),
                    _ => {
                        return Err(NoMatch::guard(
                            self.name(),
                            format!("{var} is a {}", node.kind_name()),
                        ))
                    }
                };
                check(found == *args, self, || {
                    format!("{var} has {found} arguments, wanted {args}")
                })
            }
            Guard::NotReferencing { var, binding_of } => {
                let binding = reference_binding(bindings.require(binding_of)?)?;
                let referenced = SyntaxNode::descendants(bindings.require(var)?)
                    .iter()
                    .any(|node| refers_to(node, binding));
                check(!referenced, self, || format!("{var} refers to {binding_of}"))
            }
        }
    }
}

fn check(ok: bool, guard: &Guard, detail: impl FnOnce() -> String) -> Result<(), NoMatch> {
    if ok {
        Ok(())
    } else {
        Err(NoMatch::guard(guard.name(), detail()))
    }
}

fn reference_binding(node: &Node) -> Result<BindingId, NoMatch> {
    let node = SyntaxNode::unparenthesized(node);
    match &node.kind {
        NodeKind::Identifier {
            binding: Some(id), ..
        }
        | NodeKind::FieldAccess {
            binding: Some(id), ..
        } => Ok(*id),
        NodeKind::Identifier { .. } | NodeKind::FieldAccess { .. } => {
            Err(NoMatch::TypeResolutionUnavailable(OracleError::Unresolved {
                what: "binding",
                node: node.kind_name().to_string(),
            }))
        }
        _ => Err(NoMatch::guard(
            "NotReferencing",
            format!("{} is not a reference", node.kind_name()),
        )),
    }
}

fn refers_to(node: &Node, binding: BindingId) -> bool {
    match &node.kind {
        NodeKind::Identifier {
            binding: Some(id), ..
        }
        | NodeKind::FieldAccess {
            binding: Some(id), ..
        } => *id == binding,
        NodeKind::Lambda { params, .. } => params.iter().any(|p| p.binding == Some(binding)),
        _ => false,
    }
}
