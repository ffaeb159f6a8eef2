//! Replacement shapes instantiated from a successful match.
//!
//! A `Var` slot is replaced by the captured node itself (same `Arc`), so
//! everything inside a captured subtree, comments included, survives the
//! rewrite untouched. Only the spine the template spells out is new.

use serde::{Deserialize, Serialize};

use crate::ast::{
    simple_name, BinaryOp, LambdaParam, Node, NodeKind, SyntaxNode, UnaryOp,
};

use super::matcher::{Bindings, NoMatch};
use super::pattern::Metavar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Template {
    Var(Metavar),
    Int(i64),
    Bool(bool),
    Null,
    This,
    /// Type in expression position by fully-qualified name; instantiating it
    /// makes the type a candidate for import reconciliation
    TypeRef(String),
    Call {
        receiver: Option<Box<Template>>,
        name: String,
        args: Vec<Template>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Template>,
        right: Box<Template>,
    },
    Not(Box<Template>),
    Lambda {
        params: Vec<Metavar>,
        body: Box<Template>,
    },
    MethodRef {
        target: Box<Template>,
        name: String,
    },
    Parens(Box<Template>),
}

impl Template {
    pub fn var(name: &str) -> Self {
        Template::Var(Metavar::new(name))
    }

    pub fn method(receiver: Template, name: &str, args: Vec<Template>) -> Self {
        Template::Call {
            receiver: Some(Box::new(receiver)),
            name: name.to_string(),
            args,
        }
    }

    pub fn static_call(owner: &str, name: &str, args: Vec<Template>) -> Self {
        Self::method(Template::TypeRef(owner.to_string()), name, args)
    }

    pub fn not(inner: Template) -> Self {
        Template::Not(Box::new(inner))
    }

    pub fn lambda(params: &[&str], body: Template) -> Self {
        Template::Lambda {
            params: params.iter().map(|p| Metavar::new(*p)).collect(),
            body: Box::new(body),
        }
    }

    /// Fully-qualified names of every type this template spells out
    pub fn required_imports(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_type_refs(&mut out);
        out
    }

    fn collect_type_refs(&self, out: &mut Vec<String>) {
        match self {
            Template::TypeRef(fqn) => {
                if !out.contains(fqn) {
                    out.push(fqn.clone());
                }
            }
            Template::Call { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    receiver.collect_type_refs(out);
                }
                for arg in args {
                    arg.collect_type_refs(out);
                }
            }
            Template::Binary { left, right, .. } => {
                left.collect_type_refs(out);
                right.collect_type_refs(out);
            }
            Template::Not(inner) | Template::Parens(inner) => inner.collect_type_refs(out),
            Template::Lambda { body, .. } => body.collect_type_refs(out),
            Template::MethodRef { target, .. } => target.collect_type_refs(out),
            Template::Var(_)
            | Template::Int(_)
            | Template::Bool(_)
            | Template::Null
            | Template::This => {}
        }
    }
}

fn build(kind: NodeKind) -> Node {
    SyntaxNode::new(kind).into_node()
}

/// Substitute every slot of `template` with its bound node
pub fn instantiate(template: &Template, bindings: &Bindings) -> Result<Node, NoMatch> {
    let node = match template {
        Template::Var(var) => return Ok(bindings.require(var)?.clone()),
        Template::Int(v) => SyntaxNode::new(NodeKind::Int(*v)).with_type("int").into_node(),
        Template::Bool(v) => SyntaxNode::new(NodeKind::Bool(*v))
            .with_type("boolean")
            .into_node(),
        Template::Null => build(NodeKind::Null),
        Template::This => build(NodeKind::This),
        Template::TypeRef(fqn) => build(NodeKind::TypeRef {
            name: simple_name(fqn).to_string(),
            fqn: Some(fqn.clone()),
        }),
        Template::Call {
            receiver,
            name,
            args,
        } => build(NodeKind::MethodCall {
            receiver: receiver
                .as_ref()
                .map(|r| instantiate(r, bindings))
                .transpose()?,
            name: name.clone(),
            args: args
                .iter()
                .map(|a| instantiate(a, bindings))
                .collect::<Result<_, _>>()?,
        }),
        Template::Binary { op, left, right } => build(NodeKind::Binary {
            op: *op,
            left: instantiate(left, bindings)?,
            right: instantiate(right, bindings)?,
        }),
        Template::Not(inner) => SyntaxNode::new(NodeKind::Unary {
            op: UnaryOp::Not,
            operand: instantiate(inner, bindings)?,
        })
        .with_type("boolean")
        .into_node(),
        Template::Lambda { params, body } => {
            let params = params
                .iter()
                .map(|var| lambda_param(var, bindings))
                .collect::<Result<_, _>>()?;
            build(NodeKind::Lambda {
                params,
                body: instantiate(body, bindings)?,
            })
        }
        Template::MethodRef { target, name } => build(NodeKind::MethodRef {
            target: instantiate(target, bindings)?,
            name: name.clone(),
        }),
        Template::Parens(inner) => build(NodeKind::Parens(instantiate(inner, bindings)?)),
    };
    Ok(node)
}

/// Lambda parameters are bound as identifier nodes naming their declaration
fn lambda_param(var: &Metavar, bindings: &Bindings) -> Result<LambdaParam, NoMatch> {
    let node = bindings.require(var)?;
    match &node.kind {
        NodeKind::Identifier { name, binding } => Ok(LambdaParam {
            name: name.clone(),
            binding: *binding,
        }),
        _ => Err(NoMatch::guard(
            "Template",
            format!("{var} is a {}, not a parameter", node.kind_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ast::build::*;
    use crate::ast::ToSource;
    use crate::oracle::TypeOracle;
    use crate::rewrite::matcher::match_pattern;
    use crate::rewrite::pattern::Pattern;

    #[test]
    fn test_instantiate_reuses_captured_nodes() {
        let oracle = TypeOracle::standard();
        let receiver = SyntaxNode::new(NodeKind::Identifier {
            name: "items".to_string(),
            binding: None,
        })
        .with_comment("the list")
        .into_node();
        let predicate = ident("p", 2);
        let node = not(method(receiver.clone(), "noneSatisfy", vec![predicate.clone()]));

        let pattern = Pattern::not(Pattern::method(
            Pattern::var("x"),
            "noneSatisfy",
            vec![Pattern::var("p")],
        ));
        let template = Template::method(Template::var("x"), "anySatisfy", vec![Template::var("p")]);

        let bindings = match_pattern(&node, &pattern, &oracle).unwrap();
        let out = instantiate(&template, &bindings).unwrap();

        assert_eq!(out.to_source(), "/* the list */ items.anySatisfy(p)");
        let children = out.children();
        assert!(Arc::ptr_eq(&children[0], &receiver));
        assert!(Arc::ptr_eq(&children[1], &predicate));
    }

    #[test]
    fn test_lambda_template_keeps_parameter_identity() {
        let oracle = TypeOracle::standard();
        let node = method(
            ident("xs", 1),
            "allSatisfy",
            vec![lambda(&[("e", 5)], not(method(ident("e", 5), "isEmpty", vec![])))],
        );
        let pattern = Pattern::method(
            Pattern::var("xs"),
            "allSatisfy",
            vec![Pattern::lambda(&["e"], Pattern::not(Pattern::var("body")))],
        );
        let template = Template::method(
            Template::var("xs"),
            "noneSatisfy",
            vec![Template::lambda(&["e"], Template::var("body"))],
        );

        let bindings = match_pattern(&node, &pattern, &oracle).unwrap();
        let out = instantiate(&template, &bindings).unwrap();
        assert_eq!(out.to_source(), "xs.noneSatisfy(e -> e.isEmpty())");
        assert!(oracle.equivalent(
            &out,
            &method(ident("xs", 1), "noneSatisfy", vec![lambda(&[("e", 5)], method(ident("e", 5), "isEmpty", vec![]))])
        ).unwrap());
    }

    #[test]
    fn test_unbound_slot_fails_instantiation() {
        let template = Template::method(Template::var("missing"), "isEmpty", vec![]);
        assert_eq!(
            instantiate(&template, &Bindings::new()),
            Err(NoMatch::Unbound("$missing".to_string()))
        );
    }

    #[test]
    fn test_required_imports_lists_type_refs_once() {
        let iterate = "org.eclipse.collections.impl.utility.Iterate";
        let template = Template::Binary {
            op: BinaryOp::Or,
            left: Box::new(Template::static_call(iterate, "isEmpty", vec![Template::var("a")])),
            right: Box::new(Template::static_call(iterate, "isEmpty", vec![Template::var("b")])),
        };
        assert_eq!(template.required_imports(), vec![iterate.to_string()]);
        assert!(Template::var("x").required_imports().is_empty());
    }
}
