//! Declarative tree shapes with metavariable capture slots.
//!
//! Patterns are built once per rule and reused for every match attempt.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::BinaryOp;

/// Name of a capture slot shared by a rule's pattern, guards and template
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Metavar(pub String);

impl Metavar {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Metavar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl From<&str> for Metavar {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Restriction on what a capture slot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureKind {
    #[default]
    Any,
    /// Identifier, `this`, or `this.field`
    Reference,
    /// Lambda, method reference, or an expression of Predicate type
    Predicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Capture the node; a repeated slot must match an equivalent node
    Capture { var: Metavar, kind: CaptureKind },
    /// Match the inner pattern and also capture the whole node
    Bind { var: Metavar, inner: Box<Pattern> },
    /// Match anything without capturing
    Wildcard,

    Int(i64),
    Bool(bool),
    Str(String),
    Null,
    This,
    /// Type in expression position, by fully-qualified name
    TypeRef(String),

    FieldAccess {
        target: Box<Pattern>,
        name: String,
    },
    Call {
        receiver: Option<Box<Pattern>>,
        name: String,
        args: Vec<Pattern>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Pattern>,
        right: Box<Pattern>,
    },
    /// Logical negation; the operand is matched with parentheses stripped
    Not(Box<Pattern>),
    /// Lambda whose parameters are captured as references to their declarations
    Lambda {
        params: Vec<Metavar>,
        body: Box<Pattern>,
    },
    MethodRef {
        target: Box<Pattern>,
        name: String,
    },
    /// First alternative that matches wins
    AnyOf(Vec<Pattern>),
}

impl Pattern {
    pub fn var(name: &str) -> Self {
        Pattern::Capture {
            var: Metavar::new(name),
            kind: CaptureKind::Any,
        }
    }

    pub fn reference(name: &str) -> Self {
        Pattern::Capture {
            var: Metavar::new(name),
            kind: CaptureKind::Reference,
        }
    }

    pub fn predicate(name: &str) -> Self {
        Pattern::Capture {
            var: Metavar::new(name),
            kind: CaptureKind::Predicate,
        }
    }

    pub fn bind(name: &str, inner: Pattern) -> Self {
        Pattern::Bind {
            var: Metavar::new(name),
            inner: Box::new(inner),
        }
    }

    /// `receiver.name(args)`
    pub fn method(receiver: Pattern, name: &str, args: Vec<Pattern>) -> Self {
        Pattern::Call {
            receiver: Some(Box::new(receiver)),
            name: name.to_string(),
            args,
        }
    }

    /// `Owner.name(args)` where `owner` is fully qualified
    pub fn static_call(owner: &str, name: &str, args: Vec<Pattern>) -> Self {
        Self::method(Pattern::TypeRef(owner.to_string()), name, args)
    }

    pub fn binary(op: BinaryOp, left: Pattern, right: Pattern) -> Self {
        Pattern::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(inner: Pattern) -> Self {
        Pattern::Not(Box::new(inner))
    }

    pub fn lambda(params: &[&str], body: Pattern) -> Self {
        Pattern::Lambda {
            params: params.iter().map(|p| Metavar::new(*p)).collect(),
            body: Box::new(body),
        }
    }

    pub fn method_ref(target: Pattern, name: &str) -> Self {
        Pattern::MethodRef {
            target: Box::new(target),
            name: name.to_string(),
        }
    }

    pub fn any_of(alternatives: Vec<Pattern>) -> Self {
        Pattern::AnyOf(alternatives)
    }

    /// Both operand orders of a comparison, `left op right` then `right op' left`
    pub fn commuted(op: BinaryOp, left: Pattern, right: Pattern) -> Self {
        let flipped = match op {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::Le => BinaryOp::Ge,
            BinaryOp::Ge => BinaryOp::Le,
            other => other,
        };
        Pattern::AnyOf(vec![
            Self::binary(op, left.clone(), right.clone()),
            Self::binary(flipped, right, left),
        ])
    }

    /// Every metavariable this pattern can bind, in first-occurrence order
    pub fn metavars(&self) -> Vec<Metavar> {
        let mut out = Vec::new();
        self.collect_metavars(&mut out);
        out
    }

    fn collect_metavars(&self, out: &mut Vec<Metavar>) {
        let add = |var: &Metavar, out: &mut Vec<Metavar>| {
            if !out.contains(var) {
                out.push(var.clone());
            }
        };
        match self {
            Pattern::Capture { var, .. } => add(var, out),
            Pattern::Bind { var, inner } => {
                add(var, out);
                inner.collect_metavars(out);
            }
            Pattern::Wildcard
            | Pattern::Int(_)
            | Pattern::Bool(_)
            | Pattern::Str(_)
            | Pattern::Null
            | Pattern::This
            | Pattern::TypeRef(_) => {}
            Pattern::FieldAccess { target, .. } | Pattern::MethodRef { target, .. } => {
                target.collect_metavars(out)
            }
            Pattern::Call { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    receiver.collect_metavars(out);
                }
                for arg in args {
                    arg.collect_metavars(out);
                }
            }
            Pattern::Binary { left, right, .. } => {
                left.collect_metavars(out);
                right.collect_metavars(out);
            }
            Pattern::Not(inner) => inner.collect_metavars(out),
            Pattern::Lambda { params, body } => {
                for param in params {
                    add(param, out);
                }
                body.collect_metavars(out);
            }
            Pattern::AnyOf(alternatives) => {
                for alternative in alternatives {
                    alternative.collect_metavars(out);
                }
            }
        }
    }
}
