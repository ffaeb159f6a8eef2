// Persistent syntax tree consumed and produced by the rewrite engine.
// The host parser builds it with resolved types and binding identities;
// rewriting never mutates a node, it builds a new spine sharing every
// untouched subtree through `Arc`.

pub mod build;
pub mod source_gen;
pub use source_gen::ToSource;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Shared handle to an immutable syntax node
pub type Node = Arc<SyntaxNode>;

/// Identity of a declaration (local, parameter, field) as resolved by the host.
/// Two references denote the same variable iff their binding ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingId(pub u32);

/// Byte range in the original source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

/// Lambda parameter with its resolved declaration identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaParam {
    pub name: String,
    pub binding: Option<BindingId>,
}

/// Method parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub declared_type: String,
    pub binding: Option<BindingId>,
}

/// A single import declaration. `path` may end in `.*` for on-demand imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Import {
    pub path: String,
    pub is_static: bool,
}

impl Import {
    pub fn single(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_static: false,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.path.ends_with(".*")
    }

    /// Simple name this import brings into scope, `None` for wildcards
    pub fn simple_name(&self) -> Option<&str> {
        if self.is_wildcard() {
            None
        } else {
            Some(simple_name(&self.path))
        }
    }
}

/// Last segment of a dotted name
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Everything before the last segment of a dotted name
pub fn package_of(qualified: &str) -> &str {
    match qualified.rfind('.') {
        Some(idx) => &qualified[..idx],
        None => "",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    // Literals
    Int(i64),
    Bool(bool),
    Str(String),
    Null,

    // Names and references
    Identifier {
        name: String,
        binding: Option<BindingId>,
    },
    This,
    /// A type used in expression position (static call receiver, `new` target)
    TypeRef {
        name: String,
        fqn: Option<String>,
    },
    FieldAccess {
        target: Node,
        name: String,
        binding: Option<BindingId>,
    },

    // Expressions
    MethodCall {
        receiver: Option<Node>,
        name: String,
        args: Vec<Node>,
    },
    New {
        class: Node,
        args: Vec<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Node,
        right: Node,
    },
    Unary {
        op: UnaryOp,
        operand: Node,
    },
    Conditional {
        condition: Node,
        then_expr: Node,
        else_expr: Node,
    },
    Lambda {
        params: Vec<LambdaParam>,
        body: Node,
    },
    MethodRef {
        target: Node,
        name: String,
    },
    Parens(Node),

    // Statements
    Block(Vec<Node>),
    ExprStmt(Node),
    Return(Option<Node>),
    If {
        condition: Node,
        then_branch: Node,
        else_branch: Option<Node>,
    },
    LocalVar {
        name: String,
        declared_type: String,
        binding: Option<BindingId>,
        init: Option<Node>,
    },

    // Declarations
    Field {
        name: String,
        declared_type: String,
        binding: Option<BindingId>,
        init: Option<Node>,
    },
    Method {
        name: String,
        params: Vec<Param>,
        return_type: String,
        body: Option<Node>,
    },
    Class {
        name: String,
        supertypes: Vec<String>,
        members: Vec<Node>,
    },
    CompilationUnit {
        package: Option<String>,
        imports: Vec<Import>,
        types: Vec<Node>,
    },
}

/// One node of the tree. Type, span and comments are host-supplied side data
/// and do not take part in structural matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub span: Option<Span>,
    #[serde(default)]
    pub comments: Vec<String>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ty: None,
            span: None,
            comments: Vec::new(),
        }
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }

    pub fn into_node(self) -> Node {
        Arc::new(self)
    }

    /// Short, stable name of this node's kind for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Int(_) => "int literal",
            NodeKind::Bool(_) => "boolean literal",
            NodeKind::Str(_) => "string literal",
            NodeKind::Null => "null literal",
            NodeKind::Identifier { .. } => "identifier",
            NodeKind::This => "this",
            NodeKind::TypeRef { .. } => "type reference",
            NodeKind::FieldAccess { .. } => "field access",
            NodeKind::MethodCall { .. } => "method call",
            NodeKind::New { .. } => "instance creation",
            NodeKind::Binary { .. } => "binary operation",
            NodeKind::Unary { .. } => "unary operation",
            NodeKind::Conditional { .. } => "conditional",
            NodeKind::Lambda { .. } => "lambda",
            NodeKind::MethodRef { .. } => "method reference",
            NodeKind::Parens(_) => "parentheses",
            NodeKind::Block(_) => "block",
            NodeKind::ExprStmt(_) => "expression statement",
            NodeKind::Return(_) => "return",
            NodeKind::If { .. } => "if",
            NodeKind::LocalVar { .. } => "local variable",
            NodeKind::Field { .. } => "field",
            NodeKind::Method { .. } => "method",
            NodeKind::Class { .. } => "class",
            NodeKind::CompilationUnit { .. } => "compilation unit",
        }
    }

    /// Strip any number of enclosing parentheses
    pub fn unparenthesized(node: &Node) -> &Node {
        let mut current = node;
        while let NodeKind::Parens(inner) = &current.kind {
            current = inner;
        }
        current
    }

    /// Children in declaration order. Rebuilding with `replace_children`
    /// consumes them in exactly this order.
    pub fn children(&self) -> Vec<Node> {
        let mut out = Vec::new();
        match &self.kind {
            NodeKind::Int(_)
            | NodeKind::Bool(_)
            | NodeKind::Str(_)
            | NodeKind::Null
            | NodeKind::Identifier { .. }
            | NodeKind::This
            | NodeKind::TypeRef { .. } => {}
            NodeKind::FieldAccess { target, .. } => out.push(target.clone()),
            NodeKind::MethodCall { receiver, args, .. } => {
                out.extend(receiver.iter().cloned());
                out.extend(args.iter().cloned());
            }
            NodeKind::New { class, args } => {
                out.push(class.clone());
                out.extend(args.iter().cloned());
            }
            NodeKind::Binary { left, right, .. } => {
                out.push(left.clone());
                out.push(right.clone());
            }
            NodeKind::Unary { operand, .. } => out.push(operand.clone()),
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                out.push(condition.clone());
                out.push(then_expr.clone());
                out.push(else_expr.clone());
            }
            NodeKind::Lambda { body, .. } => out.push(body.clone()),
            NodeKind::MethodRef { target, .. } => out.push(target.clone()),
            NodeKind::Parens(inner) | NodeKind::ExprStmt(inner) => out.push(inner.clone()),
            NodeKind::Block(stmts) => out.extend(stmts.iter().cloned()),
            NodeKind::Return(value) => out.extend(value.iter().cloned()),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(condition.clone());
                out.push(then_branch.clone());
                out.extend(else_branch.iter().cloned());
            }
            NodeKind::LocalVar { init, .. } | NodeKind::Field { init, .. } => {
                out.extend(init.iter().cloned())
            }
            NodeKind::Method { body, .. } => out.extend(body.iter().cloned()),
            NodeKind::Class { members, .. } => out.extend(members.iter().cloned()),
            NodeKind::CompilationUnit { types, .. } => out.extend(types.iter().cloned()),
        }
        out
    }

    /// Copy of this node with its children replaced positionally.
    /// Side data (type, span, comments) is carried over.
    pub fn replace_children(&self, children: Vec<Node>) -> SyntaxNode {
        let mut it = children.into_iter();
        let mut next = |old: &Node| it.next().unwrap_or_else(|| old.clone());

        let kind = match &self.kind {
            NodeKind::FieldAccess {
                target,
                name,
                binding,
            } => NodeKind::FieldAccess {
                target: next(target),
                name: name.clone(),
                binding: *binding,
            },
            NodeKind::MethodCall {
                receiver,
                name,
                args,
            } => NodeKind::MethodCall {
                receiver: receiver.as_ref().map(&mut next),
                name: name.clone(),
                args: args.iter().map(&mut next).collect(),
            },
            NodeKind::New { class, args } => NodeKind::New {
                class: next(class),
                args: args.iter().map(&mut next).collect(),
            },
            NodeKind::Binary { op, left, right } => NodeKind::Binary {
                op: *op,
                left: next(left),
                right: next(right),
            },
            NodeKind::Unary { op, operand } => NodeKind::Unary {
                op: *op,
                operand: next(operand),
            },
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => NodeKind::Conditional {
                condition: next(condition),
                then_expr: next(then_expr),
                else_expr: next(else_expr),
            },
            NodeKind::Lambda { params, body } => NodeKind::Lambda {
                params: params.clone(),
                body: next(body),
            },
            NodeKind::MethodRef { target, name } => NodeKind::MethodRef {
                target: next(target),
                name: name.clone(),
            },
            NodeKind::Parens(inner) => NodeKind::Parens(next(inner)),
            NodeKind::ExprStmt(inner) => NodeKind::ExprStmt(next(inner)),
            NodeKind::Block(stmts) => NodeKind::Block(stmts.iter().map(&mut next).collect()),
            NodeKind::Return(value) => NodeKind::Return(value.as_ref().map(&mut next)),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => NodeKind::If {
                condition: next(condition),
                then_branch: next(then_branch),
                else_branch: else_branch.as_ref().map(&mut next),
            },
            NodeKind::LocalVar {
                name,
                declared_type,
                binding,
                init,
            } => NodeKind::LocalVar {
                name: name.clone(),
                declared_type: declared_type.clone(),
                binding: *binding,
                init: init.as_ref().map(&mut next),
            },
            NodeKind::Field {
                name,
                declared_type,
                binding,
                init,
            } => NodeKind::Field {
                name: name.clone(),
                declared_type: declared_type.clone(),
                binding: *binding,
                init: init.as_ref().map(&mut next),
            },
            NodeKind::Method {
                name,
                params,
                return_type,
                body,
            } => NodeKind::Method {
                name: name.clone(),
                params: params.clone(),
                return_type: return_type.clone(),
                body: body.as_ref().map(&mut next),
            },
            NodeKind::Class {
                name,
                supertypes,
                members,
            } => NodeKind::Class {
                name: name.clone(),
                supertypes: supertypes.clone(),
                members: members.iter().map(&mut next).collect(),
            },
            NodeKind::CompilationUnit {
                package,
                imports,
                types,
            } => NodeKind::CompilationUnit {
                package: package.clone(),
                imports: imports.clone(),
                types: types.iter().map(&mut next).collect(),
            },
            leaf => leaf.clone(),
        };

        SyntaxNode {
            kind,
            ty: self.ty.clone(),
            span: self.span,
            comments: self.comments.clone(),
        }
    }

    /// Pre-order iterator over this subtree
    pub fn descendants(node: &Node) -> Vec<Node> {
        let mut out = Vec::new();
        let mut stack = vec![node.clone()];
        while let Some(current) = stack.pop() {
            let mut children = current.children();
            children.reverse();
            stack.extend(children);
            out.push(current);
        }
        out
    }

    /// Imports of a compilation unit, empty for any other root
    pub fn imports(&self) -> &[Import] {
        match &self.kind {
            NodeKind::CompilationUnit { imports, .. } => imports,
            _ => &[],
        }
    }

    pub fn package(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::CompilationUnit { package, .. } => package.as_deref(),
            _ => None,
        }
    }

    /// Copy of a compilation unit with a new import list; other roots are returned as-is
    pub fn with_imports(&self, new_imports: Vec<Import>) -> SyntaxNode {
        match &self.kind {
            NodeKind::CompilationUnit { package, types, .. } => SyntaxNode {
                kind: NodeKind::CompilationUnit {
                    package: package.clone(),
                    imports: new_imports,
                    types: types.clone(),
                },
                ty: self.ty.clone(),
                span: self.span,
                comments: self.comments.clone(),
            },
            _ => self.clone(),
        }
    }
}
