//! Terse constructors for syntax trees.
//!
//! Rule catalogs and tests describe code fragments with these instead of
//! spelling out `SyntaxNode { kind: ... }` literals.

use super::*;

fn node(kind: NodeKind) -> Node {
    SyntaxNode::new(kind).into_node()
}

/// Copy of `node` with its resolved static type set
pub fn typed(node: Node, ty: &str) -> Node {
    let mut copy = (*node).clone();
    copy.ty = Some(ty.to_string());
    Arc::new(copy)
}

pub fn int(value: i64) -> Node {
    SyntaxNode::new(NodeKind::Int(value)).with_type("int").into_node()
}

pub fn bool_lit(value: bool) -> Node {
    SyntaxNode::new(NodeKind::Bool(value))
        .with_type("boolean")
        .into_node()
}

pub fn str_lit(value: &str) -> Node {
    SyntaxNode::new(NodeKind::Str(value.to_string()))
        .with_type("java.lang.String")
        .into_node()
}

pub fn null() -> Node {
    node(NodeKind::Null)
}

/// Identifier resolved to declaration `binding`
pub fn ident(name: &str, binding: u32) -> Node {
    node(NodeKind::Identifier {
        name: name.to_string(),
        binding: Some(BindingId(binding)),
    })
}

/// Identifier the host could not resolve
pub fn unresolved(name: &str) -> Node {
    node(NodeKind::Identifier {
        name: name.to_string(),
        binding: None,
    })
}

pub fn this() -> Node {
    node(NodeKind::This)
}

/// Type in expression position, e.g. the receiver of a static call
pub fn type_ref(fqn: &str) -> Node {
    node(NodeKind::TypeRef {
        name: simple_name(fqn).to_string(),
        fqn: Some(fqn.to_string()),
    })
}

pub fn field(target: Node, name: &str, binding: u32) -> Node {
    node(NodeKind::FieldAccess {
        target,
        name: name.to_string(),
        binding: Some(BindingId(binding)),
    })
}

/// `this.name`
pub fn this_field(name: &str, binding: u32) -> Node {
    field(this(), name, binding)
}

pub fn call(receiver: Option<Node>, name: &str, args: Vec<Node>) -> Node {
    node(NodeKind::MethodCall {
        receiver,
        name: name.to_string(),
        args,
    })
}

/// `receiver.name(args)`
pub fn method(receiver: Node, name: &str, args: Vec<Node>) -> Node {
    call(Some(receiver), name, args)
}

/// `Owner.name(args)` where `owner` is fully qualified
pub fn static_call(owner: &str, name: &str, args: Vec<Node>) -> Node {
    call(Some(type_ref(owner)), name, args)
}

pub fn new_instance(class: &str, args: Vec<Node>) -> Node {
    node(NodeKind::New {
        class: type_ref(class),
        args,
    })
}

pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
    node(NodeKind::Binary { op, left, right })
}

pub fn not(operand: Node) -> Node {
    node(NodeKind::Unary {
        op: UnaryOp::Not,
        operand,
    })
}

pub fn parens(inner: Node) -> Node {
    node(NodeKind::Parens(inner))
}

pub fn conditional(condition: Node, then_expr: Node, else_expr: Node) -> Node {
    node(NodeKind::Conditional {
        condition,
        then_expr,
        else_expr,
    })
}

/// Lambda whose parameters are given as `(name, binding)` pairs
pub fn lambda(params: &[(&str, u32)], body: Node) -> Node {
    node(NodeKind::Lambda {
        params: params
            .iter()
            .map(|(name, binding)| LambdaParam {
                name: name.to_string(),
                binding: Some(BindingId(*binding)),
            })
            .collect(),
        body,
    })
}

pub fn method_ref(target: Node, name: &str) -> Node {
    node(NodeKind::MethodRef {
        target,
        name: name.to_string(),
    })
}

pub fn block(stmts: Vec<Node>) -> Node {
    node(NodeKind::Block(stmts))
}

pub fn expr_stmt(expr: Node) -> Node {
    node(NodeKind::ExprStmt(expr))
}

pub fn ret(value: Node) -> Node {
    node(NodeKind::Return(Some(value)))
}

pub fn if_stmt(condition: Node, then_branch: Node, else_branch: Option<Node>) -> Node {
    node(NodeKind::If {
        condition,
        then_branch,
        else_branch,
    })
}

pub fn local(name: &str, declared_type: &str, binding: u32, init: Node) -> Node {
    node(NodeKind::LocalVar {
        name: name.to_string(),
        declared_type: declared_type.to_string(),
        binding: Some(BindingId(binding)),
        init: Some(init),
    })
}

pub fn field_decl(name: &str, declared_type: &str, binding: u32, init: Option<Node>) -> Node {
    node(NodeKind::Field {
        name: name.to_string(),
        declared_type: declared_type.to_string(),
        binding: Some(BindingId(binding)),
        init,
    })
}

pub fn param(name: &str, declared_type: &str, binding: u32) -> Param {
    Param {
        name: name.to_string(),
        declared_type: declared_type.to_string(),
        binding: Some(BindingId(binding)),
    }
}

pub fn method_decl(name: &str, params: Vec<Param>, return_type: &str, body: Vec<Node>) -> Node {
    node(NodeKind::Method {
        name: name.to_string(),
        params,
        return_type: return_type.to_string(),
        body: Some(block(body)),
    })
}

pub fn class(name: &str, supertypes: &[&str], members: Vec<Node>) -> Node {
    node(NodeKind::Class {
        name: name.to_string(),
        supertypes: supertypes.iter().map(|s| s.to_string()).collect(),
        members,
    })
}

pub fn unit(package: Option<&str>, imports: &[&str], types: Vec<Node>) -> Node {
    node(NodeKind::CompilationUnit {
        package: package.map(str::to_string),
        imports: imports.iter().map(|path| Import::single(*path)).collect(),
        types,
    })
}
