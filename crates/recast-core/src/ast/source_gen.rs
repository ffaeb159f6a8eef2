// Source rendering from the syntax tree.
// This is a diagnostic renderer, not the host printer: it produces compact
// Java-like text so before/after pairs can be stated literally in tests and
// in log output. Layout fidelity is the host printer's job.

use super::*;

/// Trait for types that can generate their source code representation
pub trait ToSource {
    fn to_source(&self) -> String;
}

impl ToSource for SyntaxNode {
    fn to_source(&self) -> String {
        let mut out = String::new();
        render(self, 0, &mut out);
        out
    }
}

impl ToSource for Node {
    fn to_source(&self) -> String {
        self.as_ref().to_source()
    }
}

impl ToSource for Import {
    fn to_source(&self) -> String {
        if self.is_static {
            format!("import static {};", self.path)
        } else {
            format!("import {};", self.path)
        }
    }
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn join(nodes: &[Node], sep: &str) -> String {
    nodes
        .iter()
        .map(|n| n.to_source())
        .collect::<Vec<_>>()
        .join(sep)
}

fn render(node: &SyntaxNode, depth: usize, out: &mut String) {
    for comment in &node.comments {
        out.push_str(&format!("/* {comment} */ "));
    }

    match &node.kind {
        NodeKind::Int(v) => out.push_str(&v.to_string()),
        NodeKind::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        NodeKind::Str(s) => out.push_str(&format!("{s:?}")),
        NodeKind::Null => out.push_str("null"),
        NodeKind::Identifier { name, .. } => out.push_str(name),
        NodeKind::This => out.push_str("this"),
        NodeKind::TypeRef { name, .. } => out.push_str(name),
        NodeKind::FieldAccess { target, name, .. } => {
            out.push_str(&format!("{}.{}", target.to_source(), name))
        }
        NodeKind::MethodCall {
            receiver,
            name,
            args,
        } => {
            if let Some(receiver) = receiver {
                out.push_str(&receiver.to_source());
                out.push('.');
            }
            out.push_str(&format!("{}({})", name, join(args, ", ")));
        }
        NodeKind::New { class, args } => {
            out.push_str(&format!("new {}({})", class.to_source(), join(args, ", ")))
        }
        NodeKind::Binary { op, left, right } => out.push_str(&format!(
            "{} {} {}",
            left.to_source(),
            op.symbol(),
            right.to_source()
        )),
        NodeKind::Unary { op, operand } => {
            let inner = operand.to_source();
            match operand.kind {
                NodeKind::Binary { .. } | NodeKind::Conditional { .. } => {
                    out.push_str(&format!("{}({})", op.symbol(), inner))
                }
                _ => out.push_str(&format!("{}{}", op.symbol(), inner)),
            }
        }
        NodeKind::Conditional {
            condition,
            then_expr,
            else_expr,
        } => out.push_str(&format!(
            "{} ? {} : {}",
            condition.to_source(),
            then_expr.to_source(),
            else_expr.to_source()
        )),
        NodeKind::Lambda { params, body } => {
            let names = params
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>();
            if names.len() == 1 {
                out.push_str(names[0]);
            } else {
                out.push_str(&format!("({})", names.join(", ")));
            }
            out.push_str(" -> ");
            render(body, depth, out);
        }
        NodeKind::MethodRef { target, name } => {
            out.push_str(&format!("{}::{}", target.to_source(), name))
        }
        NodeKind::Parens(inner) => out.push_str(&format!("({})", inner.to_source())),
        NodeKind::Block(stmts) => {
            out.push_str("{\n");
            for stmt in stmts {
                indent(depth + 1, out);
                render(stmt, depth + 1, out);
                out.push('\n');
            }
            indent(depth, out);
            out.push('}');
        }
        NodeKind::ExprStmt(expr) => out.push_str(&format!("{};", expr.to_source())),
        NodeKind::Return(value) => match value {
            Some(value) => out.push_str(&format!("return {};", value.to_source())),
            None => out.push_str("return;"),
        },
        NodeKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            out.push_str(&format!("if ({}) ", condition.to_source()));
            render(then_branch, depth, out);
            if let Some(else_branch) = else_branch {
                out.push_str(" else ");
                render(else_branch, depth, out);
            }
        }
        NodeKind::LocalVar {
            name,
            declared_type,
            init,
            ..
        }
        | NodeKind::Field {
            name,
            declared_type,
            init,
            ..
        } => match init {
            Some(init) => out.push_str(&format!("{declared_type} {name} = {};", init.to_source())),
            None => out.push_str(&format!("{declared_type} {name};")),
        },
        NodeKind::Method {
            name,
            params,
            return_type,
            body,
        } => {
            let params = params
                .iter()
                .map(|p| format!("{} {}", p.declared_type, p.name))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("{return_type} {name}({params})"));
            match body {
                Some(body) => {
                    out.push(' ');
                    render(body, depth, out);
                }
                None => out.push(';'),
            }
        }
        NodeKind::Class {
            name,
            supertypes,
            members,
        } => {
            out.push_str(&format!("class {name}"));
            if !supertypes.is_empty() {
                let names = supertypes
                    .iter()
                    .map(|s| simple_name(s))
                    .collect::<Vec<_>>();
                out.push_str(&format!(" implements {}", names.join(", ")));
            }
            out.push_str(" {\n");
            for member in members {
                indent(depth + 1, out);
                render(member, depth + 1, out);
                out.push('\n');
            }
            indent(depth, out);
            out.push('}');
        }
        NodeKind::CompilationUnit {
            package,
            imports,
            types,
        } => {
            if let Some(package) = package {
                out.push_str(&format!("package {package};\n\n"));
            }
            for import in imports {
                out.push_str(&import.to_source());
                out.push('\n');
            }
            if !imports.is_empty() {
                out.push('\n');
            }
            for ty in types {
                render(ty, depth, out);
                out.push('\n');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::build::*;
    use super::*;

    #[test]
    fn test_expression_rendering() {
        let expr = not(method(ident("list", 1), "noneSatisfy", vec![method_ref(ident("target", 2), "equals")]));
        assert_eq!(expr.to_source(), "!list.noneSatisfy(target::equals)");

        let cmp = binary(BinaryOp::Eq, int(0), method(this_field("items", 3), "size", vec![]));
        assert_eq!(cmp.to_source(), "0 == this.items.size()");
    }

    #[test]
    fn test_lambda_and_static_call_rendering() {
        let expr = static_call(
            "org.eclipse.collections.impl.utility.Iterate",
            "isEmpty",
            vec![ident("c", 1)],
        );
        assert_eq!(expr.to_source(), "Iterate.isEmpty(c)");

        let pred = lambda(&[("s", 4)], method(ident("s", 4), "isEmpty", vec![]));
        assert_eq!(pred.to_source(), "s -> s.isEmpty()");
    }

    #[test]
    fn test_negated_binary_gets_parentheses() {
        let expr = not(binary(BinaryOp::Gt, ident("a", 1), int(0)));
        assert_eq!(expr.to_source(), "!(a > 0)");
    }

    #[test]
    fn test_comments_are_rendered_as_prefix() {
        let expr = SyntaxNode::new(NodeKind::Identifier {
            name: "x".to_string(),
            binding: None,
        })
        .with_comment("note");
        assert_eq!(expr.to_source(), "/* note */ x");
    }

    #[test]
    fn test_method_rendering() {
        let decl = method_decl(
            "noneSatisfy",
            vec![param("predicate", "Predicate<? super T>", 1)],
            "boolean",
            vec![ret(not(method(this(), "anySatisfy", vec![ident("predicate", 1)])))],
        );
        assert_eq!(
            decl.to_source(),
            "boolean noneSatisfy(Predicate<? super T> predicate) {\n    return !this.anySatisfy(predicate);\n}"
        );
    }
}
