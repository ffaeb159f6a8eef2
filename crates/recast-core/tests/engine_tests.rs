/*!
# Rewrite Engine Integration Tests

Whole-unit runs of the traversal driver: fixpoint behavior, recursion
protection, import reconciliation and failure isolation.
*/

use std::io::Write;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use recast_core::ast::build::*;
use recast_core::ast::{BinaryOp, Node, NodeKind, SyntaxNode, ToSource};
use recast_core::config::{EngineConfig, TieBreak};
use recast_core::oracle::{OracleConfig, TypeHierarchy, TypeOracle};
use recast_core::rewrite::ec_rules::{self, COLLECTORS, ITERATE};
use recast_core::rewrite::{
    run_passes, Diagnostic, NoMatch, Pattern, RewriteEngine, RewriteOutcome, RewriteRule, Rule,
    RuleContext, RuleSet, Template,
};

const RICH: &str = "org.eclipse.collections.api.RichIterable";
const LIST: &str = "org.eclipse.collections.api.list.MutableList<String>";

fn in_method(imports: &[&str], expr: Node) -> Node {
    unit(
        Some("com.example"),
        imports,
        vec![class(
            "Service",
            &[],
            vec![method_decl("check", vec![], "boolean", vec![ret(expr)])],
        )],
    )
}

/// Source of the first returned expression in the tree
fn returned(outcome: &RewriteOutcome) -> String {
    SyntaxNode::descendants(&outcome.tree)
        .iter()
        .find_map(|node| match &node.kind {
            NodeKind::Return(Some(value)) => Some(value.to_source()),
            _ => None,
        })
        .unwrap_or_default()
}

fn xs() -> Node {
    typed(ident("xs", 1), LIST)
}

/// Standard hierarchy plus one project class
fn oracle_with(class: &str, supertypes: &[&str]) -> TypeOracle {
    let hierarchy = TypeHierarchy::standard().with(class, supertypes);
    TypeOracle::new(hierarchy, &OracleConfig::default())
}

#[test]
fn test_size_comparison_becomes_is_empty() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let input = in_method(&[], binary(BinaryOp::Eq, method(xs(), "size", vec![]), int(0)));

    let outcome = run_passes(input, &oracle, &ec_rules::catalog(), 10);
    assert_eq!(returned(&outcome), "xs.isEmpty()");
    assert_eq!(outcome.applied, 1);
    assert!(outcome.converged);
    Ok(())
}

#[test]
fn test_negation_is_polarity_sensitive() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let rules = ec_rules::catalog();

    let negated = in_method(&[], not(method(xs(), "noneSatisfy", vec![ident("p", 2)])));
    assert_eq!(returned(&run_passes(negated, &oracle, &rules, 10)), "xs.anySatisfy(p)");

    let plain = in_method(&[], method(xs(), "noneSatisfy", vec![ident("p", 2)]));
    let outcome = run_passes(plain.clone(), &oracle, &rules, 10);
    assert!(Arc::ptr_eq(&outcome.tree, &plain));
    assert_eq!(outcome.applied, 0);
    Ok(())
}

#[test]
fn test_intervening_call_blocks_select_rewrite() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let rules = ec_rules::catalog();
    let p = ident("p", 2);

    let direct = in_method(&[], method(method(xs(), "select", vec![p.clone()]), "isEmpty", vec![]));
    assert_eq!(returned(&run_passes(direct, &oracle, &rules, 10)), "xs.noneSatisfy(p)");

    let mapped = in_method(
        &[],
        method(
            method(method(xs(), "select", vec![p]), "collect", vec![ident("f", 3)]),
            "isEmpty",
            vec![],
        ),
    );
    let outcome = run_passes(mapped.clone(), &oracle, &rules, 10);
    assert!(Arc::ptr_eq(&outcome.tree, &mapped));
    Ok(())
}

#[test]
fn test_mutually_recursive_defaults_are_left_alone() -> anyhow::Result<()> {
    let oracle = oracle_with("com.example.Circular", &[RICH]);
    let this_ref = || typed(this(), "com.example.Circular");
    let predicate = "Predicate<? super T>";

    let circular = unit(
        Some("com.example"),
        &[],
        vec![class(
            "Circular",
            &[RICH],
            vec![
                method_decl(
                    "noneSatisfy",
                    vec![param("predicate", predicate, 1)],
                    "boolean",
                    vec![ret(not(method(this_ref(), "anySatisfy", vec![ident("predicate", 1)])))],
                ),
                method_decl(
                    "anySatisfy",
                    vec![param("predicate", predicate, 2)],
                    "boolean",
                    vec![ret(not(method(this_ref(), "noneSatisfy", vec![ident("predicate", 2)])))],
                ),
            ],
        )],
    );

    let outcome = run_passes(circular.clone(), &oracle, &ec_rules::catalog(), 10);
    assert!(Arc::ptr_eq(&outcome.tree, &circular));
    assert_eq!(outcome.stats["negated-anySatisfy"].unsafe_rejections, 1);
    assert_eq!(outcome.stats["negated-noneSatisfy"].unsafe_rejections, 1);
    Ok(())
}

#[test]
fn test_two_hop_cycle_is_protected_but_other_methods_are_not() -> anyhow::Result<()> {
    let oracle = oracle_with("com.example.Wrapper", &[RICH]);
    let this_ref = || typed(this(), "com.example.Wrapper");

    let wrapper = unit(
        Some("com.example"),
        &[],
        vec![class(
            "Wrapper",
            &[RICH],
            vec![
                method_decl(
                    "hasAny",
                    vec![param("p", "Predicate<? super T>", 1)],
                    "boolean",
                    vec![ret(not(method(this_ref(), "noneSatisfy", vec![ident("p", 1)])))],
                ),
                method_decl(
                    "anySatisfy",
                    vec![param("p", "Predicate<? super T>", 2)],
                    "boolean",
                    vec![ret(method(this_ref(), "hasAny", vec![ident("p", 2)]))],
                ),
                method_decl(
                    "check",
                    vec![],
                    "boolean",
                    vec![ret(not(method(xs(), "noneSatisfy", vec![ident("q", 3)])))],
                ),
            ],
        )],
    );

    let outcome = run_passes(wrapper, &oracle, &ec_rules::catalog(), 10);
    let source = outcome.tree.to_source();
    assert!(source.contains("return !this.noneSatisfy(p);"));
    assert!(source.contains("return xs.anySatisfy(q);"));
    assert_eq!(outcome.applied, 1);
    Ok(())
}

#[test]
fn test_fixpoint_is_idempotent() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let rules = ec_rules::catalog();
    let input = unit(
        Some("com.example"),
        &[],
        vec![class(
            "Service",
            &[],
            vec![
                method_decl(
                    "a",
                    vec![],
                    "boolean",
                    vec![ret(not(method(method(xs(), "select", vec![ident("p", 2)]), "isEmpty", vec![])))],
                ),
                method_decl(
                    "b",
                    vec![],
                    "boolean",
                    vec![ret(binary(BinaryOp::Lt, int(0), method(xs(), "size", vec![])))],
                ),
            ],
        )],
    );

    let first = run_passes(input, &oracle, &rules, 10);
    assert!(first.converged);
    let source = first.tree.to_source();
    assert!(source.contains("return xs.anySatisfy(p);"));
    assert!(source.contains("return xs.notEmpty();"));

    let second = run_passes(first.tree.clone(), &oracle, &rules, 10);
    assert_eq!(second.applied, 0);
    assert_eq!(second.passes, 1);
    assert!(Arc::ptr_eq(&second.tree, &first.tree));
    Ok(())
}

#[test]
fn test_new_type_reference_adds_import() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let names = || typed(ident("names", 4), "java.util.List<String>");
    let input = in_method(
        &["java.util.List"],
        binary(
            BinaryOp::Or,
            binary(BinaryOp::Eq, names(), null()),
            method(names(), "isEmpty", vec![]),
        ),
    );

    let outcome = run_passes(input, &oracle, &ec_rules::catalog(), 10);
    assert_eq!(returned(&outcome), "Iterate.isEmpty(names)");
    assert_eq!(outcome.imports.paths(), vec!["java.util.List", ITERATE]);
    assert_eq!(outcome.tree.imports().len(), 2);
    Ok(())
}

#[test]
fn test_nested_type_reference_keeps_new_import() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let names = || typed(ident("names", 4), "java.util.List<String>");
    let null_or_empty = binary(
        BinaryOp::Or,
        binary(BinaryOp::Eq, names(), null()),
        method(names(), "isEmpty", vec![]),
    );
    let input = unit(
        Some("com.example"),
        &["java.util.List"],
        vec![class(
            "Service",
            &[],
            vec![
                class("Inner", &[], vec![]),
                method_decl(
                    "check",
                    vec![],
                    "boolean",
                    vec![ret(binary(
                        BinaryOp::And,
                        null_or_empty,
                        static_call("com.example.Service.Inner", "ok", vec![]),
                    ))],
                ),
            ],
        )],
    );

    let outcome = run_passes(input, &oracle, &ec_rules::catalog(), 10);
    assert!(returned(&outcome).contains("Iterate.isEmpty(names)"));
    assert_eq!(outcome.imports.paths(), vec!["java.util.List", ITERATE]);
    assert!(!outcome
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::ImportConflict { .. })));
    Ok(())
}

#[test]
fn test_last_use_removal_drops_import() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let bag = typed(ident("bag", 1), "org.eclipse.collections.api.bag.MutableBag<String>");
    let input = in_method(
        &[COLLECTORS, "java.util.Map"],
        method(
            method(bag, "stream", vec![]),
            "collect",
            vec![static_call(COLLECTORS, "toList", vec![])],
        ),
    );

    let outcome = run_passes(input, &oracle, &ec_rules::catalog(), 10);
    assert_eq!(returned(&outcome), "bag.toList()");
    // Map was never used by the rewritten code
    assert_eq!(outcome.imports.paths(), vec!["java.util.Map"]);
    Ok(())
}

#[test]
fn test_import_conflict_leaves_node_unmodified() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let names = || typed(ident("names", 4), "java.util.List<String>");
    let input = in_method(
        &["com.acme.Iterate"],
        binary(
            BinaryOp::Or,
            binary(BinaryOp::Eq, names(), null()),
            method(names(), "isEmpty", vec![]),
        ),
    );

    let outcome = run_passes(input.clone(), &oracle, &ec_rules::catalog(), 10);
    assert!(Arc::ptr_eq(&outcome.tree, &input));
    assert!(outcome.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::ImportConflict { rule: "null-or-empty-to-Iterate.isEmpty", .. }
    )));
    assert_eq!(outcome.stats["null-or-empty-to-Iterate.isEmpty"].import_conflicts, 1);
    Ok(())
}

#[test]
fn test_missing_type_information_skips_rule() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let input = in_method(&[], binary(BinaryOp::Eq, method(ident("xs", 1), "size", vec![]), int(0)));

    let outcome = run_passes(input.clone(), &oracle, &ec_rules::catalog(), 10);
    assert!(Arc::ptr_eq(&outcome.tree, &input));
    assert_eq!(outcome.stats["size-to-isEmpty"].type_unavailable, 1);
    Ok(())
}

struct Exploding;

impl RewriteRule for Exploding {
    fn name(&self) -> &'static str {
        "exploding"
    }

    fn description(&self) -> &'static str {
        "Panics on every node"
    }

    fn try_rewrite(&self, _node: &Node, _ctx: &RuleContext<'_>) -> Result<Node, NoMatch> {
        panic!("rule bug")
    }
}

#[test]
fn test_panicking_rule_does_not_abort_pass() -> anyhow::Result<()> {
    recast_core::init_tracing();
    let oracle = TypeOracle::standard();
    let mut rules = RuleSet::new().with(Exploding);
    rules.extend(ec_rules::catalog());
    let input = in_method(&[], not(method(xs(), "noneSatisfy", vec![ident("p", 2)])));

    let outcome = run_passes(input, &oracle, &rules, 10);
    assert_eq!(returned(&outcome), "xs.anySatisfy(p)");
    assert!(outcome.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::RulePanicked { rule: "exploding", message } if message == "rule bug"
    )));
    assert!(outcome.stats["exploding"].panics > 0);
    Ok(())
}

fn competing_rules() -> RuleSet {
    let legacy = || Pattern::method(Pattern::var("x"), "legacy", vec![]);
    RuleSet::new()
        .with(Rule::new(
            "to-modern",
            "",
            legacy(),
            Template::method(Template::var("x"), "modern", vec![]),
        ))
        .with(
            Rule::new(
                "to-preferred",
                "",
                legacy(),
                Template::method(Template::var("x"), "preferred", vec![]),
            )
            .with_priority(200),
        )
}

#[test]
fn test_tie_break_is_configurable() -> anyhow::Result<()> {
    let oracle = TypeOracle::standard();
    let input = in_method(&[], method(ident("svc", 1), "legacy", vec![]));

    let by_registration = RewriteEngine::new(&oracle, &competing_rules(), &EngineConfig::default())
        .run(input.clone());
    assert_eq!(returned(&by_registration), "svc.modern()");

    let config = EngineConfig::default()
        .with_tie_break(TieBreak::Priority)
        .with_ambiguity_detection(true);
    let by_priority = RewriteEngine::new(&oracle, &competing_rules(), &config).run(input);
    assert_eq!(returned(&by_priority), "svc.preferred()");
    assert_eq!(
        by_priority.diagnostics,
        vec![Diagnostic::AmbiguousMatch {
            winner: "to-preferred",
            loser: "to-modern",
            node: "svc.legacy()".to_string(),
        }]
    );
    // the shadowed rule matched but was not applied
    assert_eq!(by_priority.stats["to-modern"].rewrites, 0);
    assert_eq!(by_priority.stats["to-preferred"].rewrites, 1);
    Ok(())
}

#[test]
fn test_engine_config_from_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        r#"{{"max_passes": 1, "tie_break": "Priority", "recursion_depth": 1}}"#
    )?;
    let config = EngineConfig::from_path(file.path())?;
    assert_eq!(config.max_passes, 1);
    assert_eq!(config.workers, 4);

    // one pass is not enough for the negation introduced by the first rewrite
    let oracle = TypeOracle::standard();
    let input = in_method(
        &[],
        not(method(method(xs(), "select", vec![ident("p", 2)]), "isEmpty", vec![])),
    );
    let outcome = RewriteEngine::new(&oracle, &ec_rules::catalog(), &config).run(input);
    assert_eq!(returned(&outcome), "!xs.noneSatisfy(p)");
    assert!(!outcome.converged);
    Ok(())
}

#[test]
fn test_invalid_config_file_is_rejected() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, r#"{{"workers": 0}}"#)?;
    assert!(EngineConfig::from_path(file.path()).is_err());
    assert!(EngineConfig::from_path("/nonexistent/recast.json").is_err());
    Ok(())
}
