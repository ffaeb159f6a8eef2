//! Shapes that compute more than they need to answer a yes/no question
//! about the elements: `select(p).isEmpty()`, `count(p) == 0`,
//! `detectOptional(p).isPresent()`, negated `*Satisfy` calls and friends.

use crate::ast::BinaryOp;
use crate::oracle::FamilySet;
use crate::rewrite::guard::Guard;
use crate::rewrite::pattern::Pattern;
use crate::rewrite::rules::{Rule, RuleSet};
use crate::rewrite::template::Template;

const RICH: FamilySet = FamilySet::RICH_ITERABLE;

pub fn rules() -> RuleSet {
    RuleSet::new()
        .with(negated_none_satisfy())
        .with(negated_any_satisfy())
        .with(select_is_empty())
        .with(select_not_empty())
        .with(count_is_zero())
        .with(count_is_positive())
        .with(detect_optional_is_present())
        .with(negated_detect_optional_is_present())
        .with(detect_optional_is_empty())
        .with(negated_detect_optional_is_empty())
        .with(select_size())
        .with(any_satisfy_equals_reference())
        .with(any_satisfy_equals_lambda())
        .with(all_satisfy_negated_lambda())
}

/// `detect(p) == null` style rules; `detect` also returns `null` when the
/// first matching element is itself `null`
pub fn detect_null_rules() -> RuleSet {
    RuleSet::new()
        .with(detect_is_null())
        .with(detect_is_not_null())
}

fn call(receiver: &str, name: &str, arg: &str) -> Pattern {
    Pattern::method(Pattern::var(receiver), name, vec![Pattern::var(arg)])
}

fn satisfy(operation: &str) -> Template {
    Template::method(Template::var("x"), operation, vec![Template::var("p")])
}

fn rich_rule(
    name: &'static str,
    description: &'static str,
    pattern: Pattern,
    operation: &str,
) -> Rule {
    Rule::new(name, description, pattern, satisfy(operation))
        .guard(Guard::in_family("x", RICH))
        .targets(operation, RICH)
}

pub fn negated_none_satisfy() -> Rule {
    rich_rule(
        "negated-noneSatisfy",
        "!x.noneSatisfy(p) to x.anySatisfy(p)",
        Pattern::not(call("x", "noneSatisfy", "p")),
        "anySatisfy",
    )
}

pub fn negated_any_satisfy() -> Rule {
    rich_rule(
        "negated-anySatisfy",
        "!x.anySatisfy(p) to x.noneSatisfy(p)",
        Pattern::not(call("x", "anySatisfy", "p")),
        "noneSatisfy",
    )
}

/// `<x.select(p)>.<terminal>()`; the terminal's receiver must be the
/// `select` call itself, so `x.select(p).collect(f).isEmpty()` never matches
fn selected_then(terminal: &str) -> Pattern {
    Pattern::method(
        call("x", "select", "p"),
        terminal,
        vec![],
    )
}

pub fn select_is_empty() -> Rule {
    rich_rule(
        "select-isEmpty-to-noneSatisfy",
        "x.select(p).isEmpty() to x.noneSatisfy(p)",
        selected_then("isEmpty"),
        "noneSatisfy",
    )
}

pub fn select_not_empty() -> Rule {
    rich_rule(
        "select-notEmpty-to-anySatisfy",
        "x.select(p).notEmpty() to x.anySatisfy(p)",
        selected_then("notEmpty"),
        "anySatisfy",
    )
}

fn count() -> Pattern {
    call("x", "count", "p")
}

pub fn count_is_zero() -> Rule {
    rich_rule(
        "count-zero-to-noneSatisfy",
        "x.count(p) == 0 to x.noneSatisfy(p)",
        Pattern::any_of(vec![
            Pattern::commuted(BinaryOp::Eq, count(), Pattern::Int(0)),
            Pattern::commuted(BinaryOp::Le, count(), Pattern::Int(0)),
            Pattern::commuted(BinaryOp::Lt, count(), Pattern::Int(1)),
        ]),
        "noneSatisfy",
    )
}

pub fn count_is_positive() -> Rule {
    rich_rule(
        "count-positive-to-anySatisfy",
        "x.count(p) > 0 to x.anySatisfy(p)",
        Pattern::any_of(vec![
            Pattern::commuted(BinaryOp::Ne, count(), Pattern::Int(0)),
            Pattern::commuted(BinaryOp::Gt, count(), Pattern::Int(0)),
            Pattern::commuted(BinaryOp::Ge, count(), Pattern::Int(1)),
        ]),
        "anySatisfy",
    )
}

fn detect_optional(query: &str) -> Pattern {
    Pattern::method(call("x", "detectOptional", "p"), query, vec![])
}

pub fn detect_optional_is_present() -> Rule {
    rich_rule(
        "detectOptional-isPresent-to-anySatisfy",
        "x.detectOptional(p).isPresent() to x.anySatisfy(p)",
        detect_optional("isPresent"),
        "anySatisfy",
    )
    .guard(Guard::NotNegated)
}

pub fn negated_detect_optional_is_present() -> Rule {
    rich_rule(
        "negated-detectOptional-isPresent-to-noneSatisfy",
        "!x.detectOptional(p).isPresent() to x.noneSatisfy(p)",
        Pattern::not(detect_optional("isPresent")),
        "noneSatisfy",
    )
}

pub fn detect_optional_is_empty() -> Rule {
    rich_rule(
        "detectOptional-isEmpty-to-noneSatisfy",
        "x.detectOptional(p).isEmpty() to x.noneSatisfy(p)",
        detect_optional("isEmpty"),
        "noneSatisfy",
    )
    .guard(Guard::NotNegated)
}

pub fn negated_detect_optional_is_empty() -> Rule {
    rich_rule(
        "negated-detectOptional-isEmpty-to-anySatisfy",
        "!x.detectOptional(p).isEmpty() to x.anySatisfy(p)",
        Pattern::not(detect_optional("isEmpty")),
        "anySatisfy",
    )
}

pub fn select_size() -> Rule {
    rich_rule(
        "select-size-to-count",
        "x.select(p).size() to x.count(p)",
        selected_then("size"),
        "count",
    )
}

fn contains() -> Template {
    Template::method(Template::var("x"), "contains", vec![Template::var("t")])
}

/// `x.anySatisfy(t::equals)` to `x.contains(t)`
pub fn any_satisfy_equals_reference() -> Rule {
    Rule::new(
        "anySatisfy-equals-reference-to-contains",
        "x.anySatisfy(t::equals) to x.contains(t)",
        Pattern::method(
            Pattern::var("x"),
            "anySatisfy",
            vec![Pattern::method_ref(Pattern::reference("t"), "equals")],
        ),
        contains(),
    )
    .guard(Guard::in_family("x", RICH))
    .targets("contains", RICH)
}

/// `x.anySatisfy(e -> t.equals(e))` to `x.contains(t)`
pub fn any_satisfy_equals_lambda() -> Rule {
    Rule::new(
        "anySatisfy-equals-lambda-to-contains",
        "x.anySatisfy(e -> t.equals(e)) to x.contains(t)",
        Pattern::method(
            Pattern::var("x"),
            "anySatisfy",
            vec![Pattern::lambda(
                &["e"],
                Pattern::method(Pattern::reference("t"), "equals", vec![Pattern::var("e")]),
            )],
        ),
        contains(),
    )
    .guard(Guard::in_family("x", RICH))
    .guard(Guard::not_referencing("t", "e"))
    .targets("contains", RICH)
}

/// `x.allSatisfy(e -> !b)` to `x.noneSatisfy(e -> b)`
pub fn all_satisfy_negated_lambda() -> Rule {
    Rule::new(
        "allSatisfy-negated-lambda-to-noneSatisfy",
        "x.allSatisfy(e -> !b) to x.noneSatisfy(e -> b)",
        Pattern::method(
            Pattern::var("x"),
            "allSatisfy",
            vec![Pattern::lambda(&["e"], Pattern::var("body"))],
        ),
        Template::method(
            Template::var("x"),
            "noneSatisfy",
            vec![Template::lambda(&["e"], Template::var("inner"))],
        ),
    )
    .guard(Guard::in_family("x", RICH))
    .guard(Guard::negated("body", "inner"))
    .targets("noneSatisfy", RICH)
}

pub fn detect_is_null() -> Rule {
    rich_rule(
        "detect-null-to-noneSatisfy",
        "x.detect(p) == null to x.noneSatisfy(p)",
        Pattern::commuted(BinaryOp::Eq, call("x", "detect", "p"), Pattern::Null),
        "noneSatisfy",
    )
}

pub fn detect_is_not_null() -> Rule {
    rich_rule(
        "detect-not-null-to-anySatisfy",
        "x.detect(p) != null to x.anySatisfy(p)",
        Pattern::commuted(BinaryOp::Ne, call("x", "detect", "p"), Pattern::Null),
        "anySatisfy",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::{Node, ToSource};
    use crate::oracle::TypeOracle;
    use crate::rewrite::rules::RewriteRule;
    use crate::rewrite::{Cursor, NoMatch, RuleContext};

    const LIST: &str = "org.eclipse.collections.api.list.MutableList<String>";

    fn apply_in(rule: &Rule, node: &Node, cursor: &Cursor) -> Result<String, NoMatch> {
        let oracle = TypeOracle::standard();
        rule.try_rewrite(node, &RuleContext::new(&oracle, cursor))
            .map(|out| out.to_source())
    }

    fn apply(rule: &Rule, node: &Node) -> Result<String, NoMatch> {
        apply_in(rule, node, &Cursor::new())
    }

    fn xs() -> Node {
        typed(ident("xs", 1), LIST)
    }

    #[test]
    fn test_select_chain_must_be_linear() {
        let p = ident("p", 2);
        let direct = method(method(xs(), "select", vec![p.clone()]), "isEmpty", vec![]);
        assert_eq!(apply(&select_is_empty(), &direct).unwrap(), "xs.noneSatisfy(p)");

        let mapped = method(
            method(method(xs(), "select", vec![p]), "collect", vec![ident("f", 3)]),
            "isEmpty",
            vec![],
        );
        // rejected by the shape of the pattern, before any guard runs
        assert!(matches!(
            apply(&select_is_empty(), &mapped),
            Err(NoMatch::NameMismatch { .. })
        ));
    }

    #[test]
    fn test_count_comparisons() {
        let count = || method(xs(), "count", vec![ident("p", 2)]);
        assert_eq!(
            apply(&count_is_zero(), &binary(BinaryOp::Eq, int(0), count())).unwrap(),
            "xs.noneSatisfy(p)"
        );
        assert_eq!(
            apply(&count_is_positive(), &binary(BinaryOp::Ge, count(), int(1))).unwrap(),
            "xs.anySatisfy(p)"
        );
        assert!(apply(&count_is_positive(), &binary(BinaryOp::Gt, count(), int(1))).is_err());
    }

    #[test]
    fn test_detect_optional_polarity_is_exclusive() {
        let inner = method(
            method(xs(), "detectOptional", vec![ident("p", 2)]),
            "isPresent",
            vec![],
        );
        let negated = not(inner.clone());

        assert_eq!(apply(&detect_optional_is_present(), &inner).unwrap(), "xs.anySatisfy(p)");
        assert_eq!(
            apply(&negated_detect_optional_is_present(), &negated).unwrap(),
            "xs.noneSatisfy(p)"
        );

        // the positive variant refuses the operand of the negation
        let under_not = Cursor::from_ancestors(vec![negated.clone()]);
        assert!(matches!(
            apply_in(&detect_optional_is_present(), &inner, &under_not),
            Err(NoMatch::GuardFailed { guard: "NotNegated", .. })
        ));
        assert!(apply(&negated_detect_optional_is_present(), &inner).is_err());
    }

    #[test]
    fn test_equals_predicates_become_contains() {
        let by_reference = method(
            xs(),
            "anySatisfy",
            vec![method_ref(ident("target", 4), "equals")],
        );
        assert_eq!(
            apply(&any_satisfy_equals_reference(), &by_reference).unwrap(),
            "xs.contains(target)"
        );

        let by_lambda = method(
            xs(),
            "anySatisfy",
            vec![lambda(&[("e", 5)], method(ident("target", 4), "equals", vec![ident("e", 5)]))],
        );
        assert_eq!(
            apply(&any_satisfy_equals_lambda(), &by_lambda).unwrap(),
            "xs.contains(target)"
        );

        // `e -> e.equals(e)` would leave `e` dangling
        let self_equal = method(
            xs(),
            "anySatisfy",
            vec![lambda(&[("e", 5)], method(ident("e", 5), "equals", vec![ident("e", 5)]))],
        );
        assert!(apply(&any_satisfy_equals_lambda(), &self_equal).is_err());
    }

    #[test]
    fn test_all_satisfy_negated_lambda() {
        let node = method(
            xs(),
            "allSatisfy",
            vec![lambda(&[("s", 6)], not(method(ident("s", 6), "isBlank", vec![])))],
        );
        assert_eq!(
            apply(&all_satisfy_negated_lambda(), &node).unwrap(),
            "xs.noneSatisfy(s -> s.isBlank())"
        );

        let positive = method(
            xs(),
            "allSatisfy",
            vec![lambda(&[("s", 6)], method(ident("s", 6), "isBlank", vec![]))],
        );
        assert!(apply(&all_satisfy_negated_lambda(), &positive).is_err());
    }

    #[test]
    fn test_detect_null_rules() {
        let detect = method(xs(), "detect", vec![ident("p", 2)]);
        assert_eq!(
            apply(&detect_is_null(), &binary(BinaryOp::Eq, null(), detect.clone())).unwrap(),
            "xs.noneSatisfy(p)"
        );
        assert_eq!(
            apply(&detect_is_not_null(), &binary(BinaryOp::Ne, detect, null())).unwrap(),
            "xs.anySatisfy(p)"
        );
    }
}
