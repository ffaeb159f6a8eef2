//! Emptiness checks: size comparisons, negated `isEmpty`/`notEmpty`, and
//! null-or-empty tests on JDK collections.

use crate::ast::BinaryOp;
use crate::oracle::FamilySet;
use crate::rewrite::guard::Guard;
use crate::rewrite::pattern::Pattern;
use crate::rewrite::rules::{Rule, RuleSet};
use crate::rewrite::template::Template;

use super::ITERATE;

pub fn rules() -> RuleSet {
    RuleSet::new()
        .with(size_to_is_empty())
        .with(size_to_not_empty())
        .with(negated_is_empty())
        .with(negated_not_empty())
        .with(null_or_empty())
        .with(not_null_and_not_empty())
        .with(negated_iterate_is_empty())
        .with(negated_iterate_not_empty())
}

fn size_of(var: &str) -> Pattern {
    Pattern::method(Pattern::var(var), "size", vec![])
}

/// `x.size() == 0`, `x.size() <= 0`, `x.size() < 1` and their mirrored forms
pub fn size_to_is_empty() -> Rule {
    Rule::new(
        "size-to-isEmpty",
        "Replace size comparisons against zero with isEmpty()",
        Pattern::any_of(vec![
            Pattern::commuted(BinaryOp::Eq, size_of("x"), Pattern::Int(0)),
            Pattern::commuted(BinaryOp::Le, size_of("x"), Pattern::Int(0)),
            Pattern::commuted(BinaryOp::Lt, size_of("x"), Pattern::Int(1)),
        ]),
        Template::method(Template::var("x"), "isEmpty", vec![]),
    )
    .guard(Guard::in_family("x", FamilySet::RICH_ITERABLE))
    .targets("isEmpty", FamilySet::RICH_ITERABLE)
}

/// `x.size() != 0`, `x.size() > 0`, `x.size() >= 1` and their mirrored forms
pub fn size_to_not_empty() -> Rule {
    Rule::new(
        "size-to-notEmpty",
        "Replace size comparisons against zero with notEmpty()",
        Pattern::any_of(vec![
            Pattern::commuted(BinaryOp::Ne, size_of("x"), Pattern::Int(0)),
            Pattern::commuted(BinaryOp::Gt, size_of("x"), Pattern::Int(0)),
            Pattern::commuted(BinaryOp::Ge, size_of("x"), Pattern::Int(1)),
        ]),
        Template::method(Template::var("x"), "notEmpty", vec![]),
    )
    .guard(Guard::in_family("x", FamilySet::RICH_ITERABLE))
    .targets("notEmpty", FamilySet::RICH_ITERABLE)
}

pub fn negated_is_empty() -> Rule {
    Rule::new(
        "negated-isEmpty",
        "!x.isEmpty() to x.notEmpty()",
        Pattern::not(Pattern::method(Pattern::var("x"), "isEmpty", vec![])),
        Template::method(Template::var("x"), "notEmpty", vec![]),
    )
    .guard(Guard::in_family("x", FamilySet::RICH_ITERABLE))
    .targets("notEmpty", FamilySet::RICH_ITERABLE)
}

pub fn negated_not_empty() -> Rule {
    Rule::new(
        "negated-notEmpty",
        "!x.notEmpty() to x.isEmpty()",
        Pattern::not(Pattern::method(Pattern::var("x"), "notEmpty", vec![])),
        Template::method(Template::var("x"), "isEmpty", vec![]),
    )
    .guard(Guard::in_family("x", FamilySet::RICH_ITERABLE))
    .targets("isEmpty", FamilySet::RICH_ITERABLE)
}

/// `c == null || c.isEmpty()` to `Iterate.isEmpty(c)`
pub fn null_or_empty() -> Rule {
    Rule::new(
        "null-or-empty-to-Iterate.isEmpty",
        "Replace a null-or-empty check with the null-safe Iterate.isEmpty",
        Pattern::binary(
            BinaryOp::Or,
            Pattern::commuted(BinaryOp::Eq, Pattern::reference("c"), Pattern::Null),
            Pattern::method(Pattern::var("c"), "isEmpty", vec![]),
        ),
        Template::static_call(ITERATE, "isEmpty", vec![Template::var("c")]),
    )
    .guard(Guard::in_family("c", FamilySet::JDK_COLLECTION))
    .targets("isEmpty", FamilySet::empty())
}

/// `c != null && !c.isEmpty()` to `Iterate.notEmpty(c)`
pub fn not_null_and_not_empty() -> Rule {
    Rule::new(
        "not-null-and-not-empty-to-Iterate.notEmpty",
        "Replace a not-null-and-not-empty check with the null-safe Iterate.notEmpty",
        Pattern::binary(
            BinaryOp::And,
            Pattern::commuted(BinaryOp::Ne, Pattern::reference("c"), Pattern::Null),
            Pattern::not(Pattern::method(Pattern::var("c"), "isEmpty", vec![])),
        ),
        Template::static_call(ITERATE, "notEmpty", vec![Template::var("c")]),
    )
    .guard(Guard::in_family("c", FamilySet::JDK_COLLECTION))
    .targets("notEmpty", FamilySet::empty())
}

pub fn negated_iterate_is_empty() -> Rule {
    Rule::new(
        "negated-Iterate.isEmpty",
        "!Iterate.isEmpty(c) to Iterate.notEmpty(c)",
        Pattern::not(Pattern::static_call(ITERATE, "isEmpty", vec![Pattern::var("c")])),
        Template::static_call(ITERATE, "notEmpty", vec![Template::var("c")]),
    )
    .targets("notEmpty", FamilySet::empty())
}

pub fn negated_iterate_not_empty() -> Rule {
    Rule::new(
        "negated-Iterate.notEmpty",
        "!Iterate.notEmpty(c) to Iterate.isEmpty(c)",
        Pattern::not(Pattern::static_call(ITERATE, "notEmpty", vec![Pattern::var("c")])),
        Template::static_call(ITERATE, "isEmpty", vec![Template::var("c")]),
    )
    .targets("isEmpty", FamilySet::empty())
}
