//! JDK stream pipelines on rich iterables that have a direct equivalent.

use crate::oracle::FamilySet;
use crate::rewrite::guard::Guard;
use crate::rewrite::pattern::Pattern;
use crate::rewrite::rules::{Rule, RuleSet};
use crate::rewrite::template::Template;

use super::COLLECTORS;

const RICH: FamilySet = FamilySet::RICH_ITERABLE;

pub fn rules() -> RuleSet {
    RuleSet::new()
        .with(filter_find_first())
        .with(stream_match("anyMatch", "anySatisfy", "stream-anyMatch-to-anySatisfy"))
        .with(stream_match("allMatch", "allSatisfy", "stream-allMatch-to-allSatisfy"))
        .with(stream_match("noneMatch", "noneSatisfy", "stream-noneMatch-to-noneSatisfy"))
        .with(collect_to_list())
}

fn stream_of(var: &str) -> Pattern {
    Pattern::method(Pattern::var(var), "stream", vec![])
}

/// `x.stream().filter(p).findFirst()` to `x.detectOptional(p)`
pub fn filter_find_first() -> Rule {
    Rule::new(
        "stream-filter-findFirst-to-detectOptional",
        "x.stream().filter(p).findFirst() to x.detectOptional(p)",
        Pattern::method(
            Pattern::method(stream_of("x"), "filter", vec![Pattern::predicate("p")]),
            "findFirst",
            vec![],
        ),
        Template::method(Template::var("x"), "detectOptional", vec![Template::var("p")]),
    )
    .guard(Guard::in_family("x", RICH))
    .targets("detectOptional", RICH)
}

pub fn stream_match(
    terminal: &str,
    operation: &str,
    name: &'static str,
) -> Rule {
    Rule::new(
        name,
        "x.stream().*Match(p) to x.*Satisfy(p)",
        Pattern::method(stream_of("x"), terminal, vec![Pattern::predicate("p")]),
        Template::method(Template::var("x"), operation, vec![Template::var("p")]),
    )
    .guard(Guard::in_family("x", RICH))
    .targets(operation, RICH)
}

/// `x.stream().collect(Collectors.toList())` to `x.toList()`
pub fn collect_to_list() -> Rule {
    Rule::new(
        "stream-collect-toList-to-toList",
        "x.stream().collect(Collectors.toList()) to x.toList()",
        Pattern::method(
            stream_of("x"),
            "collect",
            vec![Pattern::static_call(COLLECTORS, "toList", vec![])],
        ),
        Template::method(Template::var("x"), "toList", vec![]),
    )
    .guard(Guard::in_family("x", RICH))
    .targets("toList", RICH)
}
