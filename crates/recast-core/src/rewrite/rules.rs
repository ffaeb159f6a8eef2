/*!
# Rewrite Rules

Core trait for rewrite rules, the declarative `Rule` that nearly every
catalog entry is, and the ordered `RuleSet` handed to the engine.
*/

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::Node;
use crate::config::TieBreak;
use crate::oracle::FamilySet;

use super::guard::Guard;
use super::matcher::{match_pattern, NoMatch};
use super::pattern::Pattern;
use super::recursion::{is_safe_context, TargetOperation};
use super::template::{instantiate, Template};
use super::RuleContext;

/// Core trait for rewrite rules
///
/// Implementations are stateless and shared across worker threads. A rule
/// either produces the replacement for `node` or says why it does not apply.
pub trait RewriteRule: Send + Sync {
    /// Human-readable name for this rule
    fn name(&self) -> &'static str;

    /// Detailed description of what this rule does
    fn description(&self) -> &'static str;

    /// Priority for rule ordering (higher priority runs first under `TieBreak::Priority`)
    fn priority(&self) -> u32 {
        100
    }

    /// Operation the replacement invokes, consulted by the anti-recursion gate
    fn target_operation(&self) -> Option<&TargetOperation> {
        None
    }

    /// Fully-qualified types the replacement may introduce
    fn required_imports(&self) -> Vec<String> {
        Vec::new()
    }

    fn try_rewrite(&self, node: &Node, ctx: &RuleContext<'_>) -> Result<Node, NoMatch>;
}

/// Pattern, ordered guards, template and target operation
#[derive(Debug, Clone)]
pub struct Rule {
    name: &'static str,
    description: &'static str,
    priority: u32,
    pattern: Pattern,
    guards: Vec<Guard>,
    template: Template,
    target: Option<TargetOperation>,
}

impl Rule {
    pub fn new(
        name: &'static str,
        description: &'static str,
        pattern: Pattern,
        template: Template,
    ) -> Self {
        Self {
            name,
            description,
            priority: 100,
            pattern,
            guards: Vec::new(),
            template,
            target: None,
        }
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Name the operation the template invokes on receivers of `family`
    pub fn targets(mut self, operation: &str, family: FamilySet) -> Self {
        self.target = Some(TargetOperation::new(operation, family));
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

impl RewriteRule for Rule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn target_operation(&self) -> Option<&TargetOperation> {
        self.target.as_ref()
    }

    fn required_imports(&self) -> Vec<String> {
        self.template.required_imports()
    }

    fn try_rewrite(&self, node: &Node, ctx: &RuleContext<'_>) -> Result<Node, NoMatch> {
        let mut bindings = match_pattern(node, &self.pattern, ctx.oracle)?;
        for guard in &self.guards {
            guard.evaluate(&mut bindings, ctx)?;
        }
        if let Some(target) = &self.target {
            if !is_safe_context(ctx.cursor, target, ctx.oracle, ctx.recursion_depth) {
                return Err(NoMatch::UnsafeContext {
                    operation: target.name.clone(),
                });
            }
        }
        instantiate(&self.template, &bindings)
    }
}

/// Ordered, immutable-once-built list of rules
#[derive(Clone, Default)]
pub struct RuleSet {
    rules: Vec<Arc<dyn RewriteRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: impl RewriteRule + 'static) -> Self {
        self.push(rule);
        self
    }

    pub fn push(&mut self, rule: impl RewriteRule + 'static) {
        self.rules.push(Arc::new(rule));
    }

    pub fn push_shared(&mut self, rule: Arc<dyn RewriteRule>) {
        self.rules.push(rule);
    }

    /// Append every rule of `other` after the rules already registered
    pub fn extend(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn RewriteRule>> {
        self.rules.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn RewriteRule>> {
        self.rules.iter().find(|rule| rule.name() == name)
    }

    /// Rule names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Rules in evaluation order. The priority sort is stable, so equal
    /// priorities keep registration order.
    pub fn ordered(&self, tie_break: TieBreak) -> Vec<Arc<dyn RewriteRule>> {
        let mut rules = self.rules.clone();
        if tie_break == TieBreak::Priority {
            rules.sort_by_key(|rule| Reverse(rule.priority()));
        }
        rules
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Statistics for rule application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    pub rule_name: String,
    pub attempts: u64,
    pub rewrites: u64,
    /// Structural mismatches and failed guards
    pub failures: u64,
    pub type_unavailable: u64,
    pub unsafe_rejections: u64,
    pub import_conflicts: u64,
    pub panics: u64,
    pub total_time_us: u64,
}

impl RuleStats {
    pub fn new(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            ..Self::default()
        }
    }

    /// Count one attempt and classify its result
    pub fn record<T>(&mut self, result: &Result<T, NoMatch>, elapsed_us: u64) {
        self.attempts += 1;
        self.total_time_us += elapsed_us;
        match result {
            Ok(_) => self.rewrites += 1,
            Err(NoMatch::TypeResolutionUnavailable(_)) => self.type_unavailable += 1,
            Err(NoMatch::UnsafeContext { .. }) => self.unsafe_rejections += 1,
            Err(NoMatch::ImportConflict(_)) => self.import_conflicts += 1,
            Err(NoMatch::RulePanicked(_)) => self.panics += 1,
            Err(_) => self.failures += 1,
        }
    }

    pub fn merge(&mut self, other: &RuleStats) {
        self.attempts += other.attempts;
        self.rewrites += other.rewrites;
        self.failures += other.failures;
        self.type_unavailable += other.type_unavailable;
        self.unsafe_rejections += other.unsafe_rejections;
        self.import_conflicts += other.import_conflicts;
        self.panics += other.panics;
        self.total_time_us += other.total_time_us;
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            (self.rewrites as f64) / (self.attempts as f64)
        }
    }

    pub fn average_time_us(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            (self.total_time_us as f64) / (self.attempts as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::{BinaryOp, ToSource};
    use crate::oracle::{OracleError, TypeOracle};
    use crate::rewrite::Cursor;

    const LIST: &str = "org.eclipse.collections.api.list.MutableList";

    fn size_zero_rule() -> Rule {
        Rule::new(
            "size-eq-zero",
            "x.size() == 0 to x.isEmpty()",
            Pattern::binary(
                BinaryOp::Eq,
                Pattern::method(Pattern::var("x"), "size", vec![]),
                Pattern::Int(0),
            ),
            Template::method(Template::var("x"), "isEmpty", vec![]),
        )
        .guard(Guard::in_family("x", FamilySet::RICH_ITERABLE))
        .targets("isEmpty", FamilySet::RICH_ITERABLE)
    }

    #[test]
    fn test_rule_rewrites_matching_node() {
        let oracle = TypeOracle::standard();
        let cursor = Cursor::new();
        let ctx = RuleContext::new(&oracle, &cursor);
        let node = binary(BinaryOp::Eq, method(typed(ident("x", 1), LIST), "size", vec![]), int(0));

        let out = size_zero_rule().try_rewrite(&node, &ctx).unwrap();
        assert_eq!(out.to_source(), "x.isEmpty()");
    }

    #[test]
    fn test_guard_and_recursion_failures_are_typed() {
        let oracle = TypeOracle::standard();
        let cursor = Cursor::new();
        let ctx = RuleContext::new(&oracle, &cursor);
        let untyped = binary(BinaryOp::Eq, method(ident("x", 1), "size", vec![]), int(0));
        assert!(matches!(
            size_zero_rule().try_rewrite(&untyped, &ctx),
            Err(NoMatch::TypeResolutionUnavailable(OracleError::Unresolved { .. }))
        ));

        let leaf = binary(BinaryOp::Eq, method(typed(this(), LIST), "size", vec![]), int(0));
        let decl = method_decl("isEmpty", vec![], "boolean", vec![ret(leaf.clone())]);
        let owner = class("MyList", &[LIST], vec![decl.clone()]);
        let inside = Cursor::from_ancestors(vec![owner, decl]);
        let ctx = RuleContext::new(&oracle, &inside);
        assert_eq!(
            size_zero_rule().try_rewrite(&leaf, &ctx),
            Err(NoMatch::UnsafeContext {
                operation: "isEmpty".to_string()
            })
        );
    }

    #[test]
    fn test_priority_ordering_is_stable() {
        let low = size_zero_rule();
        let high = Rule::new("high", "", Pattern::Wildcard, Template::Null).with_priority(200);
        let equal = Rule::new("equal", "", Pattern::Wildcard, Template::Null);
        let rules = RuleSet::new().with(low).with(high).with(equal);

        let names = |order: Vec<Arc<dyn RewriteRule>>| order.iter().map(|r| r.name()).collect::<Vec<_>>();
        assert_eq!(names(rules.ordered(TieBreak::RegistrationOrder)), vec!["size-eq-zero", "high", "equal"]);
        assert_eq!(names(rules.ordered(TieBreak::Priority)), vec!["high", "size-eq-zero", "equal"]);
    }

    #[test]
    fn test_stats_classify_results() {
        let mut stats = RuleStats::new("r");
        stats.record(&Ok::<(), NoMatch>(()), 10);
        stats.record::<()>(&Err(NoMatch::LiteralMismatch), 4);
        stats.record::<()>(&Err(NoMatch::RulePanicked("boom".into())), 6);
        assert_eq!(stats.attempts, 3);
        assert_eq!((stats.rewrites, stats.failures, stats.panics), (1, 1, 1));
        assert!((stats.success_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
        assert!((stats.average_time_us() - 20.0 / 3.0).abs() < 1e-9);

        let mut total = RuleStats::new("r");
        total.merge(&stats);
        total.merge(&stats);
        assert_eq!(total.attempts, 6);
    }
}
