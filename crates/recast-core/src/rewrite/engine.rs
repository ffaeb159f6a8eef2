/*!
# Traversal Driver

Applies an ordered rule list to one compilation unit until a pass makes no
change.

## Pass Semantics

- Nodes are visited in pre-order, declaration order.
- At each node the rules are tried in configured order; the first rule that
  produces a replacement wins and the replacement is visited again at the
  same position, so one rule's output can feed another within the pass.
- Children are visited after the node at their position has settled. A node
  whose children are all unchanged is kept by identity.
- A rule that fails for any reason (mismatch, guard, missing type
  information, recursion gate, import conflict, panic) is skipped for that
  node only; the pass always completes.
- After a pass with changes, the import list is reconciled against the tree
  as it was when the pass started.
*/

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, debug_span, trace, warn};

use crate::ast::{simple_name, Node, SyntaxNode, ToSource};
use crate::config::EngineConfig;
use crate::oracle::TypeOracle;

use super::imports::{reconcile_imports, referenced_types, ImportConflict, ImportScope, ImportSet};
use super::matcher::NoMatch;
use super::rules::{RewriteRule, RuleSet, RuleStats};
use super::{Cursor, RuleContext};

/// Something the caller should know about that did not stop the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostic {
    /// Two rules matched the same node with different replacements
    AmbiguousMatch {
        winner: &'static str,
        loser: &'static str,
        node: String,
    },
    /// A rewrite was abandoned because its import would clash
    ImportConflict {
        rule: &'static str,
        conflict: ImportConflict,
    },
    /// Successive rewrites at one position hit the configured bound
    RewriteLimit { node: String, limit: usize },
    RulePanicked { rule: &'static str, message: String },
}

/// Result of running the engine over one tree
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub tree: Node,
    pub imports: ImportSet,
    /// Total rewrites over all passes
    pub applied: usize,
    pub passes: usize,
    /// The last pass made no change
    pub converged: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: IndexMap<String, RuleStats>,
}

impl RewriteOutcome {
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

/// Mutable state of a single pass
struct PassState {
    scope: ImportScope,
    /// Simple name to fully-qualified name of imports requested this pass
    pending_imports: IndexMap<String, String>,
    applied: usize,
}

/// A replacement that won at a node but has not been applied yet
struct Candidate {
    rule: &'static str,
    replacement: Node,
    elapsed_us: u64,
}

pub struct RewriteEngine<'a> {
    oracle: &'a TypeOracle,
    rules: Vec<Arc<dyn RewriteRule>>,
    config: EngineConfig,
    stats: IndexMap<String, RuleStats>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RewriteEngine<'a> {
    pub fn new(oracle: &'a TypeOracle, rules: &RuleSet, config: &EngineConfig) -> Self {
        let rules = rules.ordered(config.tie_break);
        let stats = rules
            .iter()
            .map(|rule| (rule.name().to_string(), RuleStats::new(rule.name())))
            .collect();
        Self {
            oracle,
            rules,
            config: config.clone(),
            stats,
            diagnostics: Vec::new(),
        }
    }

    /// Run passes until one makes no change or `max_passes` is reached
    pub fn run(mut self, tree: Node) -> RewriteOutcome {
        let mut tree = tree;
        let mut applied = 0;
        let mut passes = 0;
        let mut converged = false;

        while passes < self.config.max_passes {
            passes += 1;
            let span = debug_span!("rewrite_pass", pass = passes);
            let _enter = span.enter();

            let (next, count) = self.run_pass(&tree);
            debug!(rewrites = count, "Pass complete");
            if count == 0 {
                converged = true;
                break;
            }
            applied += count;
            tree = self.reconcile(&tree, next);
        }

        RewriteOutcome {
            imports: ImportSet::of(&tree),
            tree,
            applied,
            passes,
            converged,
            diagnostics: self.diagnostics,
            stats: self.stats,
        }
    }

    /// One full pre-order pass; returns the new tree and the rewrite count
    fn run_pass(&mut self, tree: &Node) -> (Node, usize) {
        let mut state = PassState {
            scope: ImportScope::of(tree),
            pending_imports: IndexMap::new(),
            applied: 0,
        };
        let mut cursor = Cursor::new();
        let next = self.visit(tree, &mut cursor, &mut state);
        (next, state.applied)
    }

    fn visit(&mut self, node: &Node, cursor: &mut Cursor, state: &mut PassState) -> Node {
        let mut current = node.clone();
        let mut rewrites = 0;
        while let Some(candidate) = self.rewrite_at(&current, cursor, state) {
            if rewrites == self.config.max_rewrites_per_node {
                warn!(node = %current.to_source(), limit = rewrites, "Rewrite limit reached at node");
                let dropped: Result<(), NoMatch> =
                    Err(NoMatch::guard("RewriteLimit", "per-node rewrite bound reached"));
                self.record(candidate.rule, &dropped, candidate.elapsed_us);
                self.diagnostics.push(Diagnostic::RewriteLimit {
                    node: current.to_source(),
                    limit: rewrites,
                });
                break;
            }
            current = self.commit(&current, candidate, state);
            rewrites += 1;
            state.applied += 1;
        }

        let children = current.children();
        if children.is_empty() {
            return current;
        }

        cursor.push(current.clone());
        let rewritten: Vec<Node> = children
            .iter()
            .map(|child| self.visit(child, cursor, state))
            .collect();
        cursor.pop();

        let unchanged = children
            .iter()
            .zip(&rewritten)
            .all(|(before, after)| Arc::ptr_eq(before, after));
        if unchanged {
            current
        } else {
            current.replace_children(rewritten).into_node()
        }
    }

    /// Try every rule at `node`; the first replacement in rule order wins.
    /// The winner is returned uncommitted: its stats and imports are only
    /// recorded once the caller accepts it.
    fn rewrite_at(&mut self, node: &Node, cursor: &Cursor, state: &PassState) -> Option<Candidate> {
        let ctx = RuleContext::new(self.oracle, cursor)
            .with_recursion_depth(self.config.recursion_depth);
        let mut winner: Option<Candidate> = None;

        for index in 0..self.rules.len() {
            let rule = Arc::clone(&self.rules[index]);
            let name = rule.name();
            let started = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| rule.try_rewrite(node, &ctx)))
                .unwrap_or_else(|payload| Err(NoMatch::RulePanicked(panic_message(payload))))
                .and_then(|replacement| {
                    if Arc::ptr_eq(&replacement, node) || replacement.kind == node.kind {
                        return Err(NoMatch::guard("Unchanged", "replacement equals the node"));
                    }
                    vet_imports(&replacement, state)?;
                    Ok(replacement)
                });

            let elapsed_us = started.elapsed().as_micros() as u64;

            match result {
                Ok(replacement) => {
                    if let Some(first) = &winner {
                        let shadowed: Result<(), NoMatch> =
                            Err(NoMatch::guard("Shadowed", format!("{} matched first", first.rule)));
                        self.record(name, &shadowed, elapsed_us);
                        if first.replacement.kind != replacement.kind {
                            debug!(winner = first.rule, loser = name, "Ambiguous match");
                            self.diagnostics.push(Diagnostic::AmbiguousMatch {
                                winner: first.rule,
                                loser: name,
                                node: node.to_source(),
                            });
                        }
                        continue;
                    }
                    winner = Some(Candidate {
                        rule: name,
                        replacement,
                        elapsed_us,
                    });
                    if !self.config.detect_ambiguity {
                        break;
                    }
                }
                Err(reason) => self.reject(name, reason, elapsed_us),
            }
        }

        winner
    }

    /// Record a failed attempt and report it at the level its reason calls for
    fn reject(&mut self, name: &'static str, reason: NoMatch, elapsed_us: u64) {
        let result: Result<(), NoMatch> = Err(reason);
        self.record(name, &result, elapsed_us);
        match result {
            Ok(()) => {}
            Err(NoMatch::TypeResolutionUnavailable(error)) => {
                debug!(rule = name, %error, "Type information unavailable, rule skipped");
            }
            Err(NoMatch::ImportConflict(conflict)) => {
                warn!(rule = name, %conflict, "Import conflict, rewrite abandoned");
                self.diagnostics.push(Diagnostic::ImportConflict { rule: name, conflict });
            }
            Err(NoMatch::RulePanicked(message)) => {
                warn!(rule = name, %message, "Rule panicked, treated as no match");
                self.diagnostics
                    .push(Diagnostic::RulePanicked { rule: name, message });
            }
            Err(reason) => {
                trace!(rule = name, %reason, "No match");
            }
        }
    }

    /// Accept a candidate: count it, queue the imports it needs and move the
    /// replaced node's trivia onto it
    fn commit(&mut self, node: &Node, candidate: Candidate, state: &mut PassState) -> Node {
        let Candidate {
            rule,
            replacement,
            elapsed_us,
        } = candidate;
        debug!(
            rule,
            before = %node.to_source(),
            after = %replacement.to_source(),
            "Applied rewrite"
        );
        self.record(rule, &Ok::<(), NoMatch>(()), elapsed_us);
        for fqn in referenced_types(&replacement) {
            if state.scope.check_addable(&fqn).unwrap_or(false) {
                state
                    .pending_imports
                    .insert(simple_name(&fqn).to_string(), fqn);
            }
        }
        carry_trivia(node, replacement)
    }

    fn record<T>(&mut self, rule: &'static str, result: &Result<T, NoMatch>, elapsed_us: u64) {
        if let Some(stats) = self.stats.get_mut(rule) {
            stats.record(result, elapsed_us);
        }
    }

    fn reconcile(&mut self, pass_start: &Node, pass_end: Node) -> Node {
        match reconcile_imports(pass_start, &pass_end) {
            Ok(imports) if imports.paths() != ImportSet::of(&pass_end).paths() => {
                debug!(imports = ?imports.paths(), "Reconciled imports");
                pass_end.with_imports(imports.into_vec()).into_node()
            }
            Ok(_) => pass_end,
            Err(conflict) => {
                warn!(%conflict, "Import reconciliation conflict, imports left as they were");
                self.diagnostics.push(Diagnostic::ImportConflict {
                    rule: "reconcile_imports",
                    conflict,
                });
                pass_end
            }
        }
    }
}

/// Reject a replacement whose new type references cannot be imported
fn vet_imports(replacement: &Node, state: &PassState) -> Result<(), NoMatch> {
    for fqn in referenced_types(replacement) {
        if !state.scope.check_addable(&fqn)? {
            continue;
        }
        if let Some(existing) = state.pending_imports.get(simple_name(&fqn)) {
            if *existing != fqn {
                return Err(ImportConflict {
                    requested: fqn,
                    existing: existing.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// The replacement root takes over the replaced node's type, span and comments
fn carry_trivia(replaced: &Node, replacement: Node) -> Node {
    if replaced.ty.is_none() && replaced.span.is_none() && replaced.comments.is_empty() {
        return replacement;
    }
    let mut comments = replaced.comments.clone();
    comments.extend(replacement.comments.iter().cloned());
    SyntaxNode {
        kind: replacement.kind.clone(),
        ty: replaced.ty.clone().or_else(|| replacement.ty.clone()),
        span: replaced.span.or(replacement.span),
        comments,
    }
    .into_node()
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `rules` over `tree` for at most `max_passes` passes with default settings
pub fn run_passes(
    tree: Node,
    oracle: &TypeOracle,
    rules: &RuleSet,
    max_passes: usize,
) -> RewriteOutcome {
    let config = EngineConfig::default().with_max_passes(max_passes);
    RewriteEngine::new(oracle, rules, &config).run(tree)
}
