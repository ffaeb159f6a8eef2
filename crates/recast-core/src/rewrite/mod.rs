/*!
# Rewrite Engine

Pattern/guard/template rewriting over persistent syntax trees.

## Architecture

- `Pattern`: declarative tree shape with metavariable capture slots
- `Guard`: type, literal, polarity, equivalence and chain-shape side conditions
- `match_pattern`: structural unification producing `Bindings` or a typed `NoMatch`
- `is_safe_context`: anti-recursion gate run after a successful match
- `Template`: replacement shape instantiated from `Bindings`
- `reconcile_imports`: import additions/removals after a pass
- `RewriteEngine`: deterministic pre-order traversal to a fixpoint
- `rewrite_units`: parallel driver over independent compilation units

## Example Usage

```rust,ignore
use recast_core::oracle::TypeOracle;
use recast_core::rewrite::{ec_rules, run_passes};

let oracle = TypeOracle::standard();
let outcome = run_passes(tree, &oracle, &ec_rules::catalog(), 10);
println!("{} rewrites in {} passes", outcome.applied, outcome.passes);
```
*/

pub mod batch;
pub mod ec_rules;
pub mod engine;
pub mod guard;
pub mod imports;
pub mod matcher;
pub mod pattern;
pub mod recursion;
pub mod rules;
pub mod template;

pub use batch::{rewrite_units, BatchReport, UnitJob, UnitReport, UnitStatus};
pub use engine::{run_passes, Diagnostic, RewriteEngine, RewriteOutcome};
pub use guard::{Guard, Literal};
pub use imports::{reconcile_imports, ImportConflict, ImportScope, ImportSet};
pub use matcher::{match_pattern, Bindings, NoMatch};
pub use pattern::{CaptureKind, Metavar, Pattern};
pub use recursion::{is_safe_context, TargetOperation};
pub use rules::{RewriteRule, Rule, RuleSet, RuleStats};
pub use template::Template;

use crate::ast::{Node, NodeKind};
use crate::oracle::TypeOracle;

/// Ancestor chain of the node being visited, outermost first.
/// The visited node itself is not part of its own cursor.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    ancestors: Vec<Node>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor for a node nested under `ancestors` (outermost first)
    pub fn from_ancestors(ancestors: Vec<Node>) -> Self {
        Self { ancestors }
    }

    pub fn push(&mut self, node: Node) {
        self.ancestors.push(node);
    }

    pub fn pop(&mut self) -> Option<Node> {
        self.ancestors.pop()
    }

    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Ancestors nearest first
    pub fn ancestors(&self) -> impl Iterator<Item = &Node> {
        self.ancestors.iter().rev()
    }

    /// Nearest ancestor that is not a parenthesized expression
    pub fn parent(&self) -> Option<&Node> {
        self.ancestors()
            .find(|node| !matches!(node.kind, NodeKind::Parens(_)))
    }

    pub fn enclosing_method(&self) -> Option<&Node> {
        self.ancestors()
            .find(|node| matches!(node.kind, NodeKind::Method { .. }))
    }

    pub fn enclosing_class(&self) -> Option<&Node> {
        self.ancestors()
            .find(|node| matches!(node.kind, NodeKind::Class { .. }))
    }
}

/// Everything a rule may consult while deciding whether it applies
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub oracle: &'a TypeOracle,
    pub cursor: &'a Cursor,
    pub recursion_depth: usize,
}

impl<'a> RuleContext<'a> {
    pub fn new(oracle: &'a TypeOracle, cursor: &'a Cursor) -> Self {
        Self {
            oracle,
            cursor,
            recursion_depth: 2,
        }
    }

    pub fn with_recursion_depth(mut self, depth: usize) -> Self {
        self.recursion_depth = depth;
        self
    }
}
