/*!
# Eclipse Collections Rules

Rule configurations built from the core pattern, guard and template types.
Each rule names the operation its replacement invokes so that the
implementation of that operation is never rewritten into a call to itself.

- `emptiness`: size comparisons and negated emptiness checks
- `satisfies`: select/count/detect shapes collapsed into the `*Satisfy` family
- `streams`: JDK stream pipelines on rich iterables

`catalog()` is the default, behavior-preserving set. `adoption_risks()` holds
rules that are only equivalent when the collection contains no `null`
elements and must be opted into.
*/

pub mod emptiness;
pub mod satisfies;
pub mod streams;

use super::rules::RuleSet;

/// Eclipse Collections static utility for null-safe iterable checks
pub const ITERATE: &str = "org.eclipse.collections.impl.utility.Iterate";
pub const COLLECTORS: &str = "java.util.stream.Collectors";

/// Every behavior-preserving rule, in registration order
pub fn catalog() -> RuleSet {
    let mut rules = emptiness::rules();
    rules.extend(satisfies::rules());
    rules.extend(streams::rules());
    rules
}

/// Rules whose equivalence depends on the absence of `null` elements
pub fn adoption_risks() -> RuleSet {
    satisfies::detect_null_rules()
}
