/*!
# Batch Driver

Rewrites independent compilation units on a fixed pool of scoped worker
threads. Units are handed out through a channel; each worker owns the unit
it is rewriting, so no tree is ever shared between writers. Rule sets and
oracles are read-only and shared by reference.

Setting the cancellation flag lets running units finish; units not yet
started report `Skipped`.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::unbounded;
use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::ast::Node;
use crate::config::EngineConfig;
use crate::oracle::TypeOracle;

use super::engine::{RewriteEngine, RewriteOutcome};
use super::rules::{RuleSet, RuleStats};

/// One compilation unit together with the oracle for its type environment
#[derive(Debug, Clone)]
pub struct UnitJob {
    pub name: String,
    pub tree: Node,
    pub oracle: Arc<TypeOracle>,
}

impl UnitJob {
    pub fn new(name: impl Into<String>, tree: Node, oracle: Arc<TypeOracle>) -> Self {
        Self {
            name: name.into(),
            tree,
            oracle,
        }
    }
}

#[derive(Debug, Clone)]
pub enum UnitStatus {
    Done(RewriteOutcome),
    /// Cancelled before the unit was started
    Skipped,
}

#[derive(Debug, Clone)]
pub struct UnitReport {
    pub name: String,
    pub status: UnitStatus,
}

impl UnitReport {
    pub fn outcome(&self) -> Option<&RewriteOutcome> {
        match &self.status {
            UnitStatus::Done(outcome) => Some(outcome),
            UnitStatus::Skipped => None,
        }
    }
}

/// Per-unit reports in input order plus rule statistics summed over all units
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub units: Vec<UnitReport>,
    pub stats: IndexMap<String, RuleStats>,
    pub applied: usize,
}

impl BatchReport {
    pub fn skipped(&self) -> usize {
        self.units
            .iter()
            .filter(|unit| matches!(unit.status, UnitStatus::Skipped))
            .count()
    }
}

pub fn rewrite_units(
    jobs: Vec<UnitJob>,
    rules: &RuleSet,
    config: &EngineConfig,
    cancel: &AtomicBool,
) -> BatchReport {
    let total = jobs.len();
    if total == 0 {
        return BatchReport::default();
    }

    let (job_tx, job_rx) = unbounded::<(usize, UnitJob)>();
    let (result_tx, result_rx) = unbounded::<(usize, UnitReport)>();
    for entry in jobs.into_iter().enumerate() {
        // the receiver is still held here, so an unbounded send cannot fail
        let _ = job_tx.send(entry);
    }
    drop(job_tx);

    let stats: DashMap<String, RuleStats> = DashMap::new();
    let workers = config.workers.clamp(1, total);

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let stats = &stats;
            scope.spawn(move || {
                for (index, job) in job_rx.iter() {
                    let status = if cancel.load(Ordering::Acquire) {
                        debug!(worker, unit = %job.name, "Cancelled, skipping unit");
                        UnitStatus::Skipped
                    } else {
                        debug!(worker, unit = %job.name, "Rewriting unit");
                        let outcome = RewriteEngine::new(&job.oracle, rules, config).run(job.tree);
                        for (name, unit_stats) in &outcome.stats {
                            stats
                                .entry(name.clone())
                                .or_insert_with(|| RuleStats::new(name.clone()))
                                .merge(unit_stats);
                        }
                        UnitStatus::Done(outcome)
                    };
                    let report = UnitReport {
                        name: job.name,
                        status,
                    };
                    if result_tx.send((index, report)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut slots: Vec<Option<UnitReport>> = (0..total).map(|_| None).collect();
    for (index, report) in result_rx.iter() {
        slots[index] = Some(report);
    }
    let units: Vec<UnitReport> = slots.into_iter().flatten().collect();

    let applied = units
        .iter()
        .filter_map(UnitReport::outcome)
        .map(|outcome| outcome.applied)
        .sum();

    // registration order, like a single-unit outcome
    let mut ordered = IndexMap::new();
    for name in rules.names() {
        if let Some((name, rule_stats)) = stats.remove(name) {
            ordered.insert(name, rule_stats);
        }
    }

    let report = BatchReport {
        units,
        stats: ordered,
        applied,
    };
    info!(
        units = total,
        applied = report.applied,
        skipped = report.skipped(),
        "Batch rewrite complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::ToSource;
    use crate::rewrite::{Pattern, Rule, Template};

    fn negation_rule() -> RuleSet {
        RuleSet::new().with(Rule::new(
            "not-noneSatisfy",
            "",
            Pattern::not(Pattern::method(Pattern::var("x"), "noneSatisfy", vec![Pattern::var("p")])),
            Template::method(Template::var("x"), "anySatisfy", vec![Template::var("p")]),
        ))
    }

    fn jobs(count: usize) -> Vec<UnitJob> {
        let oracle = Arc::new(TypeOracle::standard());
        (0..count)
            .map(|i| {
                let expr = not(method(ident(&format!("xs{i}"), 1), "noneSatisfy", vec![ident("p", 2)]));
                UnitJob::new(format!("Unit{i}.java"), expr, oracle.clone())
            })
            .collect()
    }

    #[test]
    fn test_results_come_back_in_input_order() {
        let config = EngineConfig::default().with_workers(3);
        let report = rewrite_units(jobs(8), &negation_rule(), &config, &AtomicBool::new(false));

        let names: Vec<_> = report.units.iter().map(|u| u.name.clone()).collect();
        let expected: Vec<_> = (0..8).map(|i| format!("Unit{i}.java")).collect();
        assert_eq!(names, expected);
        assert_eq!(report.applied, 8);
        assert_eq!(report.stats["not-noneSatisfy"].rewrites, 8);
        let third = report.units[3].outcome().unwrap();
        assert_eq!(third.tree.to_source(), "xs3.anySatisfy(p)");
    }

    #[test]
    fn test_cancelled_batch_skips_units() {
        let report = rewrite_units(
            jobs(4),
            &negation_rule(),
            &EngineConfig::default(),
            &AtomicBool::new(true),
        );
        assert_eq!(report.units.len(), 4);
        assert_eq!(report.skipped(), 4);
        assert_eq!(report.applied, 0);
    }

    #[test]
    fn test_empty_batch() {
        let report = rewrite_units(Vec::new(), &negation_rule(), &EngineConfig::default(), &AtomicBool::new(false));
        assert!(report.units.is_empty());
    }
}
