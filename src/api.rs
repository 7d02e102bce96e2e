//! The query driver: top-level solve / solve-all with a time budget.
//!
//! A query runs on a dedicated worker thread while the caller races the
//! result channel against the execution-time budget. When the budget is
//! exceeded the shared timer is expired; the knowledge base then reports
//! zero rules at the next probe and the proof tree unwinds cleanly. The
//! worker gets a large stack reservation because proof depth is bounded
//! only by the time budget; the reservation is virtual and committed one
//! page at a time.

use crate::goal::Goal;
use crate::kb::KnowledgeBase;
use crate::solve::{sink_from, OutputSink, ProofTree, QueryTimer, SolveContext, SolveError};
use crate::subst::SubstitutionSet;
use crate::term::{Term, VarGenerator, VarMap};
use std::fmt;
use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const SOLVE_STACK_BYTES: usize = 512 * 1024 * 1024;

/// Options for a single query.
#[derive(Clone, Debug)]
pub struct SolveOptions {
    /// Execution-time budget for the whole query.
    pub max_time: Duration,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions { max_time: Duration::from_millis(1000) }
    }
}

impl SolveOptions {
    pub fn with_max_time(max_time: Duration) -> SolveOptions {
        SolveOptions { max_time }
    }
}

/// Why a query stopped. `None` means it succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// At least one solution was found.
    None,
    /// The search completed without a solution.
    No,
    /// The execution-time budget was exceeded.
    Timeout,
    /// A semantic error aborted the search.
    Error(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::None => Ok(()),
            Failure::No => write!(f, "No"),
            Failure::Timeout => write!(f, "Time out."),
            Failure::Error(message) => write!(f, "{}", message),
        }
    }
}

/// One solution of a query: the scoped goal the proof ran against, the
/// goal with bindings substituted in, and the binding set itself.
#[derive(Clone, Debug)]
pub struct Solution {
    /// The query goal after variable freshening; its variable ids index
    /// into `bindings`.
    pub goal: Goal,
    pub resolved: Goal,
    pub bindings: SubstitutionSet,
}

impl Solution {
    /// Format this solution's variable bindings, e.g. `$X = Harold`.
    pub fn format(&self) -> String {
        format_solution(&self.goal, &self.bindings)
    }
}

/// Find the first solution for the goal. Output predicates write to the
/// process's stdout.
pub fn solve(
    goal: &Goal,
    kb: &KnowledgeBase,
    ss: &SubstitutionSet,
) -> (Option<Solution>, Failure) {
    solve_with(goal, kb, ss, &SolveOptions::default())
}

/// Find the first solution, with explicit options.
pub fn solve_with(
    goal: &Goal,
    kb: &KnowledgeBase,
    ss: &SubstitutionSet,
    options: &SolveOptions,
) -> (Option<Solution>, Failure) {
    let out = sink_from(io::stdout());
    solve_into(goal, kb, ss, options, &out)
}

/// Find the first solution, writing any output to the given sink.
pub fn solve_into(
    goal: &Goal,
    kb: &KnowledgeBase,
    ss: &SubstitutionSet,
    options: &SolveOptions,
    out: &OutputSink,
) -> (Option<Solution>, Failure) {
    let (mut solutions, failure) = run_query(goal, kb, ss, options, out, false);
    (solutions.pop(), failure)
}

/// Find all solutions for the goal. Output predicates write to stdout.
pub fn solve_all(
    goal: &Goal,
    kb: &KnowledgeBase,
    ss: &SubstitutionSet,
) -> (Vec<Solution>, Failure) {
    solve_all_with(goal, kb, ss, &SolveOptions::default())
}

/// Find all solutions, with explicit options.
pub fn solve_all_with(
    goal: &Goal,
    kb: &KnowledgeBase,
    ss: &SubstitutionSet,
    options: &SolveOptions,
) -> (Vec<Solution>, Failure) {
    let out = sink_from(io::stdout());
    solve_all_into(goal, kb, ss, options, &out)
}

/// Find all solutions, writing any output to the given sink. On
/// time-out the solutions found so far are returned alongside the
/// failure reason.
pub fn solve_all_into(
    goal: &Goal,
    kb: &KnowledgeBase,
    ss: &SubstitutionSet,
    options: &SolveOptions,
    out: &OutputSink,
) -> (Vec<Solution>, Failure) {
    run_query(goal, kb, ss, options, out, true)
}

/// Run the pull loop on a worker thread, racing the time budget.
fn run_query(
    goal: &Goal,
    kb: &KnowledgeBase,
    ss: &SubstitutionSet,
    options: &SolveOptions,
    out: &OutputSink,
    want_all: bool,
) -> (Vec<Solution>, Failure) {
    // Variable ids index the substitution set, so the generator restarts
    // at every query to keep the set small.
    let gen = VarGenerator::new();
    let goal = goal.recreate_variables(&mut VarMap::default(), &gen);
    let timer = QueryTimer::new(options.max_time);
    let (tx, rx) = mpsc::channel::<Result<Vec<Solution>, SolveError>>();

    let (outcome, timed_out) = thread::scope(|scope| {
        let worker_goal = &goal;
        let worker_ss = ss.clone();
        let spawned = thread::Builder::new()
            .name("suiron-solve".to_string())
            .stack_size(SOLVE_STACK_BYTES)
            .spawn_scoped(scope, {
                let gen = &gen;
                let timer = &timer;
                move || {
                    let ctx = SolveContext { kb, vars: gen, timer, out };
                    let mut tree = ProofTree::new();
                    let root = tree.root(worker_goal, worker_ss, &ctx);
                    let mut found = Vec::new();
                    let outcome = loop {
                        match tree.next_solution(root, &ctx) {
                            Ok(Some(bindings)) => {
                                let resolved = worker_goal.replace_variables(&bindings);
                                found.push(Solution {
                                    goal: worker_goal.clone(),
                                    resolved,
                                    bindings,
                                });
                                if !want_all {
                                    break Ok(found);
                                }
                            }
                            Ok(None) => break Ok(found),
                            Err(err) => break Err(err),
                        }
                    };
                    let _ = tx.send(outcome);
                }
            });
        if spawned.is_err() {
            return (Ok(Vec::new()), false);
        }

        match rx.recv_timeout(options.max_time) {
            Ok(outcome) => (outcome, false),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // Expire the timer; the worker sees it at the next rule
                // count probe and unwinds.
                timer.force_expire();
                let outcome = rx.recv().unwrap_or_else(|_| Ok(Vec::new()));
                (outcome, true)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => (Ok(Vec::new()), false),
        }
    });

    match outcome {
        Err(err) => (Vec::new(), Failure::Error(err.to_string())),
        Ok(solutions) => {
            let failure = if timed_out {
                Failure::Timeout
            } else if solutions.is_empty() {
                Failure::No
            } else {
                Failure::None
            };
            (solutions, failure)
        }
    }
}

/// Format the variable bindings of a solution, e.g. `$X = Harold, $Y = 3`.
/// A goal without variables formats as the resolved goal itself.
pub fn format_solution(goal: &Goal, ss: &SubstitutionSet) -> String {
    let mut vars = Vec::new();
    goal.collect_variables(&mut vars);
    if vars.is_empty() {
        return goal.replace_variables(ss).to_string();
    }
    let mut out = String::new();
    for (n, v) in vars.iter().enumerate() {
        if n != 0 {
            out.push_str(", ");
        }
        let resolved = Term::Var(*v).replace_variables(ss);
        out.push_str(&format!("{} = {}", v.name, resolved));
    }
    out
}
