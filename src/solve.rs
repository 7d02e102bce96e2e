//! The solver protocol: solution nodes and the proof tree.
//!
//! Every goal produces a solution node. `next_solution` steps the node's
//! state machine and either produces the next solution (an updated
//! substitution set) or reports exhaustion. Nodes retain their iteration
//! state - rule counters, child nodes - between calls, so backtracking is
//! just calling `next_solution` again.
//!
//! Nodes live in a per-query arena indexed by `NodeId`. Parent links are
//! indices into the same arena, which makes cut propagation a simple index
//! walk and guarantees the links cannot outlive the query.

use crate::builtins::Builtin;
use crate::goal::Goal;
use crate::kb::KnowledgeBase;
use crate::subst::SubstitutionSet;
use crate::term::{Complex, Term, VarGenerator};
use crate::unify::unify_complex;
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use crate::trace::trace;

/// A semantic error raised during proof search. These are surfaced as the
/// failure reason of the query, never as a panic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolveError {
    NotGround { op: &'static str, term: String },
    NotNumber { op: &'static str, term: String },
    NotAtom { op: &'static str, term: String },
    WrongArity { op: &'static str, expected: usize, found: usize },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::NotGround { op, term } => {
                write!(f, "{}: argument is not grounded: {}", op, term)
            }
            SolveError::NotNumber { op, term } => {
                write!(f, "{}: not a number: {}", op, term)
            }
            SolveError::NotAtom { op, term } => {
                write!(f, "{}: not an atom: {}", op, term)
            }
            SolveError::WrongArity { op, expected, found } => {
                write!(f, "{}: expected {} argument(s), found {}", op, expected, found)
            }
        }
    }
}

impl std::error::Error for SolveError {}

/// Tracks the execution-time budget of one query.
///
/// The expired flag latches: once the budget is exceeded (or the driver
/// forces expiry), every subsequent check reports true and the knowledge
/// base folds rule counts to zero.
#[derive(Debug)]
pub struct QueryTimer {
    start: Instant,
    budget: Duration,
    expired: AtomicBool,
}

impl QueryTimer {
    pub fn new(budget: Duration) -> QueryTimer {
        QueryTimer { start: Instant::now(), budget, expired: AtomicBool::new(false) }
    }

    /// Has the budget been exceeded?
    pub fn expired(&self) -> bool {
        if self.expired.load(Ordering::Relaxed) {
            return true;
        }
        if self.start.elapsed() > self.budget {
            self.expired.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Latch the expired flag, e.g. when the driver's timer fires.
    pub fn force_expire(&self) {
        self.expired.store(true, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Where print predicates write. The core performs no other I/O.
pub type OutputSink<'a> = Mutex<Box<dyn Write + Send + 'a>>;

/// Wrap a writer as an output sink.
pub fn sink_from<'a, W: Write + Send + 'a>(writer: W) -> OutputSink<'a> {
    Mutex::new(Box::new(writer))
}

/// Per-query state threaded through the solver. The knowledge base is
/// read-only for the duration of the query. The sink's writer lifetime
/// is independent of the borrow, so callers can lend any writer that
/// outlives the query.
pub struct SolveContext<'a, 'w> {
    pub kb: &'a KnowledgeBase,
    pub vars: &'a VarGenerator,
    pub timer: &'a QueryTimer,
    pub out: &'a OutputSink<'w>,
}

/// Index of a solution node in its proof tree.
pub type NodeId = usize;

/// State shared by every node kind.
#[derive(Clone, Copy, Debug)]
struct NodeCommon {
    parent: Option<NodeId>,
    no_backtracking: bool,
}

/// Resolves a complex goal against the knowledge base.
struct ComplexNode {
    common: NodeCommon,
    goal: Complex,
    parent_ss: SubstitutionSet,
    rule_index: usize,
    count: usize,
    child: Option<NodeId>,
}

/// Conjunction: advance the head, fully explore the tail, backtrack.
struct AndNode {
    common: NodeCommon,
    head: NodeId,
    tail_goals: Vec<Goal>,
    tail: Option<NodeId>,
}

/// Disjunction: branches tried left to right, each from the original set.
struct OrNode {
    common: NodeCommon,
    head: NodeId,
    tail_goals: Vec<Goal>,
    tail: Option<NodeId>,
    parent_ss: SubstitutionSet,
}

/// Negation as failure. `parent_ss` doubles as the latch: it is taken on
/// the first call, after which the node always fails.
struct NotNode {
    common: NodeCommon,
    operand: NodeId,
    parent_ss: Option<SubstitutionSet>,
}

struct CutNode {
    common: NodeCommon,
    parent_ss: SubstitutionSet,
}

struct FailNode {
    common: NodeCommon,
}

/// One-shot solver for a built-in predicate.
struct BuiltinNode {
    common: NodeCommon,
    builtin: Builtin,
    parent_ss: SubstitutionSet,
    more: bool,
}

/// Proves the inner goal once and reports the elapsed time.
struct TimeNode {
    common: NodeCommon,
    goal: Complex,
    parent_ss: SubstitutionSet,
    inner: NodeId,
    more: bool,
}

enum SolutionNode {
    Complex(ComplexNode),
    And(AndNode),
    Or(OrNode),
    Not(NotNode),
    Cut(CutNode),
    Fail(FailNode),
    Builtin(BuiltinNode),
    Time(TimeNode),
}

#[derive(Clone, Copy)]
enum NodeKind {
    Complex,
    And,
    Or,
    Not,
    Cut,
    Fail,
    Builtin,
    Time,
}

impl SolutionNode {
    #[cfg(test)]
    fn common(&self) -> &NodeCommon {
        match self {
            SolutionNode::Complex(n) => &n.common,
            SolutionNode::And(n) => &n.common,
            SolutionNode::Or(n) => &n.common,
            SolutionNode::Not(n) => &n.common,
            SolutionNode::Cut(n) => &n.common,
            SolutionNode::Fail(n) => &n.common,
            SolutionNode::Builtin(n) => &n.common,
            SolutionNode::Time(n) => &n.common,
        }
    }

    fn common_mut(&mut self) -> &mut NodeCommon {
        match self {
            SolutionNode::Complex(n) => &mut n.common,
            SolutionNode::And(n) => &mut n.common,
            SolutionNode::Or(n) => &mut n.common,
            SolutionNode::Not(n) => &mut n.common,
            SolutionNode::Cut(n) => &mut n.common,
            SolutionNode::Fail(n) => &mut n.common,
            SolutionNode::Builtin(n) => &mut n.common,
            SolutionNode::Time(n) => &mut n.common,
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            SolutionNode::Complex(_) => NodeKind::Complex,
            SolutionNode::And(_) => NodeKind::And,
            SolutionNode::Or(_) => NodeKind::Or,
            SolutionNode::Not(_) => NodeKind::Not,
            SolutionNode::Cut(_) => NodeKind::Cut,
            SolutionNode::Fail(_) => NodeKind::Fail,
            SolutionNode::Builtin(_) => NodeKind::Builtin,
            SolutionNode::Time(_) => NodeKind::Time,
        }
    }
}

/// The per-query arena of solution nodes.
#[derive(Default)]
pub struct ProofTree {
    nodes: Vec<SolutionNode>,
}

impl ProofTree {
    pub fn new() -> ProofTree {
        ProofTree { nodes: Vec::new() }
    }

    /// Create the root solution node for a goal.
    pub fn root(&mut self, goal: &Goal, ss: SubstitutionSet, ctx: &SolveContext) -> NodeId {
        self.make_node(goal, ss, None, ctx)
    }

    fn push(&mut self, node: SolutionNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Build the solution node for a goal.
    ///
    /// Head operands of And/Or record the operator's parent as their own
    /// parent; tail nodes record the operator itself. A complex node's
    /// parent is always `None`: the rule invocation is a cut boundary, so
    /// the barrier never escapes the clause that contains the cut.
    fn make_node(
        &mut self,
        goal: &Goal,
        ss: SubstitutionSet,
        parent: Option<NodeId>,
        ctx: &SolveContext,
    ) -> NodeId {
        match goal {
            Goal::Complex(c) => {
                let count = ctx.kb.rule_count(c, ctx.timer);
                self.push(SolutionNode::Complex(ComplexNode {
                    common: NodeCommon { parent: None, no_backtracking: false },
                    goal: c.clone(),
                    parent_ss: ss,
                    rule_index: 0,
                    count,
                    child: None,
                }))
            }
            Goal::And(goals) => match goals.first() {
                None => self.push(SolutionNode::Fail(FailNode {
                    common: NodeCommon { parent, no_backtracking: false },
                })),
                Some(head_goal) => {
                    let head = self.make_node(head_goal, ss, parent, ctx);
                    self.push(SolutionNode::And(AndNode {
                        common: NodeCommon { parent, no_backtracking: false },
                        head,
                        tail_goals: goals[1..].to_vec(),
                        tail: None,
                    }))
                }
            },
            Goal::Or(goals) => match goals.first() {
                None => self.push(SolutionNode::Fail(FailNode {
                    common: NodeCommon { parent, no_backtracking: false },
                })),
                Some(head_goal) => {
                    let head = self.make_node(head_goal, ss.clone(), parent, ctx);
                    self.push(SolutionNode::Or(OrNode {
                        common: NodeCommon { parent, no_backtracking: false },
                        head,
                        tail_goals: goals[1..].to_vec(),
                        tail: None,
                        parent_ss: ss,
                    }))
                }
            },
            Goal::Not(inner) => {
                let operand = self.make_node(inner, ss.clone(), parent, ctx);
                self.push(SolutionNode::Not(NotNode {
                    common: NodeCommon { parent, no_backtracking: false },
                    operand,
                    parent_ss: Some(ss),
                }))
            }
            Goal::Time(c) => {
                let inner = self.make_node(&Goal::Complex(c.clone()), ss.clone(), parent, ctx);
                self.push(SolutionNode::Time(TimeNode {
                    common: NodeCommon { parent, no_backtracking: false },
                    goal: c.clone(),
                    parent_ss: ss,
                    inner,
                    more: true,
                }))
            }
            Goal::Cut => self.push(SolutionNode::Cut(CutNode {
                common: NodeCommon { parent, no_backtracking: false },
                parent_ss: ss,
            })),
            Goal::Fail => self.push(SolutionNode::Fail(FailNode {
                common: NodeCommon { parent, no_backtracking: false },
            })),
            Goal::Builtin(b) => self.push(SolutionNode::Builtin(BuiltinNode {
                common: NodeCommon { parent, no_backtracking: false },
                builtin: b.clone(),
                parent_ss: ss,
                more: true,
            })),
        }
    }

    /// Produce the next solution of the node, or report exhaustion.
    /// Re-entrant: nodes keep their iteration state across calls.
    pub fn next_solution(
        &mut self,
        id: NodeId,
        ctx: &SolveContext,
    ) -> Result<Option<SubstitutionSet>, SolveError> {
        match self.nodes[id].kind() {
            NodeKind::Complex => self.next_complex(id, ctx),
            NodeKind::And => self.next_and(id, ctx),
            NodeKind::Or => self.next_or(id, ctx),
            NodeKind::Not => self.next_not(id, ctx),
            NodeKind::Cut => self.next_cut(id),
            NodeKind::Fail => Ok(None),
            NodeKind::Builtin => self.next_builtin(id, ctx),
            NodeKind::Time => self.next_time(id, ctx),
        }
    }

    /// Latch the no-backtracking flag on the node and all its ancestors.
    /// A complex node has no parent link, so the walk stops at the rule
    /// boundary.
    fn cut_barrier(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(n) = current {
            let common = self.nodes[n].common_mut();
            common.no_backtracking = true;
            current = common.parent;
        }
    }

    fn complex_mut(&mut self, id: NodeId) -> &mut ComplexNode {
        match &mut self.nodes[id] {
            SolutionNode::Complex(n) => n,
            _ => unreachable!("node {} is not a complex node", id),
        }
    }

    fn next_complex(
        &mut self,
        id: NodeId,
        ctx: &SolveContext,
    ) -> Result<Option<SubstitutionSet>, SolveError> {
        let (no_bt, child, goal, parent_ss, count) = {
            let SolutionNode::Complex(n) = &self.nodes[id] else {
                unreachable!("expected complex node");
            };
            (n.common.no_backtracking, n.child, n.goal.clone(), n.parent_ss.clone(), n.count)
        };
        if no_bt {
            return Ok(None);
        }

        if let Some(child_id) = child {
            if let Some(solution) = self.next_solution(child_id, ctx)? {
                return Ok(Some(solution));
            }
        }
        self.complex_mut(id).child = None;

        loop {
            // A cut fired below may have latched this node mid-loop.
            let index = {
                let n = self.complex_mut(id);
                if n.common.no_backtracking || n.rule_index >= count {
                    return Ok(None);
                }
                n.rule_index += 1;
                n.rule_index - 1
            };
            let Some(rule) = ctx.kb.get_rule(&goal, index, ctx.vars) else {
                return Ok(None);
            };

            if let Some(head_ss) = unify_complex(&rule.head, &goal, &parent_ss)? {
                match rule.body {
                    None => return Ok(Some(head_ss)),
                    Some(body) => {
                        let child_id = self.make_node(&body, head_ss, Some(id), ctx);
                        self.complex_mut(id).child = Some(child_id);
                        if let Some(solution) = self.next_solution(child_id, ctx)? {
                            return Ok(Some(solution));
                        }
                    }
                }
            }
        }
    }

    fn next_and(
        &mut self,
        id: NodeId,
        ctx: &SolveContext,
    ) -> Result<Option<SubstitutionSet>, SolveError> {
        let (no_bt, tail, head, tail_goals) = {
            let SolutionNode::And(n) = &self.nodes[id] else {
                unreachable!("expected and node");
            };
            (n.common.no_backtracking, n.tail, n.head, n.tail_goals.clone())
        };
        if no_bt {
            return Ok(None);
        }

        if let Some(tail_id) = tail {
            if let Some(solution) = self.next_solution(tail_id, ctx)? {
                return Ok(Some(solution));
            }
        }

        loop {
            let Some(head_solution) = self.next_solution(head, ctx)? else {
                return Ok(None);
            };
            if tail_goals.is_empty() {
                return Ok(Some(head_solution));
            }
            // The tail is a fresh conjunction over the remaining operands,
            // rooted at the head's solution.
            let tail_id =
                self.make_node(&Goal::And(tail_goals.clone()), head_solution, Some(id), ctx);
            match &mut self.nodes[id] {
                SolutionNode::And(n) => n.tail = Some(tail_id),
                _ => unreachable!("expected and node"),
            }
            if let Some(solution) = self.next_solution(tail_id, ctx)? {
                return Ok(Some(solution));
            }
        }
    }

    fn next_or(
        &mut self,
        id: NodeId,
        ctx: &SolveContext,
    ) -> Result<Option<SubstitutionSet>, SolveError> {
        let (no_bt, tail, head, tail_goals, parent_ss) = {
            let SolutionNode::Or(n) = &self.nodes[id] else {
                unreachable!("expected or node");
            };
            (
                n.common.no_backtracking,
                n.tail,
                n.head,
                n.tail_goals.clone(),
                n.parent_ss.clone(),
            )
        };
        if no_bt {
            return Ok(None);
        }

        if let Some(tail_id) = tail {
            return self.next_solution(tail_id, ctx);
        }

        let head_solution = self.next_solution(head, ctx)?;
        if head_solution.is_some() || tail_goals.is_empty() {
            return Ok(head_solution);
        }

        // Remaining branches start from the original parent set.
        let tail_id = self.make_node(&Goal::Or(tail_goals), parent_ss, Some(id), ctx);
        match &mut self.nodes[id] {
            SolutionNode::Or(n) => n.tail = Some(tail_id),
            _ => unreachable!("expected or node"),
        }
        self.next_solution(tail_id, ctx)
    }

    fn next_not(
        &mut self,
        id: NodeId,
        ctx: &SolveContext,
    ) -> Result<Option<SubstitutionSet>, SolveError> {
        let (no_bt, operand, parent_ss) = {
            let SolutionNode::Not(n) = &self.nodes[id] else {
                unreachable!("expected not node");
            };
            (n.common.no_backtracking, n.operand, n.parent_ss.clone())
        };
        if no_bt {
            return Ok(None);
        }
        let Some(parent_ss) = parent_ss else {
            return Ok(None);
        };

        let found = self.next_solution(operand, ctx)?.is_some();
        match &mut self.nodes[id] {
            SolutionNode::Not(n) => n.parent_ss = None,
            _ => unreachable!("expected not node"),
        }
        if found {
            // The operand is provable, so the negation fails for good.
            Ok(None)
        } else {
            // Succeed once with the parent set unchanged; never binds.
            Ok(Some(parent_ss))
        }
    }

    fn next_cut(&mut self, id: NodeId) -> Result<Option<SubstitutionSet>, SolveError> {
        let (no_bt, parent_ss) = {
            let SolutionNode::Cut(n) = &self.nodes[id] else {
                unreachable!("expected cut node");
            };
            (n.common.no_backtracking, n.parent_ss.clone())
        };
        if no_bt {
            return Ok(None);
        }
        #[cfg(feature = "tracing")]
        trace!(node = id, "cut_barrier");
        self.cut_barrier(id);
        Ok(Some(parent_ss))
    }

    fn next_builtin(
        &mut self,
        id: NodeId,
        ctx: &SolveContext,
    ) -> Result<Option<SubstitutionSet>, SolveError> {
        let (no_bt, more, builtin, parent_ss) = {
            let SolutionNode::Builtin(n) = &self.nodes[id] else {
                unreachable!("expected builtin node");
            };
            (n.common.no_backtracking, n.more, n.builtin.clone(), n.parent_ss.clone())
        };
        if no_bt || !more {
            return Ok(None);
        }
        match &mut self.nodes[id] {
            SolutionNode::Builtin(n) => n.more = false,
            _ => unreachable!("expected builtin node"),
        }
        builtin.solve(&parent_ss, ctx)
    }

    fn next_time(
        &mut self,
        id: NodeId,
        ctx: &SolveContext,
    ) -> Result<Option<SubstitutionSet>, SolveError> {
        let (no_bt, more, inner, goal, parent_ss) = {
            let SolutionNode::Time(n) = &self.nodes[id] else {
                unreachable!("expected time node");
            };
            (n.common.no_backtracking, n.more, n.inner, n.goal.clone(), n.parent_ss.clone())
        };
        if no_bt || !more {
            return Ok(None);
        }
        match &mut self.nodes[id] {
            SolutionNode::Time(n) => n.more = false,
            _ => unreachable!("expected time node"),
        }

        let mut unground = Vec::new();
        goal.collect_variables(&mut unground);
        for v in unground {
            if !parent_ss.is_ground_variable(&v) {
                let mut out = ctx.out.lock();
                let _ = writeln!(out, "Time: variable {} is not grounded.", Term::Var(v));
            }
        }

        let start = Instant::now();
        let solution = self.next_solution(inner, ctx)?;
        let elapsed = start.elapsed().as_millis();
        {
            let mut out = ctx.out.lock();
            let _ = writeln!(out, "Elapsed time for {}: {} milliseconds", goal, elapsed);
        }
        Ok(solution)
    }

    /// Number of nodes created so far, for diagnostics.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[cfg(test)]
    fn no_backtracking(&self, id: NodeId) -> bool {
        self.nodes[id].common().no_backtracking
    }
}
