// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Multi-agent coordination: shared budget pools and halt cascades.
//!
//! [`BudgetPool`] is a centralized ledger dispensing effort and risk to
//! member kernels; [`CascadeDetector`] propagates preventive halts along a
//! directed neighbor graph when any member halts. Both are serialized by a
//! single mutex each — they are the only cross-kernel mutable state in the
//! system.
//!
//! Cascade propagation walks the (possibly cyclic) graph with an explicit
//! visited set, so it is `O(V + E)` and each agent is marked at most once.

use std::sync::Mutex;

use hashbrown::{HashMap, HashSet};

use crate::kernel::Kernel;
use crate::types::{Decision, FailureKind, Signals};

// ---------------------------------------------------------------------------
// BudgetPool
// ---------------------------------------------------------------------------

/// The resource kinds a pool dispenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolResource {
    /// Shared fuel for continued action.
    Effort,
    /// Shared risk allowance.
    Risk,
}

#[derive(Debug, Default)]
struct PoolLedger {
    effort_capacity: f64,
    risk_capacity: f64,
    members: HashSet<String>,
    draws: HashMap<(String, PoolResource), f64>,
}

/// Centralized effort/risk ledger shared by a group of kernels.
///
/// [`BudgetPool::request`] atomically checks and debits capacity; a denied
/// request leaves the ledger untouched.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::{BudgetPool, PoolResource};
///
/// let pool = BudgetPool::new("team-a", 1.0, 0.5);
/// pool.join("agent-001");
///
/// assert!(pool.request("agent-001", PoolResource::Effort, 0.6));
/// assert!(!pool.request("agent-001", PoolResource::Effort, 0.6));
/// assert_eq!(pool.drawn("agent-001", PoolResource::Effort), 0.6);
/// ```
pub struct BudgetPool {
    pool_id: String,
    ledger: Mutex<PoolLedger>,
}

impl BudgetPool {
    /// Create a pool with the given total capacities.
    pub fn new(pool_id: &str, effort_capacity: f64, risk_capacity: f64) -> Self {
        Self {
            pool_id: pool_id.into(),
            ledger: Mutex::new(PoolLedger {
                effort_capacity,
                risk_capacity,
                members: HashSet::new(),
                draws: HashMap::new(),
            }),
        }
    }

    /// Identifier of this pool.
    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    /// Register a member agent.
    pub fn join(&self, agent_id: &str) {
        let mut ledger = self.ledger.lock().expect("pool lock poisoned");
        ledger.members.insert(agent_id.into());
    }

    /// `true` if the agent is a registered member.
    pub fn is_member(&self, agent_id: &str) -> bool {
        let ledger = self.ledger.lock().expect("pool lock poisoned");
        ledger.members.contains(agent_id)
    }

    /// Atomically draw `amount` of `resource` for `agent_id`.
    ///
    /// Grants and debits when capacity covers the amount; otherwise denies
    /// and changes nothing. A zero draw is always granted.
    pub fn request(&self, agent_id: &str, resource: PoolResource, amount: f64) -> bool {
        let mut ledger = self.ledger.lock().expect("pool lock poisoned");
        let capacity = match resource {
            PoolResource::Effort => &mut ledger.effort_capacity,
            PoolResource::Risk => &mut ledger.risk_capacity,
        };
        if *capacity < amount {
            return false;
        }
        *capacity -= amount;
        *ledger
            .draws
            .entry((agent_id.to_owned(), resource))
            .or_insert(0.0) += amount;
        true
    }

    /// Total amount of `resource` drawn by `agent_id` so far.
    pub fn drawn(&self, agent_id: &str, resource: PoolResource) -> f64 {
        let ledger = self.ledger.lock().expect("pool lock poisoned");
        ledger
            .draws
            .get(&(agent_id.to_owned(), resource))
            .copied()
            .unwrap_or(0.0)
    }

    /// Remaining capacity of `resource`.
    pub fn remaining(&self, resource: PoolResource) -> f64 {
        let ledger = self.ledger.lock().expect("pool lock poisoned");
        match resource {
            PoolResource::Effort => ledger.effort_capacity,
            PoolResource::Risk => ledger.risk_capacity,
        }
    }
}

// ---------------------------------------------------------------------------
// CascadeDetector
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CascadeGraph {
    neighbors: HashMap<String, HashSet<String>>,
    pending: HashMap<String, String>,
    halted: HashSet<String>,
}

/// Tracks the neighbor graph and propagates preventive halts.
///
/// When a member halts, every agent reachable from it is marked with a
/// pending halt reason `"cascade from <agent>:<failure>"`. An agent's next
/// step resolves immediately to HALT with failure `EXTERNAL`. Marking is
/// idempotent: an agent already halted or already pending is never re-marked.
pub struct CascadeDetector {
    graph: Mutex<CascadeGraph>,
}

impl Default for CascadeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeDetector {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: Mutex::new(CascadeGraph::default()),
        }
    }

    /// Add a directed edge: a halt of `from` cascades to `to`.
    pub fn link(&self, from: &str, to: &str) {
        let mut graph = self.graph.lock().expect("cascade lock poisoned");
        graph
            .neighbors
            .entry(from.into())
            .or_default()
            .insert(to.into());
    }

    /// Record that `agent_id` halted and mark every reachable neighbor.
    pub fn notify_halt(&self, agent_id: &str, failure: FailureKind) {
        let mut graph = self.graph.lock().expect("cascade lock poisoned");
        if !graph.halted.insert(agent_id.into()) {
            return;
        }

        // Breadth-first walk with explicit visited marking; cycles are fine.
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(agent_id.into());
        let mut queue: Vec<String> = graph
            .neighbors
            .get(agent_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        let reason = format!("cascade from {agent_id}:{failure}");

        while let Some(current) = queue.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if !graph.halted.contains(&current) {
                graph
                    .pending
                    .entry(current.clone())
                    .or_insert_with(|| reason.clone());
            }
            if let Some(next) = graph.neighbors.get(&current) {
                queue.extend(next.iter().cloned());
            }
        }
    }

    /// Take the pending preventive halt for `agent_id`, if any.
    pub fn take_pending(&self, agent_id: &str) -> Option<String> {
        let mut graph = self.graph.lock().expect("cascade lock poisoned");
        graph.pending.remove(agent_id)
    }

    /// `true` if a preventive halt is queued for `agent_id`.
    pub fn has_pending(&self, agent_id: &str) -> bool {
        let graph = self.graph.lock().expect("cascade lock poisoned");
        graph.pending.contains_key(agent_id)
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Couples a shared [`BudgetPool`] and a [`CascadeDetector`] around member
/// kernels.
///
/// [`Coordinator::step_member`] is the coordinated replacement for
/// [`Kernel::step`]:
///
/// 1. a pending cascade resolves immediately to an `EXTERNAL` halt;
/// 2. pool pre-flight — an effort denial halts with `EXHAUSTION`, a risk
///    denial with `OVERRISK`;
/// 3. otherwise a normal kernel step runs;
/// 4. any halt is fed back into the detector.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::{Coordinator, Kernel, Profile, Signals};
///
/// let coordinator = Coordinator::new("team-a", 10.0, 5.0);
/// let upstream = Kernel::new("agent-a", Profile::balanced()).unwrap();
/// let mut downstream = Kernel::new("agent-b", Profile::balanced()).unwrap();
/// coordinator.register(&upstream);
/// coordinator.register(&downstream);
/// coordinator.cascade().link("agent-a", "agent-b");
///
/// // A halt of agent-a preemptively halts agent-b on its next step.
/// coordinator.cascade().notify_halt("agent-a", aumos_governor_core::FailureKind::Overrisk);
/// let decision = coordinator.step_member(&mut downstream, Signals::new(0.9, 0.0, 0.0));
/// assert!(decision.halted);
/// ```
pub struct Coordinator {
    pool: BudgetPool,
    cascade: CascadeDetector,
}

impl Coordinator {
    /// Create a coordinator with a fresh pool and empty cascade graph.
    pub fn new(pool_id: &str, effort_capacity: f64, risk_capacity: f64) -> Self {
        Self {
            pool: BudgetPool::new(pool_id, effort_capacity, risk_capacity),
            cascade: CascadeDetector::new(),
        }
    }

    /// Register a kernel as a pool member.
    pub fn register(&self, kernel: &Kernel) {
        self.pool.join(kernel.agent_id());
    }

    /// The shared pool.
    pub fn pool(&self) -> &BudgetPool {
        &self.pool
    }

    /// The cascade detector.
    pub fn cascade(&self) -> &CascadeDetector {
        &self.cascade
    }

    /// Drive one coordinated step for a member kernel.
    pub fn step_member(&self, kernel: &mut Kernel, signals: Signals) -> Decision {
        if let Some(terminal) = kernel.terminal_decision() {
            return terminal.clone();
        }

        let agent_id = kernel.agent_id().to_owned();

        let decision = if let Some(reason) = self.cascade.take_pending(&agent_id) {
            kernel.preempt(FailureKind::External, reason)
        } else {
            let (effort_draw, risk_draw) = kernel.project_draws(signals);
            if !self.pool.request(&agent_id, PoolResource::Effort, effort_draw) {
                kernel.preempt(
                    FailureKind::Exhaustion,
                    format!(
                        "shared pool \"{}\" denied effort draw {:.4}",
                        self.pool.pool_id(),
                        effort_draw
                    ),
                )
            } else if !self.pool.request(&agent_id, PoolResource::Risk, risk_draw) {
                kernel.preempt(
                    FailureKind::Overrisk,
                    format!(
                        "shared pool \"{}\" denied risk draw {:.4}",
                        self.pool.pool_id(),
                        risk_draw
                    ),
                )
            } else {
                kernel.step(signals)
            }
        };

        if decision.halted {
            let failure = decision.failure.unwrap_or(FailureKind::External);
            self.cascade.notify_halt(&agent_id, failure);
        }
        decision
    }
}
