use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::server::{Request, Response};

/// A pre-handler check attached to a route.
///
/// `handle` returns `true` to let the request continue to the next gate (or
/// the handler). Returning `false` halts the chain: the gate is expected to
/// have written its own status and body into `res` before doing so.
/// Passing gates may also decorate `res`, e.g. with headers.
pub trait Gate: Send + Sync {
    fn handle(&self, req: &Request, res: &mut Response) -> bool;

    /// Name used in logs and route dumps.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

pub type SharedGate = Arc<dyn Gate>;

/// Result of running a [`Chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every gate returned `true`.
    Proceed,
    /// The gate at `index` returned `false`; nothing after it ran.
    Halted { index: usize, gate: String },
}

/// Ordered, flattened list of gates.
///
/// Reusable gate lists are combined with [`Chain::append`] before they are
/// attached to a route, so the route always sees a single ordered list.
#[derive(Clone, Default)]
pub struct Chain {
    gates: Vec<SharedGate>,
}

impl Chain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one gate.
    #[must_use]
    pub fn with(mut self, gate: SharedGate) -> Self {
        self.gates.push(gate);
        self
    }

    /// Append every gate of `other`, after the ones already present.
    #[must_use]
    pub fn append(mut self, other: &Chain) -> Self {
        self.gates.extend(other.gates.iter().cloned());
        self
    }

    pub fn push(&mut self, gate: SharedGate) {
        self.gates.push(gate);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    /// Run the gates in order, stopping at the first one that returns `false`.
    pub fn run(&self, req: &Request, res: &mut Response) -> ChainOutcome {
        for (index, gate) in self.gates.iter().enumerate() {
            if !gate.handle(req, res) {
                debug!(
                    request_id = %req.request_id(),
                    gate_index = index,
                    gate = gate.name(),
                    status = res.status(),
                    "Gate halted request"
                );
                return ChainOutcome::Halted {
                    index,
                    gate: gate.name().to_string(),
                };
            }
        }
        ChainOutcome::Proceed
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FromIterator<SharedGate> for Chain {
    fn from_iter<I: IntoIterator<Item = SharedGate>>(iter: I) -> Self {
        Self {
            gates: iter.into_iter().collect(),
        }
    }
}
