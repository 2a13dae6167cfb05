use std::sync::{Arc, Mutex};

use crate::node::NodeId;

/// The set of graph-nodes one driver runs together in a single cycle.
///
/// Every [`crate::node::Node`] owns one of these, used only while it is
/// actually heading a group; membership is mutated exclusively on the
/// data-loop thread, per the real-time discipline this crate's callers are
/// expected to uphold. The handle itself is cheap to clone and `Send`, so a
/// deferred [`crate::data_loop::DataLoop::invoke`] closure can carry clones
/// of the graphs it needs to touch without borrowing a whole node registry.
#[derive(Clone, Default)]
pub struct DriverGraph(Arc<Mutex<Vec<NodeId>>>);

impl DriverGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: NodeId) {
        let mut members = self.0.lock().unwrap();
        if !members.contains(&id) {
            members.push(id);
        }
    }

    pub fn remove(&self, id: NodeId) {
        self.0.lock().unwrap().retain(|&m| m != id);
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.lock().unwrap().contains(&id)
    }

    /// A snapshot of the current membership, safe to iterate while other
    /// threads mutate the graph (a new snapshot is what the next cycle
    /// sees, not a half-updated one).
    pub fn members(&self) -> Vec<NodeId> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
