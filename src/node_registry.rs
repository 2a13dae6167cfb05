use std::collections::HashMap;

use basedrop::Collector;

use crate::data_loop::DataLoop;
use crate::error::NodeError;
use crate::listener::NodeEvent;
use crate::node::{Node, NodeId};
use crate::properties::Properties;

/// Owns every [`Node`] in a process, assigns ids, and carries out the
/// operations that must touch more than one node at a time: driver
/// reassignment and per-cycle process coordination.
///
/// Grounded on `graph.rs`'s `HashMap<u64, Node>` keyed registry, generalized
/// from a DSP-dependency graph to a node/driver registry.
pub struct NodeRegistry {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
    collector: Collector,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        NodeRegistry {
            nodes: HashMap::new(),
            next_id: 0,
            collector: Collector::new(),
        }
    }

    /// Construct a node and give it a process-unique id immediately — the
    /// same id doubles as `driver_node == self` and, later, as the public
    /// registration id (see `DESIGN.md`).
    pub fn create_node(&mut self, name: impl Into<String>, properties: Properties) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let node = Node::new(id, name.into(), properties, &self.collector);
        self.nodes.insert(id, node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn register(&mut self, id: NodeId, global_props: &mut Properties) -> Result<(), NodeError> {
        self.nodes
            .get_mut(&id)
            .ok_or(NodeError::NotFound)?
            .register(global_props)
    }

    /// Eject a node from the registry: pause it, eject every node it drives
    /// (reparenting them to themselves), and remove it from whatever
    /// driver-graph it's currently a member of.
    pub fn destroy(&mut self, data_loop: &dyn DataLoop, id: NodeId) -> Option<Node> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        if let Some(node) = self.get_mut(id) {
            node.set_active(false);
            node.emit(&NodeEvent::Destroy);
        }

        let driven: Vec<NodeId> = self
            .get(id)
            .map(|n| n.driver_list().iter().copied().filter(|&n| n != id).collect())
            .unwrap_or_default();
        for driven_id in driven {
            let _ = self.set_driver(data_loop, driven_id, None);
        }

        let own_graph = self.get(id).map(|n| n.driver_graph().clone());
        if let Some(graph) = own_graph {
            graph.remove(id);
        }
        let current_driver = self.get(id).map(|n| n.driver_node());
        if let Some(driver_id) = current_driver {
            if driver_id != id {
                self.driver_list_remove(driver_id, id);
            }
        }

        let mut node = self.nodes.remove(&id)?;
        node.emit(&NodeEvent::Free);
        Some(node)
    }

    fn driver_list_remove(&mut self, driver: NodeId, member: NodeId) {
        if let Some(node) = self.nodes.get_mut(&driver) {
            node.driver_list.retain(|&m| m != member);
        }
    }

    fn driver_list_add(&mut self, driver: NodeId, member: NodeId) {
        if let Some(node) = self.nodes.get_mut(&driver) {
            if !node.driver_list.contains(&member) {
                node.driver_list.push(member);
            }
        }
    }

    /// Reassign `node_id`'s driver to `new_driver` (or to itself, if
    /// `None`): synchronous bookkeeping happens immediately; the real-time
    /// driver-graph rewire is deferred onto `data_loop`.
    pub fn set_driver(
        &mut self,
        data_loop: &dyn DataLoop,
        node_id: NodeId,
        new_driver: Option<NodeId>,
    ) -> Result<(), NodeError> {
        let new_driver = new_driver.unwrap_or(node_id);
        let current_driver = self.get(node_id).ok_or(NodeError::NotFound)?.driver_node();
        if current_driver == new_driver {
            return Ok(());
        }

        // group = nodes node_id itself currently drives, other than itself.
        let group: Vec<NodeId> = self
            .get(node_id)
            .unwrap()
            .driver_list()
            .iter()
            .copied()
            .filter(|&n| n != node_id)
            .collect();

        self.driver_list_remove(current_driver, node_id);
        self.driver_list_add(new_driver, node_id);
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.driver_node = new_driver;
        }

        for member in &group {
            self.driver_list_remove(node_id, *member);
            self.driver_list_add(new_driver, *member);
            if let Some(node) = self.nodes.get_mut(member) {
                node.driver_node = new_driver;
            }
            self.emit_driver_changed(*member, new_driver);
        }

        let old_driver_graph = self.get(current_driver).map(|n| n.driver_graph().clone());
        let new_driver_graph = self.get(new_driver).map(|n| n.driver_graph().clone());
        let node_own_graph = self.get(node_id).map(|n| n.driver_graph().clone());
        if let (Some(old_graph), Some(new_graph), Some(own_graph)) =
            (old_driver_graph, new_driver_graph, node_own_graph)
        {
            data_loop.invoke(Box::new(move || {
                old_graph.remove(node_id);
                new_graph.add(node_id);
                for member in own_graph.members() {
                    own_graph.remove(member);
                    new_graph.add(member);
                }
            }));
        }

        self.emit_driver_changed(node_id, new_driver);
        Ok(())
    }

    fn emit_driver_changed(&mut self, node_id: NodeId, new_driver: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.emit(&NodeEvent::DriverChanged(new_driver));
        }
    }

    /// Drive one cycle for `node_id`. If `node.driver` (the node heads a
    /// driver group) and either nothing is pending or it isn't a remote
    /// node, stamp a fresh quantum and trigger every member of its
    /// driver-graph through `trigger`; otherwise just trigger the node
    /// itself. Every node actually triggered this cycle also runs its own
    /// `process`/`event` bookkeeping.
    pub fn on_process(&mut self, node_id: NodeId, now_nsec: u64, mut trigger: impl FnMut(NodeId)) {
        let is_driver_capable = match self.nodes.get(&node_id) {
            Some(n) => n.is_driver_capable(),
            None => return,
        };

        if !is_driver_capable {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.process();
            }
            trigger(node_id);
            return;
        }

        let node = self.nodes.get(&node_id).unwrap();
        let should_run = node.activation().pending == 0 || !node.is_remote();

        if !should_run {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.process();
            }
            trigger(node_id);
            return;
        }

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.stamp_quantum(now_nsec);
        }
        let members = self.nodes.get(&node_id).unwrap().driver_graph().members();
        for member in members {
            if let Some(node) = self.nodes.get_mut(&member) {
                node.process();
            }
            trigger(member);
        }
    }

    pub fn collect_garbage(&mut self) {
        self.collector.collect();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
