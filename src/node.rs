use basedrop::{Collector, Handle, Shared};

use crate::error::NodeError;
use crate::listener::{ListenerList, NodeEvent};
use crate::port::{Direction, Link, Port, PortId, PortTable};
use crate::properties::{self, Properties};
use crate::quantum::{Activation, Clock, Quantum};
use crate::rt_graph::DriverGraph;
use crate::work_queue::SeqQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u64);

/// Mirrors `node.c`'s `enum pw_node_state`, including `Error`'s position
/// before `Creating` in the ordinal used by the pause-no-op check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Error,
    Creating,
    Suspended,
    Idle,
    Running,
}

impl NodeState {
    fn rank(self) -> i8 {
        match self {
            NodeState::Error => -1,
            NodeState::Creating => 0,
            NodeState::Suspended => 1,
            NodeState::Idle => 2,
            NodeState::Running => 3,
        }
    }
}

bitflags::bitflags! {
    pub struct ChangeMask: u32 {
        const STATE = 0x1;
        const INPUT_PORTS = 0x2;
        const OUTPUT_PORTS = 0x4;
        const PROPS = 0x8;
    }
}

/// The command a node's implementation is asked to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Start,
}

/// What sending a [`Command`] to the implementation resulted in.
#[derive(Debug, Clone, Copy)]
pub enum CommandOutcome {
    /// Completed synchronously; negative values are error codes.
    Done(i32),
    /// Completion will arrive later via [`Node::on_done`], keyed by this
    /// sequence number.
    Async(u32),
}

/// The external interface a [`Node`] drives: the concrete processing
/// implementation (codec, DSP graph node, ...) it wraps.
///
/// Modeling the implementation itself is out of scope; this is only the
/// coordination surface `Node` needs against it.
pub trait NodeImplementation {
    fn port_counts(&self) -> (u32, u32, u32, u32) {
        (0, 0, 0, 0)
    }

    /// The ids this implementation currently reports for `direction`,
    /// ascending and unique.
    fn port_ids(&self, direction: Direction) -> Vec<PortId>;

    fn send_command(&mut self, command: Command) -> CommandOutcome {
        let _ = command;
        CommandOutcome::Done(0)
    }

    fn unset_format(&mut self, direction: Direction, port: PortId) -> Result<(), i32> {
        let _ = (direction, port);
        Ok(())
    }

    /// Write the next parameter for `(param_id, index)` into `scratch`,
    /// returning the number of bytes written, or `None` if `index` is past
    /// the last one.
    fn enum_params(&mut self, param_id: u32, index: u32, scratch: &mut [u8]) -> Option<usize> {
        let _ = (param_id, index, scratch);
        None
    }

    /// Whether a generic, payload-free event is pending for this cycle.
    /// Polled once per process callback.
    fn poll_event(&mut self) -> bool {
        false
    }
}

/// No ports, every command completes immediately. The default
/// implementation a freshly constructed node wraps.
#[derive(Default)]
pub struct NullImplementation;

impl NodeImplementation for NullImplementation {
    fn port_ids(&self, _direction: Direction) -> Vec<PortId> {
        Vec::new()
    }
}

#[derive(Debug, Clone)]
pub struct Info {
    pub id: NodeId,
    pub state: NodeState,
    pub error: Option<String>,
    pub name: String,
    pub max_input_ports: u32,
    pub max_output_ports: u32,
    pub n_input_ports: u32,
    pub n_output_ports: u32,
    pub props: Properties,
    pub change_mask: ChangeMask,
}

pub(crate) struct RtState {
    pub driver_graph: DriverGraph,
    pub activation: Activation,
    pub quantum: Shared<Quantum>,
    pub clock: Option<Clock>,
    /// Driver-local cycle counter, advanced by `quantum.size` each time
    /// this node stamps a fresh quantum without an attached clock.
    pub next_position: u64,
    pub handle: Handle,
}

/// The node-lifecycle and driver-linkage core described by this crate.
///
/// Most operations here are main-domain only; only [`RtState`] (reachable
/// through [`Node::driver_graph`]/[`Node::quantum`]) is meant to be read or
/// mutated from the data-loop.
pub struct Node {
    pub(crate) id: NodeId,
    name: Shared<String>,
    properties: Properties,
    info: Info,
    active: bool,
    enabled: bool,
    registered: bool,
    driver_capable: bool,
    remote: bool,
    pub(crate) pause_on_idle: bool,
    pub(crate) driver_node: NodeId,
    pub(crate) driver_list: Vec<NodeId>,
    input_ports: PortTable,
    output_ports: PortTable,
    implementation: Box<dyn NodeImplementation>,
    listeners: ListenerList,
    resources: Vec<(ResourceId, Box<dyn FnMut(&Info)>)>,
    next_resource_id: u64,
    pending_state: SeqQueue<NodeState>,
    pub(crate) rt: RtState,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: String, properties: Properties, gc: &Collector) -> Self {
        let driver_capable = properties::is_driver(&properties);
        let pause_on_idle = properties::pause_on_idle(&properties);
        let driver_graph = DriverGraph::new();
        driver_graph.add(id);
        let info = Info {
            id,
            state: NodeState::Creating,
            error: None,
            name: name.clone(),
            max_input_ports: 0,
            max_output_ports: 0,
            n_input_ports: 0,
            n_output_ports: 0,
            props: properties.clone(),
            change_mask: ChangeMask::empty(),
        };
        Node {
            id,
            name: Shared::new(&gc.handle(), name),
            properties,
            info,
            active: false,
            enabled: true,
            registered: false,
            driver_capable,
            remote: false,
            pause_on_idle,
            driver_node: id,
            driver_list: vec![id],
            input_ports: PortTable::new(),
            output_ports: PortTable::new(),
            implementation: Box::new(NullImplementation::default()),
            listeners: ListenerList::new(),
            resources: Vec::new(),
            next_resource_id: 0,
            pending_state: SeqQueue::new(),
            rt: RtState {
                driver_graph,
                activation: Activation::default(),
                quantum: Shared::new(&gc.handle(), Quantum::default()),
                clock: None,
                next_position: 0,
                handle: gc.handle(),
            },
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_driver_capable(&self) -> bool {
        self.driver_capable
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn set_remote(&mut self, remote: bool) {
        self.remote = remote;
    }

    pub fn driver_node(&self) -> NodeId {
        self.driver_node
    }

    pub fn driver_list(&self) -> &[NodeId] {
        &self.driver_list
    }

    pub fn driver_graph(&self) -> &DriverGraph {
        &self.rt.driver_graph
    }

    pub fn activation(&self) -> Activation {
        self.rt.activation
    }

    pub fn quantum(&self) -> Shared<Quantum> {
        self.rt.quantum.clone()
    }

    pub fn clock(&self) -> Option<Clock> {
        self.rt.clock
    }

    /// Attach (or detach) the external wall clock this node's cycle should
    /// follow instead of the monotonic fallback.
    pub fn set_clock(&mut self, clock: Option<Clock>) {
        self.rt.clock = clock;
    }

    /// Stamp a fresh quantum for this driver cycle: copy `{nsec, rate,
    /// position, delay}` from the attached clock if there is one, otherwise
    /// derive `nsec` from `now_nsec` and `position` from this node's own
    /// cycle counter. Always advances that counter by the quantum's size.
    pub(crate) fn stamp_quantum(&mut self, now_nsec: u64) {
        let size = self.rt.quantum.size;
        let (nsec, rate, position, delay) = match self.rt.clock {
            Some(clock) => (clock.nsec, clock.rate, clock.position, clock.delay),
            None => (now_nsec, self.rt.quantum.rate, self.rt.next_position, 0),
        };
        let quantum = Quantum {
            nsec,
            rate,
            position,
            delay,
            size,
        };
        self.rt.quantum = Shared::new(&self.rt.handle, quantum);
        self.rt.next_position = self.rt.next_position.wrapping_add(size as u64);
    }

    /// Run this node's own per-cycle bookkeeping: fire `process`, and
    /// forward an implementation-raised event if one is pending.
    pub(crate) fn process(&mut self) {
        self.listeners.emit(&NodeEvent::Process);
        if self.implementation.poll_event() {
            self.listeners.emit(&NodeEvent::Event);
        }
    }

    pub fn set_implementation(&mut self, implementation: Box<dyn NodeImplementation>) {
        self.implementation = implementation;
    }

    pub fn add_listener(&mut self, callback: Box<dyn FnMut(&NodeEvent)>) -> crate::listener::ListenerId {
        self.listeners.add(callback)
    }

    pub fn remove_listener(&mut self, id: crate::listener::ListenerId) {
        self.listeners.remove(id);
    }

    /// Raise an event from outside the node itself — used by
    /// [`crate::node_registry::NodeRegistry`] to deliver `driver_changed`,
    /// which is triggered by an operation spanning more than one node.
    pub(crate) fn emit(&mut self, event: &NodeEvent) {
        self.listeners.emit(event);
    }

    pub fn bind_resource(&mut self, mut callback: Box<dyn FnMut(&Info)>) -> ResourceId {
        let id = ResourceId(self.next_resource_id);
        self.next_resource_id += 1;
        callback(&self.info);
        self.resources.push((id, callback));
        id
    }

    pub fn unbind_resource(&mut self, id: ResourceId) {
        self.resources.retain(|(i, _)| *i != id);
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        self.listeners.emit(&NodeEvent::ActiveChanged(active));
        if active {
            let _ = self.set_state(NodeState::Running);
        } else {
            let _ = self.set_state(NodeState::Idle);
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.listeners.emit(&NodeEvent::EnabledChanged(enabled));
    }

    /// Request a transition to `target`. A synchronous command failure
    /// returns `Err` immediately and leaves `info.state` untouched — only a
    /// failure delivered later through [`Node::on_done`] drives the node to
    /// `Error`, matching `pw_node_set_state`'s `SPA_RESULT_IS_ERROR(res)`
    /// early return before any completion is enqueued.
    pub fn set_state(&mut self, target: NodeState) -> Result<(), NodeError> {
        if self.info.state == target {
            return Ok(());
        }
        if matches!(target, NodeState::Creating) {
            return Err(NodeError::InvalidState);
        }
        self.listeners.emit(&NodeEvent::StateRequest(target));

        let outcome = match target {
            NodeState::Creating => unreachable!(),
            NodeState::Suspended => self.suspend(),
            NodeState::Idle => {
                if !self.active {
                    self.pause()
                } else {
                    CommandOutcome::Done(0)
                }
            }
            NodeState::Running => {
                if self.active {
                    self.activate_links();
                    self.start()
                } else {
                    CommandOutcome::Done(0)
                }
            }
            NodeState::Error => CommandOutcome::Done(0),
        };

        match outcome {
            CommandOutcome::Done(res) if res < 0 => Err(NodeError::Async(res)),
            CommandOutcome::Done(_) => {
                self.update_state(target, None);
                Ok(())
            }
            CommandOutcome::Async(seq) => {
                self.pending_state.insert(seq, target);
                Ok(())
            }
        }
    }

    /// Deliver a deferred command completion, keyed by the sequence number
    /// handed out when the command was first issued.
    pub fn on_done(&mut self, seq: u32, res: i32) {
        self.listeners.emit(&NodeEvent::AsyncComplete(seq, res));
        if let Some(target) = self.pending_state.take(seq) {
            self.complete_state(target, res);
        }
    }

    fn complete_state(&mut self, target: NodeState, res: i32) {
        if res < 0 {
            self.update_state(
                NodeState::Error,
                Some(format!("error changing node state: {}", res)),
            );
        } else {
            self.update_state(target, None);
        }
    }

    fn suspend(&mut self) -> CommandOutcome {
        for direction in [Direction::Input, Direction::Output] {
            let ids = self.port_table(direction).ids().to_vec();
            for id in ids {
                let res = self.implementation.unset_format(direction, id);
                if let Some(port) = self.port_table_mut(direction).get_mut(id) {
                    if let Err(e) = res {
                        log::warn!("error unset format on {:?} port {:?}: {}", direction, id, e);
                    }
                    port.state = crate::port::PortState::Configure;
                }
            }
        }
        CommandOutcome::Done(0)
    }

    fn pause(&mut self) -> CommandOutcome {
        if self.info.state.rank() <= NodeState::Idle.rank() {
            return CommandOutcome::Done(0);
        }
        self.implementation.send_command(Command::Pause)
    }

    fn start(&mut self) -> CommandOutcome {
        self.implementation.send_command(Command::Start)
    }

    fn activate_links(&mut self) {
        self.set_links_active(true);
    }

    fn deactivate_links(&mut self) {
        self.set_links_active(false);
    }

    fn set_links_active(&mut self, active: bool) {
        for table in [&mut self.input_ports, &mut self.output_ports] {
            for port in table.iter_mut() {
                for link in &mut port.links {
                    link.active = active;
                }
            }
        }
    }

    /// Apply a new lifecycle state, firing `state_changed` then
    /// `info_changed`, in that order, and running the idle side effects
    /// (pause-on-idle, link deactivation) first.
    pub fn update_state(&mut self, new: NodeState, error: Option<String>) {
        if self.info.state == new {
            return;
        }
        let old = self.info.state;

        if new == NodeState::Idle {
            if self.pause_on_idle {
                // fire-and-forget: no continuation is registered for this one.
                let _ = self.implementation.send_command(Command::Pause);
            }
            self.deactivate_links();
        }

        self.info.error = error.clone();
        self.info.state = new;
        self.listeners
            .emit(&NodeEvent::StateChanged(old, new, error.as_deref()));

        self.info.change_mask.insert(ChangeMask::STATE);
        self.push_info_changed();
    }

    fn push_info_changed(&mut self) {
        self.listeners.emit(&NodeEvent::InfoChanged(&self.info));
        for (_, callback) in self.resources.iter_mut() {
            callback(&self.info);
        }
        self.info.change_mask = ChangeMask::empty();
    }

    /// Merge `updates` into the node's properties, re-derive the properties
    /// that drive behavior (`pause_on_idle`, driver capability), and push
    /// the change to listeners and bound resources.
    pub fn update_properties(&mut self, updates: &Properties) {
        if !self.properties.merge(updates) {
            return;
        }
        self.pause_on_idle = properties::pause_on_idle(&self.properties);
        self.driver_capable = properties::is_driver(&self.properties);
        self.info.props = self.properties.clone();
        self.info.change_mask.insert(ChangeMask::PROPS);
        self.push_info_changed();
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Re-derive `input_ports`/`output_ports` from the implementation's
    /// reported port ids. `change_mask`'s port bits track a change in the
    /// reported maxima, not in which ports are currently live, mirroring
    /// `node.c`'s `if (node->info.max_input_ports != max_input_ports) ...`.
    pub fn update_ports(&mut self) {
        let (_n_in, max_in, _n_out, max_out) = self.implementation.port_counts();

        let reported_in = self.implementation.port_ids(Direction::Input);
        self.input_ports.reconcile(
            &reported_in,
            Direction::Input,
            |id, dir| Ok(Port::new(id, dir)),
            |_port| {},
        );
        let reported_out = self.implementation.port_ids(Direction::Output);
        self.output_ports.reconcile(
            &reported_out,
            Direction::Output,
            |id, dir| Ok(Port::new(id, dir)),
            |_port| {},
        );

        self.info.n_input_ports = self.input_ports.len() as u32;
        self.info.n_output_ports = self.output_ports.len() as u32;

        if self.info.max_input_ports != max_in {
            self.info.max_input_ports = max_in;
            self.info.change_mask.insert(ChangeMask::INPUT_PORTS);
        }
        if self.info.max_output_ports != max_out {
            self.info.max_output_ports = max_out;
            self.info.change_mask.insert(ChangeMask::OUTPUT_PORTS);
        }
        if !self.info.change_mask.is_empty() {
            self.push_info_changed();
        }
    }

    fn port_table(&self, direction: Direction) -> &PortTable {
        match direction {
            Direction::Input => &self.input_ports,
            Direction::Output => &self.output_ports,
        }
    }

    fn port_table_mut(&mut self, direction: Direction) -> &mut PortTable {
        match direction {
            Direction::Input => &mut self.input_ports,
            Direction::Output => &mut self.output_ports,
        }
    }

    /// Call `cb` for every live port of `direction`, tolerating the
    /// callback destroying the port it was just given (via a stable id
    /// snapshot taken before iterating). Stops early if `cb` returns
    /// nonzero, returning that value.
    pub fn for_each_port(&mut self, direction: Direction, mut cb: impl FnMut(&mut Port) -> i32) -> i32 {
        let ids = self.port_table(direction).ids().to_vec();
        for id in ids {
            if let Some(port) = self.port_table_mut(direction).get_mut(id) {
                let res = cb(port);
                if res != 0 {
                    return res;
                }
            }
        }
        0
    }

    /// Find `port_id`, or, if `None` ("any port"), the first unlinked port,
    /// falling back to the first `MULTI`-flagged port.
    pub fn find_port(&self, direction: Direction, port_id: Option<PortId>) -> Option<&Port> {
        let table = self.port_table(direction);
        if let Some(id) = port_id {
            return table.get(id);
        }
        let mut multi_fallback = None;
        for port in table.iter() {
            if port.links.is_empty() {
                return Some(port);
            }
            if port.mix_flags.contains(crate::port::MixFlags::MULTI) {
                multi_fallback.get_or_insert(port);
            }
        }
        multi_fallback
    }

    pub fn allocate_port_id(&self, direction: Direction) -> Option<PortId> {
        let (n, max) = match direction {
            Direction::Input => (self.info.n_input_ports, self.info.max_input_ports),
            Direction::Output => (self.info.n_output_ports, self.info.max_output_ports),
        };
        if n >= max {
            return None;
        }
        let table = self.port_table(direction);
        (0..max).map(PortId).find(|id| !table.contains(*id))
    }

    /// Where to forward a `reuse_buffer` call for `port_id`'s current peer,
    /// if it has one.
    pub fn reuse_buffer_target(&self, port_id: PortId) -> Option<(NodeId, PortId)> {
        let port = self.input_ports.get(port_id)?;
        port.links.first().map(|link| (link.peer_node, link.peer_port))
    }

    /// Bounded parameter enumeration: calls `cb` with `(param_id, index,
    /// next_index, bytes)` for each parameter the implementation reports,
    /// reusing one scratch buffer, stopping after `max` results or when
    /// `cb` returns nonzero.
    pub fn for_each_param(
        &mut self,
        param_id: u32,
        start_index: u32,
        max: u32,
        mut cb: impl FnMut(u32, u32, u32, &[u8]) -> i32,
    ) -> i32 {
        let max = if max == 0 { u32::MAX } else { max };
        let mut scratch = [0u8; 4096];
        let mut index = start_index;
        let mut count = 0u32;
        while count < max {
            let current = index;
            match self.implementation.enum_params(param_id, index, &mut scratch) {
                Some(len) => {
                    index += 1;
                    let res = cb(param_id, current, index, &scratch[..len]);
                    if res != 0 {
                        return res;
                    }
                }
                None => break,
            }
            count += 1;
        }
        0
    }

    /// Register the node: publish its ports, mirror session properties into
    /// the registered property set, and move `Creating -> Suspended`.
    pub fn register(&mut self, registered_props: &mut Properties) -> Result<(), NodeError> {
        if self.registered {
            return Err(NodeError::AlreadyExists);
        }
        self.update_ports();
        if let Some(class) = self.properties.get(properties::KEY_MEDIA_CLASS) {
            registered_props.set(properties::KEY_MEDIA_CLASS, class);
        }
        registered_props.set(properties::KEY_NODE_NAME, self.info.name.clone());
        if let Some(session) = self.properties.get(properties::KEY_NODE_SESSION) {
            registered_props.set(properties::KEY_NODE_SESSION, session);
        }
        self.registered = true;
        self.properties.set(properties::KEY_NODE_ID, self.id.0.to_string());
        self.listeners.emit(&NodeEvent::Initialized);
        self.update_state(NodeState::Suspended, None);
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

#[cfg(test)]
pub(crate) fn new_for_test(id: NodeId, name: &str, gc: &Collector) -> Node {
    Node::new(id, name.to_owned(), Properties::new(), gc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_node(name: &str) -> (Node, Collector) {
        let gc = Collector::new();
        let node = new_for_test(NodeId(1), name, &gc);
        (node, gc)
    }

    #[test]
    fn a_fresh_node_heads_its_own_driver_group() {
        let (node, _gc) = new_node("n");
        assert_eq!(node.driver_node(), node.id());
        assert_eq!(node.driver_list(), &[node.id()]);
        assert!(node.driver_graph().contains(node.id()));
    }

    #[test]
    fn set_state_to_running_without_active_is_accepted_but_idle() {
        let (mut node, _gc) = new_node("n");
        node.set_state(NodeState::Suspended).unwrap();
        node.set_state(NodeState::Running).unwrap();
        assert_eq!(node.info().state, NodeState::Running);
    }

    #[test]
    fn a_synchronous_command_failure_leaves_state_unchanged() {
        struct FailingImpl;
        impl NodeImplementation for FailingImpl {
            fn port_ids(&self, _d: Direction) -> Vec<PortId> {
                Vec::new()
            }
            fn send_command(&mut self, _c: Command) -> CommandOutcome {
                CommandOutcome::Done(-5)
            }
        }
        let (mut node, _gc) = new_node("n");
        node.set_implementation(Box::new(FailingImpl));
        node.set_active(true);
        let before = node.info().state;
        let res = node.set_state(NodeState::Running);
        assert!(res.is_err());
        assert_eq!(node.info().state, before);
        assert_eq!(node.info().error, None);
    }

    #[test]
    fn an_async_command_completes_on_done() {
        struct AsyncImpl;
        impl NodeImplementation for AsyncImpl {
            fn port_ids(&self, _d: Direction) -> Vec<PortId> {
                Vec::new()
            }
            fn send_command(&mut self, _c: Command) -> CommandOutcome {
                CommandOutcome::Async(42)
            }
        }
        let (mut node, _gc) = new_node("n");
        node.set_implementation(Box::new(AsyncImpl));
        node.set_active(true);
        node.set_state(NodeState::Running).unwrap();
        assert_eq!(
            node.info().state,
            NodeState::Idle,
            "still waiting on completion"
        );
        node.on_done(42, 0);
        assert_eq!(node.info().state, NodeState::Running);
    }

    #[test]
    fn idle_triggers_pause_on_idle_by_default() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct CountingImpl {
            pauses: Rc<RefCell<u32>>,
        }
        impl NodeImplementation for CountingImpl {
            fn port_ids(&self, _d: Direction) -> Vec<PortId> {
                Vec::new()
            }
            fn send_command(&mut self, c: Command) -> CommandOutcome {
                if c == Command::Pause {
                    *self.pauses.borrow_mut() += 1;
                }
                CommandOutcome::Done(0)
            }
        }
        let (mut node, _gc) = new_node("n");
        let pauses = Rc::new(RefCell::new(0));
        node.set_implementation(Box::new(CountingImpl {
            pauses: pauses.clone(),
        }));
        node.update_state(NodeState::Idle, None);
        assert_eq!(*pauses.borrow(), 1);
    }

    #[test]
    fn property_updates_rederive_pause_on_idle() {
        let (mut node, _gc) = new_node("n");
        assert!(node.pause_on_idle);
        let mut update = Properties::new();
        update.set(properties::KEY_PAUSE_ON_IDLE, "false");
        node.update_properties(&update);
        assert!(!node.pause_on_idle);
    }

    #[test]
    fn register_publishes_ports_and_enters_suspended() {
        struct OnePort;
        impl NodeImplementation for OnePort {
            fn port_counts(&self) -> (u32, u32, u32, u32) {
                (1, 4, 0, 4)
            }
            fn port_ids(&self, d: Direction) -> Vec<PortId> {
                match d {
                    Direction::Input => vec![PortId(0)],
                    Direction::Output => vec![],
                }
            }
        }
        let (mut node, _gc) = new_node("n");
        node.set_implementation(Box::new(OnePort));
        let mut global_props = Properties::new();
        node.register(&mut global_props).unwrap();
        assert!(node.is_registered());
        assert_eq!(node.info().state, NodeState::Suspended);
        assert_eq!(node.info().n_input_ports, 1);
        assert_eq!(global_props.get(properties::KEY_NODE_NAME), Some("n"));
    }

    #[test]
    fn find_port_any_prefers_unlinked_then_multi() {
        let (mut node, _gc) = new_node("n");
        node.input_ports.reconcile(
            &[PortId(0), PortId(1)],
            Direction::Input,
            |id, dir| Ok(Port::new(id, dir)),
            |_| {},
        );
        node.input_ports
            .get_mut(PortId(0))
            .unwrap()
            .links
            .push(Link {
                peer_node: NodeId(9),
                peer_port: PortId(0),
                active: false,
            });
        node.input_ports.get_mut(PortId(0)).unwrap().mix_flags = crate::port::MixFlags::MULTI;

        let any = node.find_port(Direction::Input, None).unwrap();
        assert_eq!(
            any.id,
            PortId(1),
            "unlinked port 1 wins over linked-but-multi port 0"
        );
    }
}
