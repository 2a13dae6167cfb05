use std::collections::HashMap;

use bitflags::bitflags;

use crate::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Configure,
    Ready,
    Paused,
    Streaming,
}

bitflags! {
    pub struct MixFlags: u32 {
        /// The port accepts more than one link at a time.
        const MULTI = 0x1;
    }
}

/// A single link from a port to a peer port on another node.
///
/// The concrete processing graph (buffer transport, negotiation) is out of
/// scope here; a link is tracked only far enough to support `reuse_buffer`
/// forwarding and activation bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub peer_node: NodeId,
    pub peer_port: PortId,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub id: PortId,
    pub direction: Direction,
    pub mix_flags: MixFlags,
    pub state: PortState,
    pub links: Vec<Link>,
}

impl Port {
    pub fn new(id: PortId, direction: Direction) -> Self {
        Port {
            id,
            direction,
            mix_flags: MixFlags::empty(),
            state: PortState::Configure,
            links: Vec::new(),
        }
    }
}

/// A rejected port from [`PortTable::reconcile`]'s `create` callback.
#[derive(Debug)]
pub struct PortError(pub String);

/// The ordered list of live ports alongside an id-indexed map of the same
/// ports.
///
/// Kept as two structures, matching the `input_ports`/`input_port_map`
/// split a reconciled port table needs, so "the map and the list agree" is
/// an invariant that can actually fail if the reconciliation routine has a
/// bug, rather than one guaranteed true by construction.
#[derive(Debug, Default)]
pub struct PortTable {
    order: Vec<PortId>,
    map: HashMap<PortId, Port>,
    /// One past the highest id this table has ever handed out a slot for.
    /// Mirrors `pw_map`'s monotonically growing slot count.
    next_slot: u32,
}

impl PortTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: PortId) -> Option<&Port> {
        self.map.get(&id)
    }

    pub fn get_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.map.get_mut(&id)
    }

    pub fn contains(&self, id: PortId) -> bool {
        self.map.contains_key(&id)
    }

    pub fn ids(&self) -> &[PortId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.order.iter().map(move |id| &self.map[id])
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.map.values_mut()
    }

    fn insert(&mut self, port: Port) {
        self.order.push(port.id);
        self.map.insert(port.id, port);
    }

    fn remove(&mut self, id: PortId) -> Option<Port> {
        let port = self.map.remove(&id)?;
        self.order.retain(|&i| i != id);
        Some(port)
    }

    /// Reconcile this table against a freshly reported, ascending, unique
    /// set of port ids, calling `create` for ids that need a new [`Port`]
    /// and `destroy` for ports that are no longer reported.
    ///
    /// Walks the existing slot range and the reported ids with two
    /// cursors, one deliberate departure from a literal two-pointer merge:
    /// a numerically-matching but absent slot always gets a port created
    /// for it rather than being treated as unchanged, so the list and the
    /// map can never disagree afterwards (see `DESIGN.md`).
    ///
    /// Returns whether anything was added or removed.
    pub fn reconcile(
        &mut self,
        reported_ids: &[PortId],
        direction: Direction,
        mut create: impl FnMut(PortId, Direction) -> Result<Port, PortError>,
        mut destroy: impl FnMut(Port),
    ) -> bool {
        debug_assert!(reported_ids.windows(2).all(|w| w[0] < w[1]));

        let mut o: u32 = 0;
        let mut n: usize = 0;
        let mut os = self.next_slot;
        let ns = reported_ids.len();
        let mut changed = false;

        while (o < os) || (n < ns) {
            match reported_ids.get(n).copied() {
                None => {
                    // nothing left to report; drop the remaining slot.
                    if let Some(port) = self.remove(PortId(o)) {
                        destroy(port);
                        changed = true;
                    }
                    o += 1;
                }
                Some(id) if o < os && o < id.0 => {
                    // slot `o` was not reported again: drop it if it exists.
                    if let Some(port) = self.remove(PortId(o)) {
                        destroy(port);
                        changed = true;
                    }
                    o += 1;
                }
                Some(id) if o >= os || o > id.0 => {
                    // a newly reported id, beyond the slot range we'd seen before.
                    if !self.map.contains_key(&id) {
                        if let Ok(port) = create(id, direction) {
                            self.insert(port);
                            changed = true;
                        }
                    }
                    if id.0 >= os {
                        os = id.0 + 1;
                    }
                    o = id.0 + 1;
                    n += 1;
                }
                Some(id) => {
                    // o == id.0: reported again. Fill it in if somehow
                    // missing so the map and the list can never disagree.
                    if !self.map.contains_key(&id) {
                        if let Ok(port) = create(id, direction) {
                            self.insert(port);
                            changed = true;
                        }
                    }
                    n += 1;
                    o += 1;
                }
            }
        }

        self.next_slot = os;
        changed
    }
}
