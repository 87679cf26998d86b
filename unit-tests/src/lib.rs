//! Host-side fakes for multi-node scenarios
//!
//! [`LoopbackMesh`] is an in-memory broadcast medium. Every node gets a
//! [`LoopbackTransport`] attached to it; frames broadcast by one node are
//! queued for every other attached node until the test delivers them.

use std::cell::RefCell;
use std::rc::Rc;

use embassy_time::Instant;
use meshlight_sync::{
    LedDriver, MeshTransport, Node, NodeConfig, NodeId, PixelRing, Rgb, TransportEvent,
};

/// Pixel count used by the scenario nodes
pub const RING_SIZE: usize = 16;

pub type TestNode = Node<LoopbackTransport, RecordingDriver, RING_SIZE>;

/// A frame in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub from: NodeId,
    pub to: NodeId,
    pub frame: Vec<u8>,
}

#[derive(Default)]
struct MeshState {
    members: Vec<NodeId>,
    /// Links that currently drop everything, as (from, to)
    cut: Vec<(NodeId, NodeId)>,
    queue: Vec<Delivery>,
}

/// Shared broadcast medium
#[derive(Clone, Default)]
pub struct LoopbackMesh {
    state: Rc<RefCell<MeshState>>,
}

impl LoopbackMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node and return its transport
    pub fn attach(&self, id: NodeId) -> LoopbackTransport {
        self.state.borrow_mut().members.push(id);
        LoopbackTransport {
            id,
            mesh: self.clone(),
            fail: false,
        }
    }

    /// Drop every frame from `from` to `to` until [`restore`](Self::restore)
    pub fn cut(&self, from: NodeId, to: NodeId) {
        self.state.borrow_mut().cut.push((from, to));
    }

    pub fn restore(&self, from: NodeId, to: NodeId) {
        self.state.borrow_mut().cut.retain(|link| *link != (from, to));
    }

    /// Take every frame queued for `to`
    pub fn take_for(&self, to: NodeId) -> Vec<Delivery> {
        let mut state = self.state.borrow_mut();
        let (mine, rest): (Vec<Delivery>, Vec<Delivery>) =
            state.queue.drain(..).partition(|d| d.to == to);
        state.queue = rest;
        mine
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    fn broadcast(&self, from: NodeId, frame: &[u8]) {
        let mut state = self.state.borrow_mut();
        let targets: Vec<NodeId> = state
            .members
            .iter()
            .copied()
            .filter(|&to| to != from && !state.cut.contains(&(from, to)))
            .collect();
        for to in targets {
            state.queue.push(Delivery {
                from,
                to,
                frame: frame.to_vec(),
            });
        }
    }

    fn peer_count(&self, id: NodeId) -> usize {
        self.state
            .borrow()
            .members
            .iter()
            .filter(|&&member| member != id)
            .count()
    }
}

/// One node's view of the [`LoopbackMesh`]
pub struct LoopbackTransport {
    id: NodeId,
    mesh: LoopbackMesh,
    /// Refuse every broadcast while set
    pub fail: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDown;

impl MeshTransport for LoopbackTransport {
    type Error = LinkDown;

    fn broadcast(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(LinkDown);
        }
        self.mesh.broadcast(self.id, frame);
        Ok(())
    }

    fn node_id(&self) -> NodeId {
        self.id
    }

    fn peer_count(&self) -> usize {
        self.mesh.peer_count(self.id)
    }
}

/// LED driver that keeps every frame written to it
#[derive(Default)]
pub struct RecordingDriver {
    pub frames: Vec<[Rgb; RING_SIZE]>,
}

impl LedDriver<RING_SIZE> for RecordingDriver {
    fn write(&mut self, colors: &[Rgb; RING_SIZE]) {
        self.frames.push(*colors);
    }
}

impl RecordingDriver {
    pub fn last(&self) -> Option<&[Rgb; RING_SIZE]> {
        self.frames.last()
    }
}

/// Build a node on `mesh` with full brightness so rendered frames equal the
/// logical color
pub fn spawn_node(mesh: &LoopbackMesh, id: NodeId, config: NodeConfig, now: Instant) -> TestNode {
    let display = PixelRing::new(RecordingDriver::default()).with_brightness(u8::MAX);
    Node::new(config, mesh.attach(id), display, now)
}

/// Hand every frame queued for `node` to it
pub fn deliver(mesh: &LoopbackMesh, node: &mut TestNode, now: Instant) -> usize {
    let id = node.transport().node_id();
    let deliveries = mesh.take_for(id);
    for delivery in &deliveries {
        node.handle_event(
            TransportEvent::Received {
                from: delivery.from,
                frame: &delivery.frame,
            },
            now,
        );
    }
    deliveries.len()
}
