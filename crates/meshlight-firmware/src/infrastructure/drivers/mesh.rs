//! ESP-NOW mesh transport
//!
//! Every frame goes to the broadcast address, so every node in radio range
//! on the same channel hears it. Nodes also send a short beacon now and then
//! so peers can be tracked even when a node has nothing else to say. Beacons
//! are handled here and never reach the protocol layer.

use embassy_time::{Duration, Instant};
use esp_hal::efuse::Efuse;
use esp_hal::peripherals::WIFI;
use esp_println::println;
use esp_radio::esp_now::{BROADCAST_ADDRESS, EspNowError, EspNowReceiver, EspNowSender};
use esp_radio::wifi::{ClientConfig, Config as WifiConfig, ModeConfig, WifiController};
use heapless::Vec;
use static_cell::make_static;

use meshlight_sync::{MeshTransport, NodeId};

use crate::infrastructure::config;

/// Frame prefix that marks a beacon; never valid JSON
const BEACON_MAGIC: [u8; 2] = [0xB1, 0xEC];

/// Derive a node id from the last four bytes of a MAC address
pub(crate) fn node_id_from_mac(mac: &[u8; 6]) -> NodeId {
    u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]])
}

struct Peer {
    id: NodeId,
    last_seen: Instant,
}

/// What an inbound frame meant for the peer table
pub(crate) struct Observation {
    /// Sender was not in the table yet
    pub joined: bool,
    /// Frame was a beacon and is already handled
    pub beacon: bool,
}

pub(crate) struct EspNowMesh {
    _controller: WifiController<'static>,
    sender: EspNowSender<'static>,
    node_id: NodeId,
    peers: Vec<Peer, { config::MESH_MAX_PEERS }>,
    peer_timeout: Duration,
    beacon_interval: Duration,
    next_beacon: Instant,
}

impl EspNowMesh {
    /// Record that a frame from `from` arrived at `now`
    pub(crate) fn observe(&mut self, from: NodeId, frame: &[u8], now: Instant) -> Observation {
        let beacon = frame.starts_with(&BEACON_MAGIC);

        let joined = if let Some(peer) = self.peers.iter_mut().find(|p| p.id == from) {
            peer.last_seen = now;
            false
        } else if self.peers.push(Peer { id: from, last_seen: now }).is_ok() {
            true
        } else {
            println!("mesh: peer table full, not tracking {}", from);
            false
        };

        Observation { joined, beacon }
    }

    /// Drop peers that went quiet; returns whether any were dropped
    pub(crate) fn expire(&mut self, now: Instant) -> bool {
        let before = self.peers.len();
        let timeout = self.peer_timeout;
        self.peers
            .retain(|p| now.checked_duration_since(p.last_seen).is_none_or(|age| age <= timeout));
        self.peers.len() != before
    }

    /// Send a beacon if one is due
    pub(crate) fn beacon(&mut self, now: Instant) {
        if now < self.next_beacon {
            return;
        }
        self.next_beacon = now + self.beacon_interval;

        let mut frame = [0u8; 6];
        frame[..2].copy_from_slice(&BEACON_MAGIC);
        frame[2..].copy_from_slice(&self.node_id.to_be_bytes());
        if let Err(e) = self.send(&frame) {
            println!("mesh: beacon failed: {:?}", e);
        }
    }

    /// Ids of the peers currently tracked
    pub(crate) fn peer_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.peers.iter().map(|p| p.id)
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), EspNowError> {
        self.sender.send(&BROADCAST_ADDRESS, frame)?.wait()
    }
}

impl MeshTransport for EspNowMesh {
    type Error = EspNowError;

    fn broadcast(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.send(frame)
    }

    fn node_id(&self) -> NodeId {
        self.node_id
    }

    fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

/// Bring up the radio in station mode and open ESP-NOW on the mesh channel
pub(crate) fn init_mesh(wifi: WIFI<'static>) -> (EspNowMesh, EspNowReceiver<'static>) {
    let esp_radio_ctrl = &*make_static!(esp_radio::init().unwrap());
    let (mut controller, interfaces) =
        esp_radio::wifi::new(esp_radio_ctrl, wifi, WifiConfig::default()).unwrap();
    controller
        .set_config(&ModeConfig::Client(ClientConfig::default()))
        .unwrap();
    controller.start().unwrap();

    let esp_now = interfaces.esp_now;
    esp_now.set_channel(config::MESH.channel).unwrap();
    let (_manager, sender, receiver) = esp_now.split();

    let mesh = EspNowMesh {
        _controller: controller,
        sender,
        node_id: node_id_from_mac(&Efuse::mac_address()),
        peers: Vec::new(),
        peer_timeout: Duration::from_millis(config::MESH.peer_timeout_ms),
        beacon_interval: Duration::from_millis(config::MESH.beacon_interval_ms),
        next_beacon: Instant::now(),
    };

    (mesh, receiver)
}
