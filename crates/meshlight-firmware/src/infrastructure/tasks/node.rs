use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use esp_hal::gpio::{Input, InputConfig, InputPin, Pull};
use esp_println::println;
use esp_radio::esp_now::EspNowReceiver;

use meshlight_sync::color::BOOT_BLUE;
use meshlight_sync::{MeshTransport, NodeConfig, Role, TransportEvent};

use crate::infrastructure::config;
use crate::infrastructure::drivers::{EspNowMesh, node_id_from_mac};
use crate::infrastructure::types::{LightRing, MeshNode};

/// Pick the node role once at boot
///
/// A role set at build time wins; otherwise the strap pin decides.
pub(crate) fn select_role(strap: impl InputPin + 'static) -> Role {
    if let Some(name) = config::NODE.role {
        match name.parse() {
            Ok(role) => return role,
            Err(e) => println!("node: MESHLIGHT_ROLE={:?}: {}, using strap pin", name, e),
        }
    }

    let strap = Input::new(strap, InputConfig::default().with_pull(Pull::Up));
    if strap.is_low() {
        Role::Producer
    } else {
        Role::Consumer
    }
}

pub(crate) const fn node_config(role: Role) -> NodeConfig {
    NodeConfig::new(role)
        .with_broadcast_interval(Duration::from_millis(config::NODE.broadcast_interval_ms))
        .with_staleness_threshold(Duration::from_millis(config::NODE.staleness_threshold_ms))
        .with_status_interval(Duration::from_millis(config::NODE.status_interval_ms))
        .with_hue_step(config::NODE.hue_step)
        .with_brightness_ceiling(config::NODE.brightness_ceiling)
}

/// Blink the ring blue a few times so a freshly flashed node is easy to spot
pub(crate) async fn boot_flash(ring: &mut LightRing) {
    let period = Duration::from_millis(config::LIGHT.boot_flash_ms);
    for _ in 0..config::LIGHT.boot_flashes {
        ring.show(BOOT_BLUE);
        Timer::after(period).await;
        ring.blank();
        Timer::after(period).await;
    }
}

/// Task that drives the node
///
/// Waits for a frame or the next poll tick, feeds whatever arrived to the
/// node and then lets it run its timers.
#[embassy_executor::task]
pub(crate) async fn node_task(mut node: MeshNode, mut receiver: EspNowReceiver<'static>) {
    let poll_interval = Duration::from_millis(config::NODE.poll_interval_ms);

    loop {
        match select(receiver.receive_async(), Timer::after(poll_interval)).await {
            Either::First(packet) => {
                let now = Instant::now();
                let from = node_id_from_mac(&packet.info.src_address);
                let seen = node.transport_mut().observe(from, packet.data(), now);

                if seen.joined {
                    node.handle_event(TransportEvent::NewConnection(from), now);
                    topology_changed(&mut node, now);
                }
                if !seen.beacon {
                    node.handle_event(
                        TransportEvent::Received {
                            from,
                            frame: packet.data(),
                        },
                        now,
                    );
                }
            }
            Either::Second(()) => {}
        }

        let now = Instant::now();
        if node.transport_mut().expire(now) {
            topology_changed(&mut node, now);
        }
        node.transport_mut().beacon(now);
        node.poll(now);
    }
}

fn topology_changed(node: &mut MeshNode, now: Instant) {
    print_peers(node.transport());
    node.handle_event(TransportEvent::ConnectionsChanged, now);
}

fn print_peers(mesh: &EspNowMesh) {
    println!("mesh: {} peers:", mesh.peer_count());
    for id in mesh.peer_ids() {
        println!("  {}", id);
    }
}
