//! Collaborator interfaces
//!
//! The mesh transport and the LED hardware live outside this crate. The node
//! talks to them only through the traits below, which keeps the protocol
//! testable on the host with in-memory fakes.

use core::fmt;

use crate::color::{BLACK, Rgb, scale_color};

/// Mesh-wide node identifier
pub type NodeId = u32;

/// Something the transport observed while being serviced
///
/// The embedding loop hands these to [`Node::handle_event`](crate::Node::handle_event)
/// one at a time, in the order the transport produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent<'a> {
    /// A frame arrived from a peer
    Received { from: NodeId, frame: &'a [u8] },
    /// A peer joined
    NewConnection(NodeId),
    /// The set of reachable peers changed
    ConnectionsChanged,
    /// The mesh clock was adjusted by this many microseconds
    TimeAdjusted(i32),
}

/// Best-effort broadcast transport
pub trait MeshTransport {
    type Error: fmt::Debug;

    /// Hand a frame to the mesh for delivery to every connected peer.
    ///
    /// Fire and forget: `Ok` means the transport accepted the frame, not that
    /// any peer received it.
    fn broadcast(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Identifier of this node
    fn node_id(&self) -> NodeId;

    /// Number of peers currently reachable
    fn peer_count(&self) -> usize;
}

/// Abstract LED driver trait
///
/// Implement this trait to support different hardware platforms.
pub trait LedDriver<const N: usize> {
    /// Write colors to the LED ring
    fn write(&mut self, colors: &[Rgb; N]);
}

/// Default global LED brightness, applied on top of the generated color
pub const DEFAULT_LED_BRIGHTNESS: u8 = 200;

/// A ring of `N` pixels that always shows one solid color
pub struct PixelRing<D: LedDriver<N>, const N: usize> {
    driver: D,
    /// Global brightness scale (0-255)
    brightness: u8,
    /// Color last shown, before brightness scaling
    color: Rgb,
}

impl<D: LedDriver<N>, const N: usize> PixelRing<D, N> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            brightness: DEFAULT_LED_BRIGHTNESS,
            color: BLACK,
        }
    }

    /// Set the global brightness scale
    #[must_use]
    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = brightness;
        self
    }

    /// Fill the whole ring with `color` and push it to the hardware
    pub fn show(&mut self, color: Rgb) {
        self.color = color;
        let frame = [scale_color(color, self.brightness); N];
        self.driver.write(&frame);
    }

    /// Turn every pixel off
    pub fn blank(&mut self) {
        self.show(BLACK);
    }

    /// Color last shown
    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub const fn pixel_count(&self) -> usize {
        N
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LastFrame<const N: usize>(Option<[Rgb; N]>);

    impl<const N: usize> LedDriver<N> for LastFrame<N> {
        fn write(&mut self, colors: &[Rgb; N]) {
            self.0 = Some(*colors);
        }
    }

    #[test]
    fn show_fills_every_pixel() {
        let mut ring: PixelRing<_, 16> = PixelRing::new(LastFrame(None)).with_brightness(255);
        let color = Rgb { r: 10, g: 20, b: 30 };
        ring.show(color);

        assert_eq!(ring.driver().0, Some([color; 16]));
        assert_eq!(ring.color(), color);
    }

    #[test]
    fn brightness_scales_output_not_state() {
        let mut ring: PixelRing<_, 4> = PixelRing::new(LastFrame(None)).with_brightness(128);
        let color = Rgb { r: 200, g: 100, b: 0 };
        ring.show(color);

        assert_eq!(ring.driver().0, Some([Rgb { r: 100, g: 50, b: 0 }; 4]));
        assert_eq!(ring.color(), color);
    }

    #[test]
    fn blank_turns_ring_off() {
        let mut ring: PixelRing<_, 3> = PixelRing::new(LastFrame(None));
        ring.show(Rgb { r: 1, g: 2, b: 3 });
        ring.blank();

        assert_eq!(ring.driver().0, Some([BLACK; 3]));
        assert_eq!(ring.color(), BLACK);
    }
}
