//! Per-connection client state
//!
//! One `Client` per transport stream: negotiated byte order, sequence
//! counters, BIG-REQUESTS mode, close-down mode, the outbound queue, and the
//! XInput selection maps.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::mpsc;
use tracing::trace;

use crate::core::ids::{ClientId, WindowId};
use crate::protocol::wire::WireOrder;

/// What happens to a client's resources when it disconnects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseDownMode {
    #[default]
    Destroy,
    RetainPermanent,
    RetainTemporary,
}

impl CloseDownMode {
    pub fn from_wire(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(CloseDownMode::Destroy),
            1 => Some(CloseDownMode::RetainPermanent),
            2 => Some(CloseDownMode::RetainTemporary),
            _ => None,
        }
    }
}

/// One connected client
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub order: WireOrder,
    /// Sequence number of the request currently executing (wrapping 16-bit)
    pub sequence: u16,
    /// Sequence of the last request fully executed; synthesized events are
    /// stamped with this
    pub last_sequence: u16,
    /// Shared with the connection reader, which switches framing when the
    /// dispatcher enables BIG-REQUESTS
    pub big_requests: Arc<AtomicBool>,
    pub close_down: CloseDownMode,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    /// Events held back while another client holds the server grab
    pub held_events: Vec<Vec<u8>>,
    /// Save-set membership (windows owned by other clients)
    pub save_set: HashSet<WindowId>,
    /// Devices opened through XInput OpenDevice
    pub open_devices: HashSet<u8>,
    /// XInput1 event classes selected per window
    pub xi1_selections: HashMap<WindowId, Vec<u32>>,
    /// XInput2 event masks per (window, device)
    pub xi2_masks: HashMap<(WindowId, u16), u32>,
}

impl Client {
    pub fn new(
        id: ClientId,
        order: WireOrder,
        big_requests: Arc<AtomicBool>,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self {
            id,
            order,
            sequence: 0,
            last_sequence: 0,
            big_requests,
            close_down: CloseDownMode::default(),
            outbound,
            held_events: Vec::new(),
            save_set: HashSet::new(),
            open_devices: HashSet::new(),
            xi1_selections: HashMap::new(),
            xi2_masks: HashMap::new(),
        }
    }

    /// Assign the next request sequence number
    pub fn next_sequence(&mut self) -> u16 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    /// Queue bytes for the writer task; a send failure means the connection
    /// is already gone and is safe to ignore
    pub fn send_raw(&self, bytes: Vec<u8>) {
        if self.outbound.send(bytes).is_err() {
            trace!(client = self.id, "dropping output for closed connection");
        }
    }

    /// XInput2 mask bits for a (window, device) pair, including the
    /// all-devices sentinels
    pub fn xi2_mask_for(&self, window: WindowId, device: u16) -> u32 {
        use crate::extensions::xinput::{XI_ALL_DEVICES, XI_ALL_MASTER_DEVICES};
        self.xi2_masks.get(&(window, device)).copied().unwrap_or(0)
            | self
                .xi2_masks
                .get(&(window, XI_ALL_DEVICES))
                .copied()
                .unwrap_or(0)
            | self
                .xi2_masks
                .get(&(window, XI_ALL_MASTER_DEVICES))
                .copied()
                .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> (Client, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Client::new(1, WireOrder::Lsb, Arc::new(AtomicBool::new(false)), tx),
            rx,
        )
    }

    #[test]
    fn test_sequence_wraps() {
        let (mut c, _rx) = client();
        c.sequence = u16::MAX;
        assert_eq!(c.next_sequence(), 0);
        assert_eq!(c.next_sequence(), 1);
    }

    #[test]
    fn test_xi2_mask_merges_sentinels() {
        use crate::extensions::xinput::XI_ALL_MASTER_DEVICES;
        let (mut c, _rx) = client();
        c.xi2_masks.insert((0x2, XI_ALL_MASTER_DEVICES), 0x0002_0000);
        c.xi2_masks.insert((0x2, 2), 0x0000_0040);
        assert_eq!(c.xi2_mask_for(0x2, 2), 0x0002_0040);
        assert_eq!(c.xi2_mask_for(0x2, 3), 0x0002_0000);
        assert_eq!(c.xi2_mask_for(0x5, 2), 0);
    }
}
