//! Fire-and-forget event channel between the sensor core and its listeners.

use log::{debug, warn};
use tokio::sync::broadcast;

/// Single-byte tags identifying asynchronous sensor conditions.
///
/// The numeric values are the wire contract with user-space listeners: each
/// delivered event is exactly one of these bytes, with no framing beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventTag {
    /// The daemon is shutting down.
    Exit = 0,
    /// The sensor interrupt line fired (finger down).
    Irq = 1,
    /// The display entered the powered-down blank state.
    ScreenBlack = 2,
    /// The display left the blank state.
    ScreenUnblack = 3,
    /// The sensor became available.
    DeviceAvailable = 4,
    /// The sensor became unavailable.
    DeviceUnavailable = 5,
    /// The sensor entered test mode.
    TestMode = 6,
    /// The sensor entered a vendor-defined mode.
    EnterMode = 7,
}

impl EventTag {
    /// Returns the single-byte wire representation of this tag.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One-directional broadcast pipe carrying [`EventTag`]s to listeners.
///
/// Delivery is fire-and-forget by contract: a publish with no active
/// subscriber drops the event instead of failing, and subscribers that fall
/// behind the channel capacity lose the oldest events. There is no retry,
/// acknowledgement, or persistence.
///
/// # Example
///
/// ```no_run
/// use fpsensord::event::{EventChannel, EventTag};
///
/// let events = EventChannel::new();
/// let mut listener = events.subscribe();
///
/// events.publish(EventTag::Irq);
/// // In async context: let tag = listener.recv().await;
/// ```
pub struct EventChannel {
    sender: broadcast::Sender<EventTag>,
}

impl EventChannel {
    /// Creates a channel with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a channel with a custom lag window.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes one tag to all current subscribers.
    ///
    /// Never fails and never blocks; callable from the interrupt path. An
    /// event published while nobody listens is simply not received.
    pub fn publish(&self, tag: EventTag) {
        match self.sender.send(tag) {
            Ok(receivers) => debug!("event {tag:?} delivered to {receivers} listener(s)"),
            Err(_) => warn!("event {tag:?} dropped, no listener attached"),
        }
    }

    /// Creates a new subscriber receiving events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventTag> {
        self.sender.subscribe()
    }
}

impl Clone for EventChannel {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}
