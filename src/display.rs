//! Display-state observer.
//!
//! Mirrors panel blank/unblank transitions into the registry and announces
//! them on the event channel. Transitions arriving while the sensor is
//! unavailable are swallowed, so subscribers only ever see display events
//! that matter to a live sensor.

use std::sync::Arc;

use log::debug;

use crate::device::SensorDevice;
use crate::event::{EventChannel, EventTag};

/// Panel transitions the observer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankTransition {
    /// Panel going dark.
    Powerdown,
    /// Panel coming back.
    Unblank,
}

pub struct DisplayObserver {
    device: Arc<SensorDevice>,
    events: EventChannel,
}

impl DisplayObserver {
    pub fn new(device: Arc<SensorDevice>, events: EventChannel) -> Self {
        Self { device, events }
    }

    /// Applies one panel transition.
    pub async fn handle_transition(&self, transition: BlankTransition) {
        debug!("display transition: {transition:?}");
        match transition {
            BlankTransition::Powerdown => {
                if self.device.note_screen_off(true).await {
                    self.events.publish(EventTag::ScreenBlack);
                }
            }
            BlankTransition::Unblank => {
                if self.device.note_screen_off(false).await {
                    self.events.publish(EventTag::ScreenUnblack);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::testing::MockBoard;
    use crate::config::{Config, ConfigManager};
    use crate::irq::IrqController;
    use crate::wake_guard::WakeGuard;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn fixture() -> (Arc<SensorDevice>, DisplayObserver, EventChannel) {
        let board = Arc::new(MockBoard::new());
        let wake = Arc::new(WakeGuard::new());
        let events = EventChannel::new();
        let irq = Arc::new(IrqController::new(
            board,
            wake,
            events.clone(),
            Duration::from_millis(1000),
        ));
        let device = Arc::new(SensorDevice::new(
            Arc::new(MockBoard::new()),
            irq,
            ConfigManager::new(Config::default()),
        ));
        let observer = DisplayObserver::new(device.clone(), events.clone());
        (device, observer, events)
    }

    #[tokio::test]
    async fn transitions_swallowed_while_unavailable() {
        let (_device, observer, events) = fixture();
        let mut rx = events.subscribe();

        observer.handle_transition(BlankTransition::Powerdown).await;
        observer.handle_transition(BlankTransition::Unblank).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn transitions_announced_while_available() {
        let (device, observer, events) = fixture();
        device.power_on().await.unwrap();
        let mut rx = events.subscribe();

        observer.handle_transition(BlankTransition::Powerdown).await;
        observer.handle_transition(BlankTransition::Unblank).await;

        assert_eq!(rx.recv().await.unwrap(), EventTag::ScreenBlack);
        assert_eq!(rx.recv().await.unwrap(), EventTag::ScreenUnblack);
    }

    #[tokio::test]
    async fn repeated_transitions_repeat_announcements() {
        let (device, observer, events) = fixture();
        device.power_on().await.unwrap();
        let mut rx = events.subscribe();

        observer.handle_transition(BlankTransition::Powerdown).await;
        observer.handle_transition(BlankTransition::Powerdown).await;

        assert_eq!(rx.recv().await.unwrap(), EventTag::ScreenBlack);
        assert_eq!(rx.recv().await.unwrap(), EventTag::ScreenBlack);
    }
}
