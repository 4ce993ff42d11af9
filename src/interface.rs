use std::sync::Arc;

use log::warn;
use uuid::Uuid;
use zbus::{interface, object_server::SignalEmitter};

use crate::device::SensorDevice;
use crate::dispatcher::CommandDispatcher;
use crate::display::{BlankTransition, DisplayObserver};
use crate::error::SensorError;

/// Bus-facing control surface of the daemon.
///
/// Methods report a status code (0 on success, negative errno-shaped on
/// failure) instead of bus errors so clients can treat the surface like an
/// ioctl table.
pub struct SensorInterface {
    pub device: Arc<SensorDevice>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub observer: Arc<DisplayObserver>,
    pub version: String,
}

#[interface(name = "io.github.fpsensord1")]
impl SensorInterface {
    /// Emitted once per sensor event; `tag` is the event's wire byte.
    #[zbus(signal)]
    pub async fn sensor_event(emitter: &SignalEmitter<'_>, tag: u8) -> zbus::Result<()>;

    /// Opens a session. Returns `(0, token)` or `(status, "")`.
    async fn open_session(&self) -> (i32, String) {
        match self.device.open().await {
            Ok(token) => (0, token.to_string()),
            Err(e) => (e.status(), String::new()),
        }
    }

    /// Releases a session by token. A malformed token is an access fault;
    /// an unknown one is a no-op success.
    async fn release_session(&self, token: String) -> i32 {
        match Uuid::parse_str(&token) {
            Ok(token) => {
                self.device.release(token).await;
                0
            }
            Err(e) => {
                warn!("malformed session token: {e}");
                SensorError::AccessFault("malformed session token".to_string()).status()
            }
        }
    }

    /// Runs one command. The returned payload echoes the input, with
    /// read-direction commands overwriting it.
    async fn command(&self, code: u32, payload: Vec<u8>) -> (i32, Vec<u8>) {
        let mut payload = payload;
        match self.dispatcher.dispatch(code, &mut payload).await {
            Ok(()) => (0, payload),
            Err(e) => (e.status(), payload),
        }
    }

    /// Display transition notification; `powerdown` is true when the panel
    /// is going dark.
    async fn display_blank(&self, powerdown: bool) {
        let transition = if powerdown {
            BlankTransition::Powerdown
        } else {
            BlankTransition::Unblank
        };
        self.observer.handle_transition(transition).await;
    }

    async fn suspend(&self) {
        self.device.on_suspend().await;
    }

    async fn resume(&self) {
        self.device.on_resume().await;
    }

    #[zbus(property)]
    async fn version(&self) -> String {
        self.version.clone()
    }

    #[zbus(property)]
    async fn available(&self) -> bool {
        self.device.is_available().await
    }
}
