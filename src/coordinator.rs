//! Daemon coordinator: wires the core together, owns the bus connection, and
//! drives the main loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use tokio::sync::broadcast::error::RecvError;

use crate::{
    board::BoardIo,
    config::ConfigManager,
    device::SensorDevice,
    dispatcher::CommandDispatcher,
    display::DisplayObserver,
    event::{EventChannel, EventTag},
    input::InputSink,
    interface::SensorInterface,
    irq::IrqController,
    task_manager::TaskManager,
    wake_guard::WakeGuard,
};

const DBUS_NAME: &str = "io.github.fpsensord";
const DBUS_PATH: &str = "/io/github/fpsensord";

struct SensorContext {
    device: Arc<SensorDevice>,
    dispatcher: Arc<CommandDispatcher>,
    observer: Arc<DisplayObserver>,
}

/// Owns every long-lived piece of the daemon.
pub struct SensorCoordinator {
    task_manager: TaskManager,
    events: EventChannel,
    context: Option<SensorContext>,
    connection: Option<zbus::Connection>,
}

impl Default for SensorCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorCoordinator {
    pub fn new() -> Self {
        Self {
            task_manager: TaskManager::new(),
            events: EventChannel::new(),
            context: None,
            connection: None,
        }
    }

    /// Builds the core from configuration and attaches it to the hardware.
    ///
    /// A failed hardware init is not fatal: the daemon stays up with the
    /// sensor unavailable, and a client can rebind it with the enable-gpio
    /// command.
    pub async fn initialize(
        &mut self,
        config_manager: ConfigManager,
        board: Arc<dyn BoardIo>,
        input: Arc<dyn InputSink>,
    ) -> Result<()> {
        info!("initializing sensor coordinator");

        let (capacity, hold) = {
            let cfg = config_manager.get().await;
            (cfg.event_capacity, Duration::from_millis(cfg.wake_hold_ms))
        };
        self.events = EventChannel::with_capacity(capacity);

        let wake = Arc::new(WakeGuard::new());
        let irq = Arc::new(IrqController::new(
            board.clone(),
            wake,
            self.events.clone(),
            hold,
        ));
        let device = Arc::new(SensorDevice::new(
            board,
            irq,
            config_manager.clone(),
        ));

        device.mark_attached().await;
        if let Err(e) = device.partial_reinit().await {
            warn!("hardware init failed, sensor stays unavailable until enable-gpio: {e}");
        }

        let dispatcher = Arc::new(CommandDispatcher::new(
            device.clone(),
            input,
            config_manager,
        ));
        let observer = Arc::new(DisplayObserver::new(device.clone(), self.events.clone()));

        self.context = Some(SensorContext {
            device,
            dispatcher,
            observer,
        });

        info!("sensor coordinator initialized");
        Ok(())
    }

    /// Exposes the control surface on the bus and starts the event
    /// forwarder.
    pub async fn serve(&mut self, version: &str) -> Result<()> {
        let Some(context) = &self.context else {
            bail!("coordinator not initialized");
        };

        let iface = SensorInterface {
            device: context.device.clone(),
            dispatcher: context.dispatcher.clone(),
            observer: context.observer.clone(),
            version: version.to_string(),
        };

        let connection = zbus::connection::Builder::session()
            .context("connecting to the session bus")?
            .name(DBUS_NAME)
            .context("requesting bus name")?
            .serve_at(DBUS_PATH, iface)
            .context("registering control surface")?
            .build()
            .await
            .context("establishing bus connection")?;

        let iface_ref = connection
            .object_server()
            .interface::<_, SensorInterface>(DBUS_PATH)
            .await
            .context("resolving served interface")?;

        let mut rx = self.events.subscribe();
        self.task_manager.spawn_task("event-forwarder", |token| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(tag) => {
                            let emitter = iface_ref.signal_emitter();
                            if let Err(e) =
                                SensorInterface::sensor_event(emitter, tag.as_byte()).await
                            {
                                warn!("failed to emit sensor event signal: {e}");
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!("event forwarder lagged by {n} events");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            Ok(())
        });

        self.connection = Some(connection);
        info!("control surface available at {DBUS_NAME}{DBUS_PATH}");
        Ok(())
    }

    /// Blocks until shutdown, logging sensor events as they pass.
    pub async fn run_main_loop(&mut self) -> Result<()> {
        let mut rx = self.events.subscribe();
        info!("entering main loop");

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => {
                            info!("received interrupt, shutting down");
                            self.shutdown().await;
                            break;
                        }
                        Err(e) => bail!("failed to listen for shutdown signal: {e}"),
                    }
                }

                event = rx.recv() => match event {
                    Ok(tag) => info!("sensor event: {tag:?}"),
                    Err(RecvError::Lagged(n)) => warn!("main loop lagged by {n} events"),
                    Err(RecvError::Closed) => bail!("event channel closed unexpectedly"),
                },
            }
        }

        info!("main loop terminated");
        Ok(())
    }

    /// Announces exit, stops the background tasks, and detaches from the
    /// hardware.
    pub async fn shutdown(&mut self) {
        self.events.publish(EventTag::Exit);

        if let Err(e) = self.task_manager.shutdown_all().await {
            log::error!("error during task shutdown: {e}");
        }

        if let Some(context) = &self.context {
            context.device.detach().await;
        }
        self.connection = None;
        info!("shutdown complete");
    }

    #[cfg(test)]
    pub(crate) fn device(&self) -> Option<&Arc<SensorDevice>> {
        self.context.as_ref().map(|c| &c.device)
    }

    #[cfg(test)]
    pub(crate) fn events(&self) -> &EventChannel {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::testing::MockBoard;
    use crate::config::{BoardCfg, Config};
    use crate::input::testing::RecordingSink;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn manager() -> ConfigManager {
        let mut config = Config::default();
        config.board = BoardCfg {
            chip: PathBuf::from("/dev/gpiochip0"),
            reset_line: Some(1),
            irq_line: Some(2),
            power_line: Some(3),
        };
        ConfigManager::new(config)
    }

    #[tokio::test]
    async fn initialize_attaches_and_binds_hardware() {
        let mut coordinator = SensorCoordinator::new();
        let board = Arc::new(MockBoard::new());

        coordinator
            .initialize(manager(), board.clone(), Arc::new(RecordingSink::new()))
            .await
            .unwrap();

        assert!(board.is_acquired());
        assert!(coordinator.device().unwrap().is_available().await);
    }

    #[tokio::test]
    async fn failed_hardware_init_leaves_daemon_running() {
        let mut coordinator = SensorCoordinator::new();
        let board = Arc::new(MockBoard::failing_acquire());

        coordinator
            .initialize(manager(), board, Arc::new(RecordingSink::new()))
            .await
            .unwrap();

        // Daemon is up, sensor is not.
        assert!(!coordinator.device().unwrap().is_available().await);
    }

    #[tokio::test]
    async fn shutdown_announces_exit_and_detaches() {
        let mut coordinator = SensorCoordinator::new();
        let board = Arc::new(MockBoard::new());
        coordinator
            .initialize(manager(), board.clone(), Arc::new(RecordingSink::new()))
            .await
            .unwrap();

        let mut rx = coordinator.events().subscribe();
        coordinator.shutdown().await;

        assert_eq!(rx.recv().await.unwrap(), EventTag::Exit);
        assert!(!board.is_acquired());
    }
}
