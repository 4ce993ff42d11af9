//! # fpsensord
//!
//! A Linux daemon managing a GPIO-wired fingerprint sensor.
//!
//! ## Features
//!
//! - **Async Architecture**: Built on Tokio; the interrupt path never blocks
//! - **Event-Driven**: Sensor events fan out over a broadcast channel
//! - **Session Tracking**: Reference-counted client sessions with teardown
//!   on last release
//! - **Command Surface**: ioctl-style command table exposed over D-Bus
//! - **Virtual Input**: Key and gesture events delivered through uinput
//! - **Display Awareness**: Blank/unblank transitions gated on availability
//!
//! ## Architecture
//!
//! - [`SensorCoordinator`](coordinator::SensorCoordinator) — lifecycle manager
//! - [`EventChannel`](event::EventChannel) — event fan-out
//! - [`SensorDevice`](device::SensorDevice) — the device registry
//! - [`CommandDispatcher`](dispatcher::CommandDispatcher) — command execution
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fpsensord::{application::Application, config::ConfigManager};
//! use fpsensord::drivers::{gpio_board::GpioBoard, uinput_sink::UinputSink};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config_manager = ConfigManager::load(None).await?;
//!     let input_name = config_manager.get().await.input_device_name.clone();
//!     Application::builder()
//!         .with_config_manager(config_manager)
//!         .with_board(Arc::new(GpioBoard::new()))
//!         .with_input(Arc::new(UinputSink::create(&input_name)?))
//!         .build()?
//!         .run()
//!         .await
//! }
//! ```

pub mod application;
pub mod board;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod dispatcher;
pub mod display;
pub mod drivers;
pub mod error;
pub mod event;
pub mod input;
pub mod interface;
pub mod irq;
pub mod keymap;
pub mod task_manager;
pub mod wake_guard;
