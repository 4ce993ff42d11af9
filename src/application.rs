//! Application entry point and builder.

use std::sync::Arc;

use anyhow::Result;

use crate::{
    board::BoardIo, config::ConfigManager, coordinator::SensorCoordinator, input::InputSink,
};

/// Top-level daemon lifecycle: initialize the core, expose the control
/// surface, then block in the main loop until shutdown.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use fpsensord::application::Application;
/// use fpsensord::config::ConfigManager;
/// use fpsensord::drivers::{gpio_board::GpioBoard, uinput_sink::UinputSink};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config_manager = ConfigManager::load(None).await?;
/// let input_name = config_manager.get().await.input_device_name.clone();
///
/// Application::builder()
///     .with_config_manager(config_manager)
///     .with_board(Arc::new(GpioBoard::new()))
///     .with_input(Arc::new(UinputSink::create(&input_name)?))
///     .build()?
///     .run()
///     .await
/// # }
/// ```
pub struct Application {
    pub coordinator: SensorCoordinator,
    config_manager: ConfigManager,
    board: Arc<dyn BoardIo>,
    input: Arc<dyn InputSink>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Runs the complete daemon lifecycle.
    pub async fn run(&mut self) -> Result<()> {
        self.coordinator
            .initialize(
                self.config_manager.clone(),
                self.board.clone(),
                self.input.clone(),
            )
            .await?;

        self.coordinator
            .serve(env!("CARGO_PKG_VERSION"))
            .await?;

        self.coordinator.run_main_loop().await
    }
}

/// Fluent construction of an [`Application`].
pub struct ApplicationBuilder {
    config_manager: Option<ConfigManager>,
    board: Option<Arc<dyn BoardIo>>,
    input: Option<Arc<dyn InputSink>>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            config_manager: None,
            board: None,
            input: None,
        }
    }

    pub fn with_config_manager(mut self, config_manager: ConfigManager) -> Self {
        self.config_manager = Some(config_manager);
        self
    }

    pub fn with_board(mut self, board: Arc<dyn BoardIo>) -> Self {
        self.board = Some(board);
        self
    }

    pub fn with_input(mut self, input: Arc<dyn InputSink>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn build(self) -> Result<Application> {
        let config_manager = self
            .config_manager
            .ok_or_else(|| anyhow::anyhow!("Configuration manager is required"))?;
        let board = self
            .board
            .ok_or_else(|| anyhow::anyhow!("Board backend is required"))?;
        let input = self
            .input
            .ok_or_else(|| anyhow::anyhow!("Input sink is required"))?;

        Ok(Application {
            coordinator: SensorCoordinator::new(),
            config_manager,
            board,
            input,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::testing::MockBoard;
    use crate::config::Config;
    use crate::input::testing::RecordingSink;

    #[test]
    fn builder_requires_all_parts() {
        assert!(Application::builder().build().is_err());

        let partial = Application::builder()
            .with_config_manager(ConfigManager::new(Config::default()))
            .with_board(Arc::new(MockBoard::new()));
        assert!(partial.build().is_err());
    }

    #[test]
    fn builder_assembles_a_complete_application() {
        let app = Application::builder()
            .with_config_manager(ConfigManager::new(Config::default()))
            .with_board(Arc::new(MockBoard::new()))
            .with_input(Arc::new(RecordingSink::new()))
            .build();
        assert!(app.is_ok());
    }
}
