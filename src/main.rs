use std::{fs::File, sync::Arc};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use daemonize::Daemonize;
use log::LevelFilter;
use syslog::{BasicLogger, Facility, Formatter3164};

use fpsensord::{
    application::Application,
    cli::Cli,
    config::ConfigManager,
    drivers::{gpio_board::GpioBoard, uinput_sink::UinputSink},
};

fn init_log() -> Result<()> {
    syslog::unix(Formatter3164 {
        facility: Facility::LOG_USER,
        hostname: None,
        process: "fpsensord".into(),
        pid: 0,
    })
    .map_err(|e| anyhow!("{e}"))
    .and_then(|logger| {
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|_| log::set_max_level(LevelFilter::Info))
            .map_err(|e| anyhow!("{e}"))
    })
}

fn into_daemon() -> Result<()> {
    File::create("/var/tmp/fpsensord.log")
        .and_then(|out| Ok((out.try_clone()?, out)))
        .map_err(|e| anyhow!("{e}"))
        .and_then(|(stderr, stdout)| {
            Daemonize::new()
                .stdout(stdout)
                .stderr(stderr)
                .start()
                .map_err(|e| anyhow!("{e}"))
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_log()?;
    if cli.daemonize {
        into_daemon()?;
    }

    let config_manager = ConfigManager::load(cli.config).await?;
    let input_name = config_manager.get().await.input_device_name.clone();

    let board = Arc::new(GpioBoard::new());
    let input = Arc::new(
        UinputSink::create(&input_name)
            .context("virtual input device allocation failed")?,
    );

    Application::builder()
        .with_config_manager(config_manager)
        .with_board(board)
        .with_input(input)
        .build()?
        .run()
        .await
}
