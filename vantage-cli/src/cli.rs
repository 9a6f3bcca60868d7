use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use vantage_core::DEFAULT_CONFIG_PATH;
use vantage_eye::VisionConfig;

#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(about = "Vision node: tracks retro-reflective targets and publishes them to the control bus", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Node configuration file
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Replay recorded contour frames (JSON lines) on the first camera
    #[arg(long, value_name = "FILE")]
    pub contours: Option<PathBuf>,

    /// Delay between replayed frames
    #[arg(long, value_name = "N")]
    pub frame_interval_ms: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", value_parser = parse_level)]
    pub log_level: Level,

    /// Bus table for the first camera's target entries
    #[arg(long, value_name = "NAME")]
    pub table: Option<String>,
}

impl Cli {
    pub fn vision_config(&self) -> VisionConfig {
        let mut config = VisionConfig::default();
        if let Some(table) = &self.table {
            config.table_name = table.clone();
        }
        config
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

fn parse_level(s: &str) -> Result<Level, String> {
    s.parse::<Level>()
        .map_err(|_| format!("unknown log level '{}'", s))
}
