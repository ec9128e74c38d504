use crate::errors::TaskboardError;
use crate::runtime::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub state_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub monochrome: bool,
    pub exit_on_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub animation: AnimationConfig,
    pub display: DisplayConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnimationConfig {
    pub spinner_interval_ms: u64,
    pub pulse_interval_ms: u64,
    pub cursor_blink_ms: u64,
    pub number_animation_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayConfig {
    pub bar_width: usize,
    pub message_history: i64,
    pub monochrome: bool,
    pub exit_on_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotConfig {
    pub path: Option<PathBuf>,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            spinner_interval_ms: 80,
            pulse_interval_ms: 500,
            cursor_blink_ms: 530,
            number_animation_ms: 400,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            animation: AnimationConfig::default(),
            display: DisplayConfig {
                bar_width: 40,
                message_history: 5,
                monochrome: false,
                exit_on_complete: false,
            },
            snapshot: SnapshotConfig {
                path: None,
                poll_interval_ms: 250,
            },
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: 4096,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAppConfig {
    animation: Option<PartialAnimationConfig>,
    display: Option<PartialDisplayConfig>,
    snapshot: Option<PartialSnapshotConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAnimationConfig {
    spinner_interval_ms: Option<u64>,
    pulse_interval_ms: Option<u64>,
    cursor_blink_ms: Option<u64>,
    number_animation_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialDisplayConfig {
    bar_width: Option<usize>,
    message_history: Option<i64>,
    monochrome: Option<bool>,
    exit_on_complete: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialSnapshotConfig {
    path: Option<PathBuf>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
}

pub fn load_config(
    overrides: &CliOverrides,
    fs: &dyn FileSystem,
) -> Result<AppConfig, TaskboardError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| TaskboardError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(animation) = partial.animation {
        if let Some(value) = animation.spinner_interval_ms {
            cfg.animation.spinner_interval_ms = value;
        }
        if let Some(value) = animation.pulse_interval_ms {
            cfg.animation.pulse_interval_ms = value;
        }
        if let Some(value) = animation.cursor_blink_ms {
            cfg.animation.cursor_blink_ms = value;
        }
        if let Some(value) = animation.number_animation_ms {
            cfg.animation.number_animation_ms = value;
        }
    }

    if let Some(display) = partial.display {
        if let Some(value) = display.bar_width {
            cfg.display.bar_width = value;
        }
        if let Some(value) = display.message_history {
            cfg.display.message_history = value;
        }
        if let Some(value) = display.monochrome {
            cfg.display.monochrome = value;
        }
        if let Some(value) = display.exit_on_complete {
            cfg.display.exit_on_complete = value;
        }
    }

    if let Some(snapshot) = partial.snapshot {
        if let Some(path) = snapshot.path {
            cfg.snapshot.path = Some(path);
        }
        if let Some(value) = snapshot.poll_interval_ms {
            cfg.snapshot.poll_interval_ms = value;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(path) = &overrides.state_path {
        cfg.snapshot.path = Some(path.clone());
    }
    if let Some(path) = &overrides.log_path {
        cfg.logging.path = Some(path.clone());
    }
    if overrides.monochrome {
        cfg.display.monochrome = true;
    }
    if overrides.exit_on_complete {
        cfg.display.exit_on_complete = true;
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), TaskboardError> {
    let intervals = [
        ("animation.spinner_interval_ms", cfg.animation.spinner_interval_ms),
        ("animation.pulse_interval_ms", cfg.animation.pulse_interval_ms),
        ("animation.cursor_blink_ms", cfg.animation.cursor_blink_ms),
        ("snapshot.poll_interval_ms", cfg.snapshot.poll_interval_ms),
    ];
    for (key, value) in intervals {
        if value == 0 {
            return Err(TaskboardError::InvalidConfig(format!(
                "{key} must be greater than zero"
            )));
        }
    }

    if cfg.display.bar_width == 0 {
        return Err(TaskboardError::InvalidConfig(
            "display.bar_width must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
