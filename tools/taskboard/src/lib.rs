pub mod aggregate;
pub mod animation;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod format;
pub mod hotkeys;
pub mod layout;
pub mod logging;
pub mod render_tree;
pub mod runtime;
pub mod snapshot;
pub mod theme;
pub mod tui;
pub mod types;
pub mod window;

use clap::{error::ErrorKind, CommandFactory, Parser};
use config::{load_config, AppConfig, CliOverrides};
use dashboard::{Dashboard, DashboardOptions};
use errors::TaskboardError;
use runtime::{epoch_millis, ProductionRuntime};
use snapshot::{decode_snapshot, FileSnapshotSource, SnapshotSource, StaticSnapshotSource};
use theme::Theme;
use tui::{render_dashboard, RenderContext};
use types::{DisplayState, Geometry};

pub const DEFAULT_GEOMETRY: Geometry = Geometry {
    columns: 120,
    rows: 30,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "taskboard")]
#[command(version)]
#[command(about = "Live terminal dashboard for a multi-agent task run")]
pub struct Cli {
    /// TOML config file.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    /// JSON snapshot file rewritten by the orchestrator.
    #[arg(long)]
    pub state: Option<std::path::PathBuf>,
    /// Print a single frame as plain text and exit.
    #[arg(long, default_value_t = false)]
    pub once: bool,
    #[arg(long)]
    pub width: Option<u16>,
    #[arg(long)]
    pub height: Option<u16>,
    #[arg(long, default_value_t = false)]
    pub exit_on_complete: bool,
    /// Append JSON-lines session events here.
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
    #[arg(long, default_value_t = false)]
    pub monochrome: bool,
}

pub fn run() -> Result<i32, TaskboardError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    runtime: &ProductionRuntime,
) -> Result<i32, TaskboardError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(TaskboardError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        state_path: cli.state.clone(),
        log_path: cli.log_file.clone(),
        monochrome: cli.monochrome
            || theme::no_color_requested(std::env::var_os("NO_COLOR").as_deref()),
        exit_on_complete: cli.exit_on_complete,
    };
    let cfg = load_config(&overrides, runtime.file_system.as_ref())?;
    let fixed_geometry = fixed_geometry(&cli, runtime)?;

    if cli.once {
        let state = load_state_once(&cfg, runtime)?;
        let geometry = fixed_geometry.unwrap_or(DEFAULT_GEOMETRY);
        for line in render_once(&state, &cfg, geometry, epoch_millis(runtime.clock.now())).lines() {
            runtime.terminal.write_line(line.trim_end())?;
        }
        return Ok(0);
    }

    let mut source: Box<dyn SnapshotSource> = match &cfg.snapshot.path {
        Some(path) => Box::new(FileSnapshotSource::new(path, runtime.file_system.clone())),
        None => Box::new(StaticSnapshotSource::new(DisplayState::default())),
    };
    let dashboard = Dashboard::new(&cfg, runtime.clock.as_ref(), runtime.terminal.as_ref());
    let options = DashboardOptions {
        max_frames: None,
        geometry: fixed_geometry,
    };
    dashboard.run(source.as_mut(), &options)?;
    Ok(0)
}

/// Plain-text frame for `--once`, with colours dropped.
pub fn render_once(state: &DisplayState, cfg: &AppConfig, geometry: Geometry, now_ms: u64) -> String {
    let theme = Theme::monochrome();
    let ctx = RenderContext {
        now_ms,
        bar_width: cfg.display.bar_width,
        message_history: cfg.display.message_history,
        ..RenderContext::new(geometry, &theme)
    };
    render_dashboard(state, &ctx)
}

pub fn render_help() -> String {
    let mut cmd = Cli::command();
    cmd.render_long_help().to_string()
}

fn fixed_geometry(cli: &Cli, runtime: &ProductionRuntime) -> Result<Option<Geometry>, TaskboardError> {
    if cli.width.is_none() && cli.height.is_none() {
        return Ok(None);
    }
    if cli.width == Some(0) || cli.height == Some(0) {
        return Err(TaskboardError::Cli(
            "--width and --height must be greater than zero".to_string(),
        ));
    }
    let base = if cli.once {
        DEFAULT_GEOMETRY
    } else {
        runtime.terminal.size()?
    };
    Ok(Some(Geometry::new(
        cli.width.unwrap_or(base.columns),
        cli.height.unwrap_or(base.rows),
    )))
}

fn load_state_once(cfg: &AppConfig, runtime: &ProductionRuntime) -> Result<DisplayState, TaskboardError> {
    match &cfg.snapshot.path {
        Some(path) => decode_snapshot(&runtime.file_system.read_to_string(path)?),
        None => Ok(DisplayState::default()),
    }
}
