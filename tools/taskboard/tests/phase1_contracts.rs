use taskboard::aggregate::{
    bar_widths, next_reset_agent, progress_percentage, BarWidths, ProgressSummary,
};
use taskboard::config::{load_config, AppConfig, CliOverrides};
use taskboard::errors::TaskboardError;
use taskboard::format::{format_elapsed, format_tokens, truncate};
use taskboard::layout::compute_layout;
use taskboard::runtime::{
    Clock, FakeClock, FakeFileSystem, FakeTerminal, FileSystem, ProductionRuntime, Terminal,
};
use taskboard::snapshot::decode_snapshot;
use taskboard::types::{AgentState, MessageKind};
use taskboard::window::tail_window;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

const MID_RUN: &str = include_str!("fixtures/snapshots/mid-run.json");

fn runtime_with(fs: FakeFileSystem, terminal: FakeTerminal) -> ProductionRuntime {
    ProductionRuntime {
        clock: Arc::new(FakeClock::new(UNIX_EPOCH + Duration::from_secs(1_700_000_000))),
        file_system: Arc::new(fs),
        terminal: Arc::new(terminal),
    }
}

fn args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

#[test]
fn fixture_snapshot_decodes_every_field() {
    let state = decode_snapshot(MID_RUN).expect("decode");
    assert_eq!(state.feature_name, "auth-overhaul");
    assert_eq!(state.current_story_id(), Some("US-003"));
    assert_eq!(state.stories.len(), 10);
    assert_eq!(state.completed_count(), 3);
    assert_eq!(state.agents[2].label(), "gemini");
    assert_eq!(state.messages[2].kind, MessageKind::Error);
    assert_eq!(state.token_usage.map(|usage| usage.total), Some(12_345));
    assert_eq!(state.stories[9].phase, None);
}

#[test]
fn reference_scenarios_hold() {
    assert_eq!(tail_window(&["a", "b", "c", "d"], 2), &["c", "d"]);
    assert_eq!(progress_percentage(3, 10), 30);
    assert_eq!(bar_widths(3, 10, 40), BarWidths { filled: 12, empty: 28 });

    let plan = compute_layout(24, 120, 13);
    assert_eq!(plan.available_story_rows, 8);
    assert_eq!(plan.grid_rows, 7);
    assert_eq!(plan.visible_story_count(13), 13);

    assert_eq!(format_elapsed(125), "2m 5s");
    assert_eq!(format_elapsed(45), "45s");
    assert_eq!(format_tokens(999), "999");
    assert_eq!(format_tokens(12_345), "12.3k");
}

#[test]
fn derived_values_stay_in_range() {
    for total in 0..12usize {
        for completed in 0..15usize {
            let pct = progress_percentage(completed, total);
            assert!(pct <= 100);
            for width in [0usize, 1, 7, 40] {
                let bar = bar_widths(completed, total, width);
                assert_eq!(bar.filled + bar.empty, width);
            }
        }
    }
    for width in 0..12usize {
        let text = truncate("a fairly long story title", width);
        assert!(text.chars().count() <= width);
    }
    for rows in -5..40i64 {
        assert!(compute_layout(rows, 120, 50).available_story_rows >= 8);
    }
}

#[test]
fn progress_summary_counts_blocked_only_when_not_passing() {
    let state = decode_snapshot(MID_RUN).expect("decode");
    let summary = ProgressSummary::from_stories(&state.stories);
    assert_eq!(
        summary,
        ProgressSummary {
            completed: 3,
            blocked: 1,
            total: 10
        }
    );
}

#[test]
fn next_reset_prefers_earliest_then_name() {
    let agent = |name: &str, resets_at_ms: u64| AgentState {
        name: name.to_string(),
        rate_limited: true,
        resets_at_ms: Some(resets_at_ms),
        ..AgentState::default()
    };
    let agents = vec![agent("zed", 500), agent("amp", 500), agent("early", 100)];
    assert_eq!(next_reset_agent(&agents).map(|a| a.name.as_str()), Some("early"));
    assert_eq!(
        next_reset_agent(&agents[..2]).map(|a| a.name.as_str()),
        Some("amp")
    );
}

#[test]
fn config_file_and_cli_merge_in_order() {
    let fs = FakeFileSystem::with_file(
        "/taskboard.toml",
        include_str!("fixtures/configs/minimal.toml"),
    );
    let overrides = CliOverrides {
        config_path: Some(PathBuf::from("/taskboard.toml")),
        state_path: Some(PathBuf::from("/state.json")),
        ..CliOverrides::default()
    };
    let cfg = load_config(&overrides, &fs).expect("config");
    assert_eq!(cfg.display.bar_width, 20);
    assert_eq!(cfg.display.message_history, 3);
    assert_eq!(cfg.snapshot.path, Some(PathBuf::from("/state.json")));
    assert_eq!(cfg.animation, AppConfig::default().animation);
}

#[test]
fn invalid_config_is_rejected() {
    let fs = FakeFileSystem::with_file(
        "/taskboard.toml",
        include_str!("fixtures/configs/invalid.toml"),
    );
    let overrides = CliOverrides {
        config_path: Some(PathBuf::from("/taskboard.toml")),
        ..CliOverrides::default()
    };
    let err = load_config(&overrides, &fs).expect_err("invalid");
    assert!(matches!(err, TaskboardError::InvalidConfig(_)));
}

#[test]
fn fakes_behave_like_production_contracts() {
    let fs = FakeFileSystem::default();
    fs.write_string(Path::new("/a.json"), "{}").expect("write");
    assert!(fs.exists(Path::new("/a.json")));
    fs.set_fail_next(TaskboardError::Io("disk gone".to_string()));
    assert!(fs.read_to_string(Path::new("/a.json")).is_err());
    assert_eq!(fs.read_to_string(Path::new("/a.json")).expect("read"), "{}");

    let clock = FakeClock::default();
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_millis(250));

    let terminal = FakeTerminal::new(false);
    terminal.write_line("hello").expect("write");
    assert_eq!(terminal.written_lines(), vec!["hello".to_string()]);
    assert!(!terminal.stdin_is_tty());
}

#[test]
fn once_prints_a_plain_frame() {
    let fs = FakeFileSystem::with_file("/state.json", MID_RUN);
    let terminal = FakeTerminal::new(false);
    let runtime = runtime_with(fs, terminal.clone());
    let code = taskboard::run_with_runtime(
        &args(&["taskboard", "--once", "--state", "/state.json", "--width", "100", "--height", "30"]),
        &runtime,
    )
    .expect("run");
    assert_eq!(code, 0);
    let lines = terminal.written_lines();
    assert_eq!(lines.len(), 30);
    assert!(lines[0].starts_with("◆ TASKBOARD · auth-overhaul · iteration 4/20"));
    assert!(lines.iter().all(|line| line.chars().count() <= 100));
    assert!(lines.iter().any(|line| line.contains("next reset: Codex in 1m 30s")));
}

#[test]
fn once_without_state_renders_placeholders() {
    let terminal = FakeTerminal::new(false);
    let runtime = runtime_with(FakeFileSystem::default(), terminal.clone());
    taskboard::run_with_runtime(&args(&["taskboard", "--once"]), &runtime).expect("run");
    let text = terminal.written_lines().join("\n");
    assert!(text.contains("untitled run"));
    assert!(text.contains("no story in progress"));
    assert!(text.contains("waiting for output"));
}

#[test]
fn help_text_documents_the_flags() {
    let help = taskboard::render_help();
    assert!(help.contains("--state"));
    assert!(help.contains("Print a single frame as plain text and exit"));
}

#[test]
fn cli_errors_surface_as_cli_variant() {
    let runtime = runtime_with(FakeFileSystem::default(), FakeTerminal::new(false));
    let err = taskboard::run_with_runtime(&args(&["taskboard", "--bogus"]), &runtime)
        .expect_err("unknown flag");
    assert!(matches!(err, TaskboardError::Cli(_)));

    let err = taskboard::run_with_runtime(&args(&["taskboard", "--once", "--width", "0"]), &runtime)
        .expect_err("zero width");
    assert!(matches!(err, TaskboardError::Cli(_)));
}

#[test]
fn once_with_missing_state_file_fails() {
    let runtime = runtime_with(FakeFileSystem::default(), FakeTerminal::new(false));
    let err = taskboard::run_with_runtime(
        &args(&["taskboard", "--once", "--state", "/missing.json"]),
        &runtime,
    )
    .expect_err("missing");
    assert!(matches!(err, TaskboardError::Io(_)));
}

#[test]
fn live_run_exits_when_the_run_completes() {
    let fs = FakeFileSystem::with_file(
        "/state.json",
        include_str!("fixtures/snapshots/complete.json"),
    );
    let terminal = FakeTerminal::new(true);
    let runtime = runtime_with(fs, terminal.clone());
    let code = taskboard::run_with_runtime(
        &args(&["taskboard", "--state", "/state.json", "--exit-on-complete"]),
        &runtime,
    )
    .expect("run");
    assert_eq!(code, 0);
    assert_eq!(terminal.screen_events(), vec!["enter", "leave"]);
    let frames = terminal.drawn_frames();
    assert!(frames.last().expect("frame").contains("run complete"));
}
