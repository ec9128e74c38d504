use crate::aggregate::{
    bar_widths, next_reset_agent, progress_percentage, reset_countdown_seconds, ProgressSummary,
};
use crate::animation::AnimationPhase;
use crate::format::{
    clip_start_to_width, clip_to_width, display_width, format_clock, format_cost, format_elapsed,
    format_tokens, pad_right, pad_to_width, truncate,
};
use crate::hotkeys::{dashboard_controls_legend, queue_input_legend};
use crate::layout::{compute_layout, share_rows, LayoutPlan, PanelRows, STORY_GRID_COLUMNS};
use crate::render_tree::{buffer_to_string, render_to_buffer, Node};
use crate::theme::{PriorityTier, Theme};
use crate::types::{AgentAvailability, AgentState, DisplayState, Geometry, Story};
use crate::window::{tail_window, OUTPUT_WINDOW, QUEUE_WINDOW};
use ratatui::buffer::Buffer;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

pub const STORY_ID_WIDTH: usize = 8;
pub const PRIORITY_BADGE_WIDTH: usize = 3;
pub const AGENT_LABEL_WIDTH: usize = 10;
pub const WIDE_LEFT_PERCENT: u16 = 55;
pub const MIN_BAR_WIDTH: usize = 10;
pub const CURSOR_GLYPH: &str = "▌";
/// Agent footer and next-reset line, pinned below the panels.
pub const FOOTER_ROWS: usize = 2;
const PANEL_BORDER_ROWS: usize = 2;

/// Everything a render needs besides the snapshot, passed down explicitly.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub geometry: Geometry,
    pub phase: AnimationPhase,
    pub now_ms: u64,
    pub theme: &'a Theme,
    pub bar_width: usize,
    pub message_history: i64,
    /// Completed-story count as currently animated; the real count when `None`.
    pub displayed_completed: Option<usize>,
}

impl<'a> RenderContext<'a> {
    pub fn new(geometry: Geometry, theme: &'a Theme) -> Self {
        Self {
            geometry,
            phase: AnimationPhase::default(),
            now_ms: 0,
            theme,
            bar_width: 40,
            message_history: 5,
            displayed_completed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryStatus {
    Current,
    Blocked,
    Complete,
    Pending,
}

/// Current beats blocked beats complete beats pending.
pub fn story_status(story: &Story, current_id: Option<&str>) -> StoryStatus {
    if current_id == Some(story.id.as_str()) {
        StoryStatus::Current
    } else if story.blocked {
        StoryStatus::Blocked
    } else if story.passes {
        StoryStatus::Complete
    } else {
        StoryStatus::Pending
    }
}

pub fn render_frame(state: &DisplayState, ctx: &RenderContext<'_>) -> Buffer {
    let tree = compose_dashboard(state, ctx);
    render_to_buffer(&tree, ctx.geometry.columns, ctx.geometry.rows)
}

pub fn render_dashboard(state: &DisplayState, ctx: &RenderContext<'_>) -> String {
    buffer_to_string(&render_frame(state, ctx))
}

pub fn compose_dashboard(state: &DisplayState, ctx: &RenderContext<'_>) -> Node {
    let columns = usize::from(ctx.geometry.columns);
    let plan = compute_layout(
        i64::from(ctx.geometry.rows),
        i64::from(ctx.geometry.columns),
        state.stories.len(),
    );
    let summary = ProgressSummary::from_stories(&state.stories);

    let mut rows = vec![header_line(state, ctx), progress_line(&summary, ctx)];
    if let Some(error) = &state.error {
        rows.push(Node::text(Line::from(vec![
            Span::styled("✗ ", ctx.theme.error),
            Span::styled(error.clone(), ctx.theme.error),
        ])));
    }
    let budget = usize::from(ctx.geometry.rows).saturating_sub(rows.len() + FOOTER_ROWS);
    let panels = PanelSet {
        state,
        ctx,
        plan: &plan,
        summary: &summary,
    };

    let body = if plan.use_vertical_fallback {
        panels.stack(
            &[
                PanelKind::CurrentStory,
                PanelKind::Stories,
                PanelKind::Output,
                PanelKind::Queue,
                PanelKind::Messages,
            ],
            budget,
            columns.saturating_sub(2),
        )
    } else {
        let left = columns * usize::from(WIDE_LEFT_PERCENT) / 100;
        Node::Columns(vec![
            Node::column(
                WIDE_LEFT_PERCENT,
                panels.stack(
                    &[PanelKind::CurrentStory, PanelKind::Stories],
                    budget,
                    left.saturating_sub(2),
                ),
            ),
            Node::column(
                100 - WIDE_LEFT_PERCENT,
                panels.stack(
                    &[PanelKind::Output, PanelKind::Queue, PanelKind::Messages],
                    budget,
                    columns.saturating_sub(left).saturating_sub(3),
                ),
            ),
        ])
    };

    rows.push(Node::fill(body));
    rows.push(agent_status_line(&state.agents, ctx, columns));
    rows.push(next_reset_line(&state.agents, ctx));
    Node::Stack(rows)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelKind {
    CurrentStory,
    Stories,
    Output,
    Queue,
    Messages,
}

/// Everything the middle panels read, so a column can be built from a list
/// of panel kinds and a row budget.
struct PanelSet<'s, 'c> {
    state: &'s DisplayState,
    ctx: &'s RenderContext<'c>,
    plan: &'s LayoutPlan,
    summary: &'s ProgressSummary,
}

impl PanelSet<'_, '_> {
    /// Stacks `kinds` top to bottom inside `budget` rows. Panels shrink
    /// toward their minimum when rows are short and drop out entirely once
    /// even that does not fit.
    fn stack(&self, kinds: &[PanelKind], budget: usize, width: usize) -> Node {
        let kinds = kinds
            .iter()
            .copied()
            .filter(|kind| *kind != PanelKind::Messages || self.ctx.message_history > 0)
            .collect::<Vec<_>>();
        let wanted = kinds.iter().map(|kind| self.rows(*kind)).collect::<Vec<_>>();
        let shares = share_rows(budget, &wanted);
        let panels = kinds
            .iter()
            .zip(shares)
            .filter(|(_, rows)| *rows > 0)
            .map(|(kind, rows)| self.build(*kind, width, rows.saturating_sub(PANEL_BORDER_ROWS)))
            .collect();
        Node::Stack(panels)
    }

    fn rows(&self, kind: PanelKind) -> PanelRows {
        let framed = |body: usize| body + PANEL_BORDER_ROWS;
        match kind {
            PanelKind::CurrentStory => PanelRows::new(framed(2), framed(2)),
            PanelKind::Stories => PanelRows::new(framed(1), framed(self.plan.grid_rows.max(1))),
            PanelKind::Output => PanelRows::new(framed(1), framed(window_len(OUTPUT_WINDOW))),
            PanelKind::Queue => PanelRows::new(framed(1), framed(window_len(QUEUE_WINDOW) + 1)),
            PanelKind::Messages => {
                let shown = self
                    .state
                    .messages
                    .len()
                    .min(window_len(self.ctx.message_history));
                PanelRows::new(framed(1), framed(shown.max(1)))
            }
        }
    }

    fn build(&self, kind: PanelKind, width: usize, body_rows: usize) -> Node {
        let (state, ctx) = (self.state, self.ctx);
        match kind {
            PanelKind::CurrentStory => current_story_panel(state, ctx, width),
            PanelKind::Stories => {
                story_grid_panel(state, ctx, self.plan, self.summary, width, body_rows)
            }
            PanelKind::Output => output_panel(state, ctx, width, body_rows),
            PanelKind::Queue => queue_panel(state, ctx, width, body_rows),
            PanelKind::Messages => messages_panel(state, ctx, width, body_rows),
        }
    }
}

fn window_len(max_count: i64) -> usize {
    usize::try_from(max_count).unwrap_or(0)
}

/// Tail window of at most `max_count` items that also fits in `rows`.
fn tail_within<T>(items: &[T], max_count: i64, rows: usize) -> &[T] {
    let rows = i64::try_from(rows).unwrap_or(i64::MAX);
    tail_window(items, max_count.min(rows))
}

fn header_line(state: &DisplayState, ctx: &RenderContext<'_>) -> Node {
    let theme = ctx.theme;
    let feature = if state.feature_name.trim().is_empty() {
        "untitled run"
    } else {
        state.feature_name.as_str()
    };
    let mut spans = vec![
        Span::styled("◆ TASKBOARD", theme.title),
        Span::styled(" · ", theme.muted),
        Span::styled(feature.to_string(), theme.text.add_modifier(Modifier::BOLD)),
        Span::styled(" · ", theme.muted),
        Span::styled(
            format!("iteration {}/{}", state.iteration, state.max_iterations),
            theme.text,
        ),
    ];
    if let Some(usage) = state.token_usage {
        spans.push(Span::styled(" · ", theme.muted));
        spans.push(Span::styled(
            format!(
                "tokens {} (in {} / out {})",
                format_tokens(usage.total),
                format_tokens(usage.input),
                format_tokens(usage.output)
            ),
            theme.text,
        ));
    }
    if let Some(cost) = state.cost_usd {
        spans.push(Span::styled(" · ", theme.muted));
        spans.push(Span::styled(format_cost(cost), theme.text));
    }
    if state.complete {
        spans.push(Span::styled(" · ", theme.muted));
        spans.push(Span::styled("✓ complete", theme.success));
    }
    Node::text(Line::from(spans))
}

fn progress_line(summary: &ProgressSummary, ctx: &RenderContext<'_>) -> Node {
    let theme = ctx.theme;
    let shown = ctx
        .displayed_completed
        .unwrap_or(summary.completed)
        .min(summary.total);
    let room = usize::from(ctx.geometry.columns).saturating_sub(32);
    let bar_width = ctx.bar_width.min(room).max(MIN_BAR_WIDTH);
    let bar = bar_widths(shown, summary.total, bar_width);
    let mut spans = vec![
        Span::styled("[", theme.muted),
        Span::styled("█".repeat(bar.filled), theme.bar_filled),
        Span::styled("░".repeat(bar.empty), theme.bar_empty),
        Span::styled("] ", theme.muted),
        Span::styled(
            format!("{:>3}%", progress_percentage(shown, summary.total)),
            theme.text.add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {shown}/{} stories", summary.total), theme.text),
    ];
    if summary.blocked > 0 {
        spans.push(Span::styled(
            format!(" · {} blocked", summary.blocked),
            theme.warning,
        ));
    }
    Node::text(Line::from(spans))
}

fn current_story_panel(state: &DisplayState, ctx: &RenderContext<'_>, width: usize) -> Node {
    let theme = ctx.theme;
    let body = match &state.current_story {
        None if state.complete => Node::Stack(vec![
            Node::text(Line::styled("run complete", theme.success)),
            Node::text(Line::styled(
                format!("finished in {}", format_elapsed(state.elapsed_seconds)),
                theme.muted,
            )),
        ]),
        None => Node::Stack(vec![
            Node::text(Line::styled("no story in progress", theme.muted)),
            Node::Spacer(1),
        ]),
        Some(story) => {
            let glyph = ctx.phase.activity_glyph(state.running);
            let glyph_style = if state.running { theme.pulse_on } else { theme.muted };
            let mut first = CellBuilder::new(width);
            first.push(glyph, glyph_style);
            first.push(" ", theme.text);
            first.push(&story.id, theme.text.add_modifier(Modifier::BOLD));
            first.push("  ", theme.text);
            first.push_truncated(&story.title, theme.text);

            let mut second = CellBuilder::new(width);
            let status = if state.running { "running" } else { "waiting" };
            second.push(status, if state.running { theme.success } else { theme.warning });
            second.push(" · ", theme.muted);
            second.push(&format!("elapsed {}", format_elapsed(state.elapsed_seconds)), theme.text);
            if let Some(agent) = &state.current_agent {
                second.push(" · ", theme.muted);
                second.push(&format!("agent {agent}"), theme.text);
            }
            Node::Stack(vec![first.into_node(), second.into_node()])
        }
    };
    Node::panel("Current Story", theme.title, theme.border, body)
}

fn story_grid_panel(
    state: &DisplayState,
    ctx: &RenderContext<'_>,
    plan: &LayoutPlan,
    summary: &ProgressSummary,
    width: usize,
    body_rows: usize,
) -> Node {
    let theme = ctx.theme;
    let grid_rows = plan.grid_rows.min(body_rows);
    let visible = state.stories.len().min(grid_rows * STORY_GRID_COLUMNS);
    let hidden = state.stories.len() - visible;
    let mut title = format!("Stories {}/{}", summary.completed, summary.total);
    if hidden > 0 {
        title.push_str(&format!(" · +{hidden} not shown"));
    }

    if state.stories.is_empty() {
        return Node::panel(
            title,
            theme.title,
            theme.border,
            Node::text(Line::styled("no stories loaded", theme.muted)),
        );
    }

    let cell_width = width.saturating_sub(STORY_GRID_COLUMNS - 1) / STORY_GRID_COLUMNS;
    let current_id = state.current_story_id();
    let rows = state.stories[..visible]
        .chunks(STORY_GRID_COLUMNS)
        .map(|pair| {
            let mut spans = Vec::new();
            for (idx, story) in pair.iter().enumerate() {
                if idx > 0 {
                    spans.push(Span::raw(" "));
                }
                let mut cell = story_cell(story, story_status(story, current_id), ctx, cell_width);
                cell.pad();
                spans.extend(cell.spans);
            }
            Node::text(Line::from(spans))
        })
        .collect::<Vec<_>>();
    Node::panel(title, theme.title, theme.border, Node::Stack(rows))
}

fn story_cell(
    story: &Story,
    status: StoryStatus,
    ctx: &RenderContext<'_>,
    width: usize,
) -> CellBuilder {
    let theme = ctx.theme;
    let (glyph, glyph_style) = match status {
        StoryStatus::Current if ctx.phase.pulse_on => ("▶", theme.pulse_on),
        StoryStatus::Current => ("▷", theme.pulse_off),
        StoryStatus::Blocked => ("⊘", theme.error),
        StoryStatus::Complete => ("✓", theme.success),
        StoryStatus::Pending => ("○", theme.muted),
    };

    let mut badges = Vec::new();
    if story.research {
        badges.push(("[R]".to_string(), theme.pulse_off));
    }
    if story.blocked {
        badges.push(("[B]".to_string(), theme.error));
    }
    if let Some(phase) = story.phase.as_deref().filter(|phase| !phase.trim().is_empty()) {
        badges.push((format!("[{phase}]"), theme.muted));
    }
    let badge_width = badges
        .iter()
        .map(|(badge, _)| display_width(badge) + 1)
        .sum::<usize>();

    let title_style = match status {
        StoryStatus::Complete => theme.muted.add_modifier(Modifier::CROSSED_OUT),
        StoryStatus::Current => theme.text.add_modifier(Modifier::BOLD),
        StoryStatus::Blocked | StoryStatus::Pending => theme.text,
    };

    let mut cell = CellBuilder::new(width);
    cell.push(glyph, glyph_style);
    cell.push(" ", theme.text);
    cell.push(&pad_right(&story.id, STORY_ID_WIDTH), theme.text);
    cell.push(" ", theme.text);
    cell.push(
        &pad_right(&format!("P{}", story.priority), PRIORITY_BADGE_WIDTH),
        theme.priority(PriorityTier::for_priority(story.priority)),
    );
    cell.push(" ", theme.text);
    let title_room = cell.remaining().saturating_sub(badge_width);
    cell.push(&truncate(&story.title, title_room), title_style);
    for (badge, style) in badges {
        cell.push(" ", theme.text);
        cell.push(&badge, style);
    }
    cell
}

fn output_panel(state: &DisplayState, ctx: &RenderContext<'_>, width: usize, body_rows: usize) -> Node {
    let theme = ctx.theme;
    let window = tail_within(&state.output_lines, OUTPUT_WINDOW, body_rows);
    let mut rows = window
        .iter()
        .map(|line| Node::text(Line::styled(truncate(line, width), theme.text)))
        .collect::<Vec<_>>();
    if rows.is_empty() {
        rows.push(Node::text(Line::styled("waiting for output", theme.muted)));
    }
    pad_rows(&mut rows, body_rows);
    Node::panel("Output", theme.title, theme.border, Node::Stack(rows))
}

/// The input line is always the last row; queued items get what is left.
fn queue_panel(state: &DisplayState, ctx: &RenderContext<'_>, width: usize, body_rows: usize) -> Node {
    let theme = ctx.theme;
    let item_rows = body_rows.saturating_sub(1);
    let window = tail_within(&state.queue_items, QUEUE_WINDOW, item_rows);
    let mut rows = window
        .iter()
        .map(|item| Node::text(Line::styled(truncate(&format!("• {item}"), width), theme.text)))
        .collect::<Vec<_>>();
    if rows.is_empty() && item_rows > 0 {
        rows.push(Node::text(Line::styled("no queued tasks", theme.muted)));
    }
    pad_rows(&mut rows, item_rows);
    rows.push(queue_input_line(state, ctx, width));
    Node::panel(
        format!("Queue ({})", state.queue_items.len()),
        theme.title,
        theme.border,
        Node::Stack(rows),
    )
}

fn queue_input_line(state: &DisplayState, ctx: &RenderContext<'_>, width: usize) -> Node {
    let theme = ctx.theme;
    if !state.queue_input_active {
        return Node::text(Line::styled(truncate(&dashboard_controls_legend(), width), theme.muted));
    }
    // Keep the end of the buffer, where the cursor is, in view.
    let visible = clip_start_to_width(&state.queue_input_buffer, width.saturating_sub(3));
    let cursor = if ctx.phase.cursor_visible { CURSOR_GLYPH } else { " " };
    let mut line = CellBuilder::new(width);
    line.push("> ", theme.title);
    line.push(&visible, theme.text);
    line.push(cursor, theme.cursor);
    line.push("  ", theme.text);
    line.push_truncated(&queue_input_legend(), theme.muted);
    line.into_node()
}

fn messages_panel(state: &DisplayState, ctx: &RenderContext<'_>, width: usize, body_rows: usize) -> Node {
    let theme = ctx.theme;
    let window = tail_within(&state.messages, ctx.message_history, body_rows);
    let mut rows = window
        .iter()
        .map(|message| {
            let mut line = CellBuilder::new(width);
            line.push(&format_clock(message.timestamp_ms), theme.muted);
            line.push(" ", theme.text);
            line.push(&pad_right(message.kind.as_str(), 7), theme.message(message.kind));
            line.push(" ", theme.text);
            line.push_truncated(&message.content, theme.text);
            line.into_node()
        })
        .collect::<Vec<_>>();
    if rows.is_empty() {
        rows.push(Node::text(Line::styled("no messages", theme.muted)));
    }
    Node::panel("Messages", theme.title, theme.border, Node::Stack(rows))
}

fn agent_status_line(agents: &[AgentState], ctx: &RenderContext<'_>, width: usize) -> Node {
    let theme = ctx.theme;
    let mut line = CellBuilder::new(width);
    line.push("Agents ", theme.title);
    if agents.is_empty() {
        line.push("no agents registered", theme.muted);
        return line.into_node();
    }
    for agent in agents {
        let (glyph, style) = match agent.availability() {
            AgentAvailability::Active => ("●", theme.success),
            AgentAvailability::RateLimited => ("◐", theme.warning),
            AgentAvailability::Idle => ("○", theme.muted),
        };
        line.push(" ", theme.text);
        line.push(glyph, style);
        line.push(" ", theme.text);
        let label = match (agent.availability(), agent.resets_at_ms) {
            (AgentAvailability::RateLimited, Some(resets_at)) => format!(
                "{} {}",
                agent.label(),
                format_elapsed(reset_countdown_seconds(resets_at, ctx.now_ms))
            ),
            _ => agent.label().to_string(),
        };
        line.push(&pad_to_width(&label, AGENT_LABEL_WIDTH), style);
    }
    line.into_node()
}

fn next_reset_line(agents: &[AgentState], ctx: &RenderContext<'_>) -> Node {
    let theme = ctx.theme;
    if let Some(agent) = next_reset_agent(agents) {
        let seconds = agent
            .resets_at_ms
            .map(|resets_at| reset_countdown_seconds(resets_at, ctx.now_ms))
            .unwrap_or(0);
        return Node::text(Line::from(vec![
            Span::styled("next reset: ", theme.muted),
            Span::styled(agent.label().to_string(), theme.warning),
            Span::styled(format!(" in {}", format_elapsed(seconds)), theme.text),
        ]));
    }
    if agents.iter().any(|agent| agent.rate_limited && !agent.active) {
        return Node::text(Line::styled("rate limited, reset time unknown", theme.warning));
    }
    Node::text(Line::styled("all agents available", theme.muted))
}

fn pad_rows(rows: &mut Vec<Node>, target: usize) {
    if rows.len() < target {
        let missing = u16::try_from(target - rows.len()).unwrap_or(u16::MAX);
        rows.push(Node::Spacer(missing));
    }
}

/// Builds one row of spans that never grows past its declared width.
struct CellBuilder {
    spans: Vec<Span<'static>>,
    used: usize,
    width: usize,
}

impl CellBuilder {
    fn new(width: usize) -> Self {
        Self {
            spans: Vec::new(),
            used: 0,
            width,
        }
    }

    fn remaining(&self) -> usize {
        self.width - self.used
    }

    /// Hard cut, used for fixed-width fields.
    fn push(&mut self, text: &str, style: Style) {
        let clipped = clip_to_width(text, self.remaining());
        self.append(clipped, style);
    }

    /// Ellipsis cut, used for free text.
    fn push_truncated(&mut self, text: &str, style: Style) {
        let clipped = truncate(text, self.remaining());
        self.append(clipped, style);
    }

    fn append(&mut self, text: String, style: Style) {
        if text.is_empty() {
            return;
        }
        self.used += display_width(&text);
        self.spans.push(Span::styled(text, style));
    }

    fn pad(&mut self) {
        let fill = self.remaining();
        if fill > 0 {
            self.append(" ".repeat(fill), Style::default());
        }
    }

    fn into_node(self) -> Node {
        Node::text(Line::from(self.spans))
    }
}
