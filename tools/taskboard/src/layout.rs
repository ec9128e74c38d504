use crate::window::OUTPUT_WINDOW;

/// Header, progress and feature lines, current-story block, output header,
/// agent footer and padding.
pub const CHROME_ROWS: i64 = 11;
pub const OUTPUT_PANEL_ROWS: i64 = OUTPUT_WINDOW;
pub const MIN_STORY_ROWS: i64 = 8;
pub const VERTICAL_FALLBACK_COLUMNS: i64 = 100;
pub const STORY_GRID_COLUMNS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPlan {
    pub available_story_rows: usize,
    pub grid_rows: usize,
    pub use_vertical_fallback: bool,
}

impl LayoutPlan {
    pub fn visible_story_count(&self, story_count: usize) -> usize {
        story_count.min(self.grid_rows * STORY_GRID_COLUMNS)
    }
}

pub fn available_story_rows(terminal_rows: i64) -> usize {
    let budget = terminal_rows
        .saturating_sub(CHROME_ROWS)
        .saturating_sub(OUTPUT_PANEL_ROWS)
        .max(MIN_STORY_ROWS);
    usize::try_from(budget).unwrap_or(usize::MAX)
}

pub fn grid_rows_needed(story_count: usize) -> usize {
    story_count.div_ceil(STORY_GRID_COLUMNS)
}

/// Rows one stacked panel needs at the very least and would like to have,
/// borders included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelRows {
    pub min: usize,
    pub wanted: usize,
}

impl PanelRows {
    pub fn new(min: usize, wanted: usize) -> Self {
        Self {
            min,
            wanted: wanted.max(min),
        }
    }
}

/// Splits `budget` rows between panels stacked in the given order.
///
/// Panels first get their minimum, in order, while rows remain; a panel whose
/// minimum no longer fits gets nothing and is left out. Leftover rows are then
/// dealt one at a time, round robin, until every panel has what it wants.
pub fn share_rows(budget: usize, panels: &[PanelRows]) -> Vec<usize> {
    let mut left = budget;
    let mut rows = Vec::with_capacity(panels.len());
    for panel in panels {
        if panel.min <= left {
            left -= panel.min;
            rows.push(panel.min);
        } else {
            rows.push(0);
        }
    }
    while left > 0 {
        let mut grew = false;
        for (share, panel) in rows.iter_mut().zip(panels) {
            if left > 0 && *share > 0 && *share < panel.wanted {
                *share += 1;
                left -= 1;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    rows
}

/// Row budget and layout variant for one render. Short terminals still get
/// the minimum story budget and overflow instead of collapsing the grid.
pub fn compute_layout(terminal_rows: i64, terminal_columns: i64, story_count: usize) -> LayoutPlan {
    let available = available_story_rows(terminal_rows);
    LayoutPlan {
        available_story_rows: available,
        grid_rows: grid_rows_needed(story_count).min(available),
        use_vertical_fallback: terminal_columns < VERTICAL_FALLBACK_COLUMNS,
    }
}
