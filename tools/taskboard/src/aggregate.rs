use crate::types::{AgentState, Story};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarWidths {
    pub filled: usize,
    pub empty: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSummary {
    pub completed: usize,
    pub blocked: usize,
    pub total: usize,
}

impl ProgressSummary {
    pub fn from_stories(stories: &[Story]) -> Self {
        Self {
            completed: stories.iter().filter(|story| story.passes).count(),
            blocked: stories
                .iter()
                .filter(|story| story.blocked && !story.passes)
                .count(),
            total: stories.len(),
        }
    }
}

fn completion_ratio(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed.min(total) as f64 / total as f64
}

pub fn progress_percentage(completed: usize, total: usize) -> u8 {
    (completion_ratio(completed, total) * 100.0).round().clamp(0.0, 100.0) as u8
}

pub fn bar_widths(completed: usize, total: usize, bar_width: usize) -> BarWidths {
    let filled = ((completion_ratio(completed, total) * bar_width as f64).round() as usize)
        .min(bar_width);
    BarWidths {
        filled,
        empty: bar_width - filled,
    }
}

/// The rate-limited agent whose limit lifts first. Equal timestamps resolve to
/// the agent whose name sorts first, so the choice is stable across renders.
pub fn next_reset_agent(agents: &[AgentState]) -> Option<&AgentState> {
    agents
        .iter()
        .filter_map(|agent| match (agent.rate_limited, agent.resets_at_ms) {
            (true, Some(resets_at)) => Some((resets_at, agent)),
            _ => None,
        })
        .min_by(|(left_at, left), (right_at, right)| {
            left_at.cmp(right_at).then_with(|| left.name.cmp(&right.name))
        })
        .map(|(_, agent)| agent)
}

/// Whole seconds until `resets_at_ms`, rounded up and never negative.
pub fn reset_countdown_seconds(resets_at_ms: u64, now_ms: u64) -> u64 {
    resets_at_ms.saturating_sub(now_ms).div_ceil(1_000)
}

#[cfg(test)]
mod tests {
    use super::{
        bar_widths, next_reset_agent, progress_percentage, reset_countdown_seconds, BarWidths,
        ProgressSummary,
    };
    use crate::types::{AgentState, Story};

    fn limited(name: &str, resets_at_ms: Option<u64>) -> AgentState {
        AgentState {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            active: false,
            rate_limited: true,
            resets_at_ms,
        }
    }

    #[test]
    fn percentage_stays_in_range() {
        for total in 0..30 {
            for completed in 0..=total {
                assert!(progress_percentage(completed, total) <= 100);
            }
        }
        assert_eq!(progress_percentage(3, 10), 30);
        assert_eq!(progress_percentage(0, 0), 0);
        assert_eq!(progress_percentage(12, 10), 100);
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(2, 3), 67);
    }

    #[test]
    fn bar_segments_always_fill_the_width() {
        for width in 0..50 {
            for total in 0..12 {
                for completed in 0..=total + 2 {
                    let bar = bar_widths(completed, total, width);
                    assert_eq!(bar.filled + bar.empty, width);
                }
            }
        }
        assert_eq!(bar_widths(3, 10, 40), BarWidths { filled: 12, empty: 28 });
        assert_eq!(bar_widths(0, 0, 40), BarWidths { filled: 0, empty: 40 });
    }

    #[test]
    fn earliest_reset_wins() {
        let agents = vec![limited("a", Some(2_000)), limited("b", Some(1_000))];
        assert_eq!(next_reset_agent(&agents).map(|a| a.name.as_str()), Some("b"));
    }

    #[test]
    fn equal_resets_break_ties_by_name() {
        let agents = vec![limited("zeta", Some(1_000)), limited("alpha", Some(1_000))];
        assert_eq!(
            next_reset_agent(&agents).map(|a| a.name.as_str()),
            Some("alpha")
        );
    }

    #[test]
    fn agents_without_reset_or_limit_are_ignored() {
        let mut not_limited = limited("early", Some(10));
        not_limited.rate_limited = false;
        let agents = vec![not_limited, limited("unknown", None), limited("late", Some(99))];
        assert_eq!(
            next_reset_agent(&agents).map(|a| a.name.as_str()),
            Some("late")
        );
        assert!(next_reset_agent(&[limited("x", None)]).is_none());
    }

    #[test]
    fn countdown_rounds_up_and_saturates() {
        assert_eq!(reset_countdown_seconds(10_000, 0), 10);
        assert_eq!(reset_countdown_seconds(10_001, 0), 11);
        assert_eq!(reset_countdown_seconds(5_000, 9_000), 0);
    }

    #[test]
    fn summary_counts_blocked_only_when_unfinished() {
        let stories = vec![
            Story {
                id: "a".to_string(),
                passes: true,
                blocked: true,
                ..Story::default()
            },
            Story {
                id: "b".to_string(),
                blocked: true,
                ..Story::default()
            },
            Story {
                id: "c".to_string(),
                ..Story::default()
            },
        ];
        assert_eq!(
            ProgressSummary::from_stories(&stories),
            ProgressSummary {
                completed: 1,
                blocked: 1,
                total: 3
            }
        );
    }
}
