use crate::runtime::KeyInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub key: char,
    pub action: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Quit,
}

/// Keys owned by the dashboard process itself.
pub const DASHBOARD_BINDINGS: [HotkeyBinding; 1] = [HotkeyBinding {
    key: 'q',
    action: "quit",
}];

/// Keys handled by the orchestrator's input collaborator. They are only
/// advertised here; the dashboard never acts on them.
pub const QUEUE_BINDINGS: [HotkeyBinding; 1] = [HotkeyBinding {
    key: 'a',
    action: "queue a task",
}];

pub fn dashboard_controls_legend() -> String {
    let mut bindings = QUEUE_BINDINGS.to_vec();
    bindings.extend(DASHBOARD_BINDINGS);
    format_bindings("Keys: ", &bindings)
}

pub fn queue_input_legend() -> String {
    "Enter submit  Esc cancel".to_string()
}

pub fn action_for_key(key: char) -> Option<HotkeyAction> {
    match key {
        'q' => Some(HotkeyAction::Quit),
        _ => None,
    }
}

pub fn action_for_input(input: KeyInput) -> Option<HotkeyAction> {
    match input {
        KeyInput::Interrupt => Some(HotkeyAction::Quit),
        KeyInput::Char(key) => action_for_key(key),
        KeyInput::Resize | KeyInput::Other => None,
    }
}

fn format_bindings(prefix: &str, bindings: &[HotkeyBinding]) -> String {
    let parts = bindings
        .iter()
        .map(|binding| format!("{} {}", binding.key, binding.action))
        .collect::<Vec<_>>();
    format!("{prefix}{}", parts.join("  "))
}

#[cfg(test)]
mod tests {
    use super::{action_for_input, action_for_key, dashboard_controls_legend, HotkeyAction};
    use crate::runtime::KeyInput;

    #[test]
    fn legend_lists_queue_and_quit_keys() {
        assert_eq!(dashboard_controls_legend(), "Keys: a queue a task  q quit");
    }

    #[test]
    fn only_quit_is_bound_locally() {
        assert_eq!(action_for_key('q'), Some(HotkeyAction::Quit));
        assert_eq!(action_for_key('a'), None);
        assert_eq!(action_for_input(KeyInput::Interrupt), Some(HotkeyAction::Quit));
        assert_eq!(action_for_input(KeyInput::Resize), None);
    }
}
