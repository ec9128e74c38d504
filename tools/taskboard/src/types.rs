use serde::{Deserialize, Deserializer, Serialize};

/// Snapshot of an orchestration run as handed over by the orchestrator.
///
/// Every collection tolerates being absent or `null` in the wire form, so a
/// structurally valid snapshot always renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayState {
    #[serde(deserialize_with = "null_as_default")]
    pub feature_name: String,
    pub current_agent: Option<String>,
    pub current_story: Option<Story>,
    #[serde(deserialize_with = "null_as_default")]
    pub elapsed_seconds: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub running: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub output_lines: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub queue_items: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub queue_input_active: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub queue_input_buffer: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stories: Vec<Story>,
    #[serde(deserialize_with = "null_as_default")]
    pub agents: Vec<AgentState>,
    #[serde(deserialize_with = "null_as_default")]
    pub iteration: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub max_iterations: u32,
    pub error: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub complete: bool,
    pub token_usage: Option<TokenUsage>,
    pub cost_usd: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub messages: Vec<MessageItem>,
}

impl DisplayState {
    pub fn completed_count(&self) -> usize {
        self.stories.iter().filter(|story| story.passes).count()
    }

    pub fn current_story_id(&self) -> Option<&str> {
        self.current_story.as_ref().map(|story| story.id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Story {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub priority: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub passes: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub blocked: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub research: bool,
    pub phase: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentState {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub active: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub rate_limited: bool,
    pub resets_at_ms: Option<u64>,
}

impl AgentState {
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    pub fn availability(&self) -> AgentAvailability {
        if self.active {
            AgentAvailability::Active
        } else if self.rate_limited {
            AgentAvailability::RateLimited
        } else {
            AgentAvailability::Idle
        }
    }
}

/// What the footer shows for an agent. An active agent is never displayed as
/// blocked, even if the orchestrator still carries a stale limit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentAvailability {
    Active,
    RateLimited,
    Idle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Command,
    Prompt,
    System,
    Info,
    Success,
    Error,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Prompt => "prompt",
            Self::System => "system",
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageItem {
    #[serde(default)]
    pub timestamp_ms: u64,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
}

/// Terminal size polled right before a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub columns: u16,
    pub rows: u16,
}

impl Geometry {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self { columns, rows }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::{AgentAvailability, AgentState, DisplayState, MessageKind};

    #[test]
    fn null_and_missing_collections_decode_as_empty() {
        let state: DisplayState =
            serde_json::from_str(r#"{"feature_name":"auth","stories":null,"agents":null}"#)
                .expect("decode");
        assert_eq!(state.feature_name, "auth");
        assert!(state.stories.is_empty());
        assert!(state.agents.is_empty());
        assert!(state.output_lines.is_empty());
        assert!(state.current_story.is_none());
    }

    #[test]
    fn null_keys_decode_as_empty_instead_of_rejecting_the_snapshot() {
        let state: DisplayState = serde_json::from_str(
            r#"{"stories":[{"id":null,"title":"orphan"}],"agents":[{"name":null,"active":true}]}"#,
        )
        .expect("decode");
        assert_eq!(state.stories[0].id, "");
        assert_eq!(state.stories[0].title, "orphan");
        assert_eq!(state.agents[0].name, "");
        assert_eq!(state.agents[0].availability(), AgentAvailability::Active);
    }

    #[test]
    fn messages_use_type_tag_on_the_wire() {
        let state: DisplayState = serde_json::from_str(
            r#"{"messages":[{"timestamp_ms":1000,"type":"success","content":"done"}]}"#,
        )
        .expect("decode");
        assert_eq!(state.messages[0].kind, MessageKind::Success);
        assert_eq!(state.messages[0].kind.as_str(), "success");
    }

    #[test]
    fn active_agent_is_never_displayed_as_limited() {
        let agent = AgentState {
            name: "claude".to_string(),
            display_name: String::new(),
            active: true,
            rate_limited: true,
            resets_at_ms: Some(5),
        };
        assert_eq!(agent.availability(), AgentAvailability::Active);
        assert_eq!(agent.label(), "claude");
    }

    #[test]
    fn completed_count_counts_passing_stories() {
        let state: DisplayState = serde_json::from_str(
            r#"{"stories":[{"id":"a","passes":true},{"id":"b"},{"id":"c","passes":true}]}"#,
        )
        .expect("decode");
        assert_eq!(state.completed_count(), 2);
    }
}
