use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Stable one-byte tag used when hashing history turns.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Role::User => 0,
            Role::Assistant => 1,
            Role::System => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl HistoryTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Body of `POST /finance-ai`.
///
/// Everything except `message` is optional on the wire. A missing message
/// deserializes as empty and is rejected by the handler's validation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub expenses: String,
    #[serde(default)]
    pub app_data: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

impl Request {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_expenses(mut self, expenses: impl Into<String>) -> Self {
        self.expenses = expenses.into();
        self
    }

    pub fn with_app_data(mut self, app_data: impl Into<String>) -> Self {
        self.app_data = app_data.into();
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }
}

/// Number of trailing history turns that take part in both cache keying and
/// prompt construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow(usize);

impl HistoryWindow {
    pub const DEFAULT: HistoryWindow = HistoryWindow(5);

    pub fn new(turns: usize) -> Self {
        Self(turns)
    }

    pub fn turns(&self) -> usize {
        self.0
    }

    pub fn apply<'a>(&self, history: &'a [HistoryTurn]) -> &'a [HistoryTurn] {
        let start = history.len().saturating_sub(self.0);
        &history[start..]
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// Upstream wire types (OpenAI-compatible chat completions).

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}
