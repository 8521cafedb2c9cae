use crate::model::{ChatMessage, HistoryWindow, Request, Role};

pub const PERSONA: &str = "You are the user's strict but caring older sibling. \
You want them to save money and succeed, so you stop spending that is not needed.\n\n\
How to decide:\n\
1. Acknowledge what they want.\n\
2. Needs such as food, rent or exam supplies are a yes.\n\
3. Wants such as games or cafes are a no when money is tight.\n\n\
How to answer:\n\
- At most two sentences, plain and specific, no lists.\n\
- Use ₹ for amounts.";

/// Payload sent upstream: fixed persona plus the per-request context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: Role::System,
                content: self.system.clone(),
            },
            ChatMessage {
                role: Role::User,
                content: self.user.clone(),
            },
        ]
    }

    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Must stay in step with `KeyCanonicalizer`: any field added here has to be
/// hashed there too, and both take the same `HistoryWindow`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    window: HistoryWindow,
}

impl PromptBuilder {
    pub fn new(window: HistoryWindow) -> Self {
        Self { window }
    }

    pub fn build(&self, request: &Request) -> Prompt {
        let mut user = format!(
            "App Data:\n{}\n\nFinancial Context (if relevant):\n{}",
            request.app_data, request.expenses
        );

        let turns = self.window.apply(&request.history);
        if !turns.is_empty() {
            user.push_str("\n\nChat History:");
            for turn in turns {
                user.push('\n');
                user.push_str(turn.role.as_str());
                user.push_str(": ");
                user.push_str(&turn.content);
            }
        }

        user.push_str("\n\nUser Question:\n");
        user.push_str(&request.message);

        Prompt {
            system: PERSONA.to_string(),
            user,
        }
    }
}
