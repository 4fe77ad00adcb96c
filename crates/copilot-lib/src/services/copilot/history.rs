// Conversation history projection
// Feature: AI Copilot orchestration core

use crate::models::copilot::{ChatMessage, HistoryEntry, HistoryRole, MessageFrom};

fn role_for(from: MessageFrom) -> Option<HistoryRole> {
    match from {
        MessageFrom::User => Some(HistoryRole::User),
        MessageFrom::Assistant => Some(HistoryRole::Assistant),
    }
}

/// Flatten the transcript into the role/content list a handler expects.
///
/// User messages contribute their first version, assistant messages their
/// latest one. Order is preserved.
pub fn project_history(messages: &[ChatMessage]) -> Vec<HistoryEntry> {
    messages
        .iter()
        .filter_map(|message| {
            let role = role_for(message.from)?;
            let content = match role {
                HistoryRole::User => message.first_version().content.clone(),
                _ => message.latest_version().content.clone(),
            };
            Some(HistoryEntry { role, content })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_keeps_order() {
        let messages = vec![
            ChatMessage::assistant("Copilot", "welcome"),
            ChatMessage::user("t1", "You", "question"),
            ChatMessage::assistant("Copilot", "answer"),
        ];

        let history = project_history(&messages);

        assert_eq!(
            history,
            vec![
                HistoryEntry::assistant("welcome"),
                HistoryEntry::user("question"),
                HistoryEntry::assistant("answer"),
            ]
        );
    }

    #[test]
    fn test_assistant_uses_latest_version() {
        let mut answer = ChatMessage::assistant("Copilot", "first draft");
        answer.add_version("regenerated");

        let history = project_history(&[answer]);
        assert_eq!(history, vec![HistoryEntry::assistant("regenerated")]);
    }

    #[test]
    fn test_user_uses_first_version() {
        let mut question = ChatMessage::user("t1", "You", "original");
        question.add_version("edited");

        let history = project_history(&[question]);
        assert_eq!(history, vec![HistoryEntry::user("original")]);
    }

    #[test]
    fn test_empty_transcript() {
        assert!(project_history(&[]).is_empty());
    }
}
