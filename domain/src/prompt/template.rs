//! Prompt templates for a round

use crate::message::entities::Message;
use crate::thread::entities::ChatMode;

/// Templates for generating prompts at each stage of a round
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for a participant turn
    pub fn participant_system(mode: ChatMode, role: Option<&str>) -> String {
        let stance = match mode {
            ChatMode::Debating => {
                "Take a clear position. Where earlier participants made claims, challenge the weak ones and defend the strong ones."
            }
            ChatMode::Analyzing => {
                "Break the problem down systematically. Build on the analysis already given instead of repeating it."
            }
            ChatMode::Brainstorming => {
                "Generate new ideas. Do not repeat ideas already offered by earlier participants; extend or combine them."
            }
            ChatMode::Solving => {
                "Work toward a concrete, actionable solution. Point out flaws in earlier proposals and fix them."
            }
        };
        let mut prompt = format!(
            "You are one of several AI participants answering the same question in turn.\n{}\nBe concise.",
            stance
        );
        if let Some(role) = role {
            prompt.push_str(&format!("\nYour assigned role: {}.", role));
        }
        prompt
    }

    /// User prompt for participant `index`, built from its assembled context
    /// (the round's user message followed by earlier participants).
    pub fn participant_prompt(context: &[&Message], search_context: Option<&str>) -> String {
        let question = context
            .iter()
            .find(|m| m.is_user())
            .map(|m| m.text())
            .unwrap_or_default();

        let mut prompt = format!("Question:\n{}\n", question);

        if let Some(search) = search_context {
            prompt.push_str(&format!("\n{}\n", search));
        }

        let earlier: Vec<&&Message> = context.iter().filter(|m| !m.is_user()).collect();
        if !earlier.is_empty() {
            prompt.push_str("\nEarlier participants in this round:\n");
            for message in earlier {
                let who = message
                    .model()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "participant".to_string());
                match &message.error {
                    Some(error) => prompt.push_str(&format!(
                        "\n--- {} (failed: {}) ---\n",
                        who, error.category
                    )),
                    None => prompt.push_str(&format!("\n--- {} ---\n{}\n", who, message.text())),
                }
            }
        }

        prompt
    }

    /// System prompt for the moderator pass
    pub fn moderator_system() -> &'static str {
        r#"You are a moderator synthesizing multiple participants' answers into a coherent conclusion.
Your task is to:
1. Identify areas of consensus
2. Note significant disagreements and which positions are better supported
3. Synthesize the best elements into a final answer

Be balanced and objective."#
    }

    /// User prompt for the moderator pass
    pub fn moderator_prompt(question: &str, responses: &[&Message]) -> String {
        let mut prompt = format!("Original question: {}\n\nParticipant responses:\n", question);
        for message in responses {
            let who = message
                .model()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "participant".to_string());
            if message.has_error() {
                prompt.push_str(&format!("\n--- {} ---\n(no answer: failed)\n", who));
            } else {
                prompt.push_str(&format!("\n--- {} ---\n{}\n", who, message.text()));
            }
        }
        prompt.push_str("\nProvide a **Conclusion** and the **Key Points**.");
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Model;
    use crate::message::entities::FinishReason;
    use crate::message::error::ErrorCategory;

    #[test]
    fn test_participant_system_includes_role() {
        let prompt = PromptTemplate::participant_system(ChatMode::Debating, Some("The Skeptic"));
        assert!(prompt.contains("Take a clear position"));
        assert!(prompt.contains("The Skeptic"));
    }

    #[test]
    fn test_participant_prompt_lists_earlier_answers() {
        let user = Message::user("t_r0_user", 0, "What is Rust?");
        let first = Message::participant("t", 0, 0, "p0", Model::Gpt52)
            .with_text("A systems language.")
            .with_finish_reason(FinishReason::Stop);
        let failed = Message::participant("t", 0, 1, "p1", Model::Gemini3Pro)
            .with_error(ErrorCategory::Timeout, "timed out");
        let prompt = PromptTemplate::participant_prompt(&[&user, &first, &failed], None);
        assert!(prompt.contains("What is Rust?"));
        assert!(prompt.contains("A systems language."));
        assert!(prompt.contains("gemini-3-pro-preview (failed: timeout)"));
    }

    #[test]
    fn test_first_participant_prompt_has_no_earlier_section() {
        let user = Message::user("t_r0_user", 0, "What is Rust?");
        let prompt = PromptTemplate::participant_prompt(&[&user], Some("Web search results:\n"));
        assert!(!prompt.contains("Earlier participants"));
        assert!(prompt.contains("Web search results"));
    }

    #[test]
    fn test_moderator_prompt_marks_failures() {
        let ok = Message::participant("t", 0, 0, "p0", Model::Gpt52).with_text("yes");
        let failed = Message::participant("t", 0, 1, "p1", Model::Grok4)
            .with_error(ErrorCategory::RateLimit, "limit");
        let prompt = PromptTemplate::moderator_prompt("Q?", &[&ok, &failed]);
        assert!(prompt.contains("gpt-5.2"));
        assert!(prompt.contains("(no answer: failed)"));
        assert!(prompt.contains("Conclusion"));
    }
}
