//! Conversation state for a design session.
//!
//! The transcript is append-only: messages are never edited or removed once
//! pushed, and the follow-up counter only moves forward.

/// Number of follow-up questions the backend asks before the design is
/// generated. The answer submitted after the last follow-up starts the
/// generation chain.
pub const MAX_FOLLOW_UP_QUESTIONS: usize = 3;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    /// The person describing the design.
    User,
    /// The interviewing backend (follow-up questions).
    Assistant,
    /// The final AI design answer.
    Ai,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Atelier",
            Sender::Ai => "AI",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

/// Ordered message history for the current session.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, sender: Sender, text: impl Into<String>) {
        self.messages.push(Message {
            sender,
            text: text.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.push(Sender::User, "a silver pendant");
        transcript.push(Sender::Assistant, "What occasion is it for?");
        transcript.push(Sender::User, "a wedding");

        let messages = transcript.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert_eq!(messages[1].text, "What occasion is it for?");
        assert_eq!(messages[2].text, "a wedding");
    }

    #[test]
    fn test_sender_labels() {
        assert_eq!(Sender::User.label(), "You");
        assert_eq!(Sender::Assistant.label(), "Atelier");
        assert_eq!(Sender::Ai.label(), "AI");
    }
}
