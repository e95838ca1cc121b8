pub mod dummy;
pub mod openai;

use super::LLMError;
use futures_util::Stream;
use std::pin::Pin;

/// Text increments of one model reply, in arrival order.
///
/// Finite and not restartable; an `Err` item is terminal.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

pub trait LLMBuilder {
    type Built: ChatSession;

    async fn start_session(
        &self,
        credential: &str,
        system_instruction: &str,
    ) -> Result<Self::Built, LLMError>;
}

/// A model conversation that remembers completed turns.
pub trait ChatSession {
    async fn send_and_stream(&mut self, user_text: &str) -> Result<TextStream, LLMError>;

    /// Completes the turn opened by the last [`ChatSession::send_and_stream`] call.
    fn record_reply(&mut self, reply: String);
}

/// User/model exchanges of a session, oldest first.
#[derive(Debug, Clone, Default)]
pub struct History {
    turns: Vec<(String, String)>,
    pending: Option<String>,
}

impl History {
    pub fn begin_turn(&mut self, user_text: &str) {
        self.pending = Some(user_text.to_owned());
    }

    pub fn complete_turn(&mut self, reply: String) {
        if let Some(user_text) = self.pending.take() {
            self.turns.push((user_text, reply));
        } else {
            log::warn!("Reply recorded without a pending message, ignoring");
        }
    }

    pub fn turns(&self) -> &[(String, String)] {
        &self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_completed_turns_only() {
        let mut history = History::default();

        history.begin_turn("Arma virumque cano");
        assert!(history.turns().is_empty());

        history.complete_turn("Canto le armi e l'uomo".to_owned());
        history.begin_turn("abandoned");
        history.begin_turn("Gallia est omnis divisa");
        history.complete_turn("La Gallia è tutta divisa".to_owned());
        history.complete_turn("no pending message".to_owned());

        assert_eq!(
            history.turns(),
            &[
                (
                    "Arma virumque cano".to_owned(),
                    "Canto le armi e l'uomo".to_owned()
                ),
                (
                    "Gallia est omnis divisa".to_owned(),
                    "La Gallia è tutta divisa".to_owned()
                ),
            ]
        );
    }
}
