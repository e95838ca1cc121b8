use super::{ChatSession, History, LLMBuilder, TextStream};
use crate::LLMError;
use crate::extractor::Section;
use itertools::Itertools;

/// Offline backend streaming a canned, correctly tagged reply.
pub struct DummyLLMBuilder {
    pub chunk_len: usize,
}

impl Default for DummyLLMBuilder {
    fn default() -> Self {
        DummyLLMBuilder { chunk_len: 16 }
    }
}

impl LLMBuilder for DummyLLMBuilder {
    type Built = DummyLLM;

    async fn start_session(
        &self,
        _credential: &str,
        _system_instruction: &str,
    ) -> Result<Self::Built, LLMError> {
        Ok(DummyLLM {
            chunk_len: self.chunk_len.max(1),
            history: History::default(),
        })
    }
}

pub struct DummyLLM {
    chunk_len: usize,
    history: History,
}

impl DummyLLM {
    pub fn history(&self) -> &History {
        &self.history
    }
}

impl ChatSession for DummyLLM {
    async fn send_and_stream(&mut self, user_text: &str) -> Result<TextStream, LLMError> {
        self.history.begin_turn(user_text);
        let chunks = split_into_chunks(&dummy_reply(user_text), self.chunk_len);
        Ok(Box::pin(futures_util::stream::iter(chunks.into_iter().map(Ok))))
    }

    fn record_reply(&mut self, reply: String) {
        self.history.complete_turn(reply);
    }
}

pub fn dummy_reply(user_text: &str) -> String {
    Section::ALL
        .into_iter()
        .map(|section| {
            let body = match section {
                Section::Translation => format!("Dummy output for: {}", user_text.trim()),
                other => format!("Dummy {}", other.title().to_lowercase()),
            };
            format!("<{0}>\n{1}\n</{0}>", section.tag(), body)
        })
        .join("\n\n")
}

/// Splits on char boundaries, every chunk but the last has exactly `chunk_len` chars.
pub fn split_into_chunks(text: &str, chunk_len: usize) -> Vec<String> {
    text.chars()
        .chunks(chunk_len)
        .into_iter()
        .map(|chunk| chunk.collect::<String>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::TagExtractor;
    use futures_util::StreamExt;

    #[test]
    fn chunks_respect_char_boundaries() {
        let chunks = split_into_chunks("Gallia è divisa", 4);
        assert_eq!(chunks, vec!["Gall", "ia è", " div", "isa"]);
        assert_eq!(chunks.concat(), "Gallia è divisa");
    }

    #[tokio::test]
    async fn streamed_reply_contains_every_section() {
        let mut llm = DummyLLMBuilder { chunk_len: 7 }
            .start_session("key", "prompt")
            .await
            .unwrap();

        let chunks: Vec<String> = llm
            .send_and_stream("Veni, vidi, vici")
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert!(chunks.len() > 1);

        let reply = chunks.concat();
        let sections = TagExtractor::new().extract(&reply);
        assert_eq!(
            sections.get(Section::Translation),
            "Dummy output for: Veni, vidi, vici"
        );
        for (_, content) in sections.iter() {
            assert!(!content.is_empty());
        }

        llm.record_reply(reply.clone());
        assert_eq!(
            llm.history().turns(),
            &[("Veni, vidi, vici".to_owned(), reply)]
        );
    }
}
