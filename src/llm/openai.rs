use super::{ChatSession, History, LLMBuilder, TextStream};
use crate::LLMError;
use crate::config::AppConfig;
use crate::utils::substr_up_to_len;
use anyhow::anyhow;
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use futures_util::{StreamExt, future};
use std::error::Error;

/// Builder for OpenAI-compatible chat completion APIs
pub struct OpenAiChatBuilder {
    api_base: String,
    model: String,
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

impl OpenAiChatBuilder {
    pub fn new(api_base: String, model: String) -> Self {
        OpenAiChatBuilder {
            api_base,
            model,
            temperature: 1.0,
            top_p: 1.0,
            max_output_tokens: 8192,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        OpenAiChatBuilder {
            api_base: cfg.api_base.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_output_tokens: cfg.max_output_tokens,
        }
    }
}

impl LLMBuilder for OpenAiChatBuilder {
    type Built = OpenAiChatSession;

    async fn start_session(
        &self,
        credential: &str,
        system_instruction: &str,
    ) -> Result<Self::Built, LLMError> {
        if self.model.trim().is_empty() {
            return Err(LLMError::ConfigError(anyhow!("Model name is empty")));
        }
        if !self.api_base.starts_with("https://") && !self.api_base.starts_with("http://") {
            return Err(LLMError::ConfigError(anyhow!(
                "Invalid API base URL: {}",
                self.api_base
            )));
        }

        let config = OpenAIConfig::new()
            .with_api_key(credential)
            .with_api_base(&self.api_base);

        log::info!("Starting chat session with {} at {}", self.model, self.api_base);

        Ok(OpenAiChatSession {
            client: Client::with_config(config),
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
            system_instruction: system_instruction.to_owned(),
            history: History::default(),
        })
    }
}

// No Debug: the client holds the API key.
pub struct OpenAiChatSession {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    system_instruction: String,
    history: History,
}

impl ChatSession for OpenAiChatSession {
    async fn send_and_stream(&mut self, user_text: &str) -> Result<TextStream, LLMError> {
        log::info!(
            r#"Sending message "{}...""#,
            substr_up_to_len(user_text.lines().next().unwrap_or_default(), 20)
        );

        let request = self.build_request(user_text)?;
        let stream = self.client.chat().create_stream(request).await?;
        self.history.begin_turn(user_text);

        let chunks = stream.filter_map(|res| {
            future::ready(match res {
                Ok(response) => {
                    let text: String = response
                        .choices
                        .into_iter()
                        .filter_map(|choice| choice.delta.content)
                        .collect();
                    (!text.is_empty()).then_some(Ok(text))
                }
                Err(e) => Some(Err(LLMError::from(e))),
            })
        });
        Ok(Box::pin(chunks))
    }

    fn record_reply(&mut self, reply: String) {
        self.history.complete_turn(reply);
    }
}

impl OpenAiChatSession {
    #[allow(deprecated)]
    fn build_request(&self, user_text: &str) -> Result<CreateChatCompletionRequest, LLMError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_instruction.as_str())
                .build()?
                .into(),
        ];
        for (user, model) in self.history.turns() {
            messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user.as_str())
                    .build()?
                    .into(),
            );
            messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(model.as_str())
                    .build()?
                    .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_text)
                .build()?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .temperature(self.temperature)
            .top_p(self.top_p)
            .max_tokens(self.max_output_tokens)
            .stream(true)
            .build()?;
        Ok(request)
    }
}

impl From<OpenAIError> for LLMError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(e) => LLMError::ConnectionError(if let Some(e) = e.source() {
                anyhow!("{e}")
            } else {
                e.into()
            }),
            OpenAIError::ApiError(e) => LLMError::ApiError(anyhow!("{e}")),
            OpenAIError::JSONDeserialize(e) => LLMError::InteractionError(e.into()),
            OpenAIError::FileSaveError(e) => LLMError::OtherError(anyhow!("{e}")),
            OpenAIError::FileReadError(e) => LLMError::OtherError(anyhow!("{e}")),
            OpenAIError::StreamError(e) => LLMError::ConnectionError(anyhow!("{e}")),
            OpenAIError::InvalidArgument(e) => LLMError::ConfigError(anyhow!("{e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> OpenAiChatBuilder {
        OpenAiChatBuilder::from_config(&AppConfig::default())
    }

    #[tokio::test]
    async fn start_session_rejects_empty_model() {
        let builder = OpenAiChatBuilder::new(
            "https://generativelanguage.googleapis.com/v1beta/openai".to_owned(),
            " ".to_owned(),
        );
        let res = builder.start_session("key", "prompt").await;
        assert!(matches!(res, Err(LLMError::ConfigError(_))));
    }

    #[tokio::test]
    async fn start_session_rejects_bad_base_url() {
        let builder = OpenAiChatBuilder::new("localhost:8080".to_owned(), "gemini".to_owned());
        let res = builder.start_session("key", "prompt").await;
        assert!(matches!(res, Err(LLMError::ConfigError(_))));
    }

    #[tokio::test]
    async fn request_carries_prompt_history_and_parameters() {
        let mut session = builder().start_session("key", "Be a translator").await.unwrap();
        session.history.begin_turn("Arma virumque cano");
        session.record_reply("<translation>Canto le armi e l'uomo</translation>".to_owned());

        let request = session.build_request("Gallia est omnis divisa").unwrap();

        assert_eq!(request.model, "gemini-1.5-pro");
        assert_eq!(request.stream, Some(true));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.top_p, Some(0.95));
        assert_eq!(request.messages.len(), 4);
        assert!(matches!(
            request.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            request.messages[1],
            ChatCompletionRequestMessage::User(_)
        ));
        assert!(matches!(
            request.messages[2],
            ChatCompletionRequestMessage::Assistant(_)
        ));
        assert!(matches!(
            request.messages[3],
            ChatCompletionRequestMessage::User(_)
        ));
    }

    #[test]
    fn openai_errors_are_classified() {
        let err = LLMError::from(OpenAIError::StreamError("connection reset".to_owned()));
        assert!(matches!(err, LLMError::ConnectionError(_)));

        let err = LLMError::from(OpenAIError::InvalidArgument("bad".to_owned()));
        assert!(matches!(err, LLMError::ConfigError(_)));
    }
}
