pub mod config;
pub mod extractor;
pub mod llm;
pub mod prompt;
pub mod utils;

use crate::extractor::{ExtractedSections, Section, SectionState, TagExtractor};
use crate::llm::{ChatSession, LLMBuilder};
use futures_util::StreamExt;
use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub credential: String,
    pub system_prompt: String,
    pub text: String,
}

#[derive(Debug)]
pub enum LLMError {
    ConnectionError(anyhow::Error),
    ApiError(anyhow::Error),
    ConfigError(anyhow::Error),
    InteractionError(anyhow::Error),
    OtherError(anyhow::Error),
}

impl Display for LLMError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMError::ConnectionError(e) => write!(f, "Connection error: {}", e),
            LLMError::ApiError(e) => write!(f, "API error: {}", e),
            LLMError::ConfigError(e) => write!(f, "Configuration error: {}", e),
            LLMError::InteractionError(e) => write!(f, "Unexpected model response: {}", e),
            LLMError::OtherError(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug)]
pub enum TranslationError {
    MissingCredential,
    EmptyInput,
    InputTooLong { len: usize, max: usize },
    SessionError(LLMError),
    StreamError {
        error: LLMError,
        partial: ExtractedSections,
    },
    OtherError(anyhow::Error),
}

impl Display for TranslationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationError::MissingCredential => {
                write!(f, "Enter your API key to start translating")
            }
            TranslationError::EmptyInput => {
                write!(f, "Enter a text to translate")
            }
            TranslationError::InputTooLong { len, max } => {
                write!(f, "Text is too long: {} characters, at most {} allowed", len, max)
            }
            TranslationError::SessionError(e) => {
                write!(f, "Could not start the model session: {}", e)
            }
            TranslationError::StreamError { error, .. } => {
                write!(f, "Translation interrupted: {}", error)
            }
            TranslationError::OtherError(e) => {
                write!(f, "Error: {}", e)
            }
        }
    }
}

#[derive(Debug)]
pub enum TranslationStatus {
    Started,
    Progress(Progress),
    Success(ExtractedSections),
    Error(TranslationError),
}

#[derive(Debug, Clone)]
pub struct Progress {
    pub received_chunks: usize,
    pub received_chars: usize,
    pub sections: ExtractedSections,
    /// Opened but not yet closed in the reply so far.
    pub open_sections: Vec<Section>,
}

/// Model conversation plus what it was opened with.
struct SessionState<S> {
    session: S,
    credential: String,
    system_prompt: String,
}

/// Runs translation requests one at a time against a lazily started model session.
///
/// The session is reused as long as the credential and the system prompt stay the same.
pub struct TranslationService<LB: LLMBuilder> {
    llm_builder: LB,
    extractor: TagExtractor,
    max_input_chars: usize,
    state: Option<SessionState<LB::Built>>,
}

impl<LB: LLMBuilder> TranslationService<LB> {
    pub fn new(llm_builder: LB, max_input_chars: usize) -> Self {
        TranslationService {
            llm_builder,
            extractor: TagExtractor::new(),
            max_input_chars,
            state: None,
        }
    }

    pub async fn translate(
        &mut self,
        req: &TranslationRequest,
        send_status: impl Fn(TranslationStatus),
    ) -> Result<ExtractedSections, TranslationError> {
        if req.credential.trim().is_empty() {
            return Err(TranslationError::MissingCredential);
        }
        if req.text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }
        let len = req.text.chars().count();
        if len > self.max_input_chars {
            return Err(TranslationError::InputTooLong {
                len,
                max: self.max_input_chars,
            });
        }

        send_status(TranslationStatus::Started);

        let session = Self::session_for(&self.llm_builder, &mut self.state, req).await?;
        let mut stream = match session.send_and_stream(&req.text).await {
            Ok(stream) => stream,
            Err(error) => {
                return Err(TranslationError::StreamError {
                    error,
                    partial: ExtractedSections::default(),
                });
            }
        };

        let mut buffer = String::new();
        let mut sections = ExtractedSections::default();
        let mut received_chunks = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(error) => {
                    log::warn!(
                        "Stream failed after {received_chunks} chunks ({} bytes)",
                        buffer.len()
                    );
                    return Err(TranslationError::StreamError {
                        error,
                        partial: sections,
                    });
                }
            };
            buffer.push_str(&chunk);
            received_chunks += 1;
            sections = self.extractor.extract(&buffer);

            let open_sections = Section::ALL
                .into_iter()
                .filter(|s| self.extractor.state(&buffer, *s) == SectionState::Streaming)
                .collect();

            send_status(TranslationStatus::Progress(Progress {
                received_chunks,
                received_chars: buffer.chars().count(),
                sections: sections.clone(),
                open_sections,
            }));
        }

        log::info!("Reply complete: {received_chunks} chunks, {} bytes", buffer.len());
        if sections.is_empty() {
            log::warn!("Reply contains no recognized section");
        }
        session.record_reply(buffer);

        Ok(sections)
    }

    async fn session_for<'a>(
        llm_builder: &LB,
        state: &'a mut Option<SessionState<LB::Built>>,
        req: &TranslationRequest,
    ) -> Result<&'a mut LB::Built, TranslationError> {
        let stale = state.take_if(|current| {
            current.credential != req.credential || current.system_prompt != req.system_prompt
        });
        if stale.is_some() {
            log::info!("Credential or system prompt changed, starting a new session");
        }

        if state.is_none() {
            let session = llm_builder
                .start_session(&req.credential, &req.system_prompt)
                .await
                .map_err(TranslationError::SessionError)?;
            *state = Some(SessionState {
                session,
                credential: req.credential.clone(),
                system_prompt: req.system_prompt.clone(),
            });
        } else {
            log::debug!("Reusing the current session");
        }

        match state.as_mut() {
            Some(state) => Ok(&mut state.session),
            None => Err(TranslationError::OtherError(anyhow::anyhow!(
                "Session was not initialized"
            ))),
        }
    }
}
