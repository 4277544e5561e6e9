//! The free-form reply used once the script has nothing
//! to say. Never fails: backend errors become a fixed apology.

use std::sync::Arc;

use tracing::{error, info};

use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::store::{ChatLogEntry, MessageRole};

pub const APOLOGY: &str = "I'm sorry, but I encountered a technical difficulty while processing \
                           your request. Please try again in a few moments.";

const TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub struct GenerativeFallback {
    provider: Arc<dyn LlmProvider>,
}

impl GenerativeFallback {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// System prompt, then the history oldest-first, then the new message.
    pub async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatLogEntry],
        user_message: &str,
    ) -> String {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(history.iter().map(|entry| match entry.role {
            MessageRole::User => ChatMessage::user(&entry.content),
            MessageRole::Assistant => ChatMessage::assistant(&entry.content),
        }));
        messages.push(ChatMessage::user(user_message));

        let request = CompletionRequest::new(messages).with_temperature(TEMPERATURE);
        match self.provider.complete(request).await {
            Ok(response) => {
                info!(
                    model = self.provider.model_name(),
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Generative reply"
                );
                response.content
            }
            Err(e) => {
                error!(model = self.provider.model_name(), error = %e, "LLM call failed");
                APOLOGY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::{CompletionResponse, Role};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<CompletionRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for Recorder {
        fn model_name(&self) -> &str {
            "recorder"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            if self.fail {
                return Err(LlmError::RequestFailed {
                    provider: "recorder".into(),
                    reason: "boom".into(),
                });
            }
            Ok(CompletionResponse {
                content: "generated".into(),
                ..Default::default()
            })
        }
    }

    fn entry(role: MessageRole, content: &str) -> ChatLogEntry {
        ChatLogEntry {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn builds_system_history_user_in_order() {
        let recorder = Arc::new(Recorder::default());
        let fallback = GenerativeFallback::new(recorder.clone());
        let history = [
            entry(MessageRole::User, "hi"),
            entry(MessageRole::Assistant, "hello"),
        ];

        let reply = fallback.complete("sys", &history, "now what").await;
        assert_eq!(reply, "generated");

        let seen = recorder.seen.lock().unwrap();
        let roles: Vec<_> = seen[0].messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(seen[0].messages[3].content, "now what");
        assert_eq!(seen[0].temperature, Some(TEMPERATURE));
    }

    #[tokio::test]
    async fn failure_becomes_apology() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let fallback = GenerativeFallback::new(recorder);
        assert_eq!(fallback.complete("sys", &[], "hello").await, APOLOGY);
    }
}
