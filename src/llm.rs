//! Language-model client and persona prompt construction.
//!
//! Style synthesis is delegated entirely to the external model: this module
//! only renders the caller-supplied persona profile into an impersonation
//! prompt and makes the completion call.

use serde::{Deserialize, Serialize};

use crate::{
    config::LlmConfig,
    error::{Error, Result},
};

/// Conversational style profile of the impersonated participant.
///
/// Derived once per upload from the parsed export (summary text comes from
/// an earlier summarization call); persisted externally, supplied per send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// Display name of the participant being impersonated.
    pub persona_name: String,
    /// Free-text summary of tone, vocabulary and quirks.
    pub style_summary: String,
    /// Rolling window of the persona's recent messages, oldest first.
    #[serde(default)]
    pub sample_messages: Vec<String>,
}

/// One turn of chat history on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// Render the persona profile into a system prompt.
#[must_use]
pub fn build_system_prompt(profile: &PersonaProfile) -> String {
    let mut prompt = format!(
        "You are {name}. Reply exactly as {name} would in a casual chat: \
         same tone, same typical message length, same quirks. Never mention \
         being an AI or break character.\n\nStyle notes: {summary}",
        name = profile.persona_name,
        summary = profile.style_summary,
    );

    if !profile.sample_messages.is_empty() {
        prompt.push_str("\n\nRecent messages from them, oldest first:\n");
        for message in &profile.sample_messages {
            prompt.push_str("- ");
            prompt.push_str(message);
            prompt.push('\n');
        }
    }

    prompt
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatTurn,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(http_client: reqwest::Client, config: &LlmConfig) -> Self {
        Self {
            http_client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// One completion call: persona system prompt, then history, then the
    /// user's new message. No retries; failures surface to the caller.
    pub async fn complete(
        &self,
        profile: &PersonaProfile,
        history: &[ChatTurn],
        user_message: &str,
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatTurn {
            role: "system".to_string(),
            content: build_system_prompt(profile),
        });
        messages.extend(history.iter().cloned());
        messages.push(ChatTurn {
            role: "user".to_string(),
            content: user_message.to_string(),
        });

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await
            .map_err(|e| Error::LlmApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("completion request failed with status {}", status);
            return Err(Error::LlmApi(format!(
                "completion request failed with status {status}"
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::LlmApi(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::LlmApi("completion returned no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_profile() -> PersonaProfile {
        PersonaProfile {
            persona_name: "Alice".to_string(),
            style_summary: "short replies, lowercase, lots of emojis".to_string(),
            sample_messages: vec!["hey!! 😄".to_string(), "omw".to_string()],
        }
    }

    #[test]
    fn test_system_prompt_names_persona() {
        let prompt = build_system_prompt(&make_profile());
        assert!(prompt.contains("You are Alice."));
        assert!(prompt.contains("lots of emojis"));
    }

    #[test]
    fn test_system_prompt_lists_samples() {
        let prompt = build_system_prompt(&make_profile());
        assert!(prompt.contains("- hey!! 😄"));
        assert!(prompt.contains("- omw"));
    }

    #[test]
    fn test_system_prompt_without_samples() {
        let mut profile = make_profile();
        profile.sample_messages.clear();
        let prompt = build_system_prompt(&profile);
        assert!(!prompt.contains("Recent messages"));
    }

    #[test]
    fn test_completion_response_deserialization() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"hey :)"}}]}"#;
        let response: CompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content, "hey :)");
    }
}
