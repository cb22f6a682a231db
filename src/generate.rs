//! Text-generation seam and the hosted-model implementation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Shape of the question, which selects the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionKind {
    /// One answer per `[a | b | c]` bracket, comma separated.
    GapText,
    /// Numbered items matched to lettered options.
    Matching,
    /// Anything else, including questions typed into the question file.
    #[default]
    FreeForm,
}

impl QuestionKind {
    /// Map the `type` field of an ingest payload.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "gaptext" | "gap-text" | "gap_text" => Self::GapText,
            "matching" => Self::Matching,
            _ => Self::FreeForm,
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GapText => "gaptext",
            Self::Matching => "matching",
            Self::FreeForm => "freeform",
        })
    }
}

/// What the generator is asked to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub question: String,
    /// The answer options as scraped from the page (may be empty).
    pub answer: String,
    pub kind: QuestionKind,
}

impl GenerationRequest {
    /// Build the prompt sent to the model.
    pub fn prompt(&self) -> String {
        let material = if self.answer.trim().is_empty() {
            self.question.trim()
        } else {
            self.answer.trim()
        };

        let instructions = match self.kind {
            QuestionKind::GapText => {
                "For each [...] bracket, return only ONE correct answer.\n\
                 Return answers separated by comma.\n\
                 Example input: [big | small] elephant drinks [hot | cold | warm] water\n\
                 Example output: small, cold\n\
                 Do not include any explanations, the terms, or additional text."
            }
            QuestionKind::Matching => {
                "Please analyze this matching question and match the numbered items with their \
                 corresponding letters. Return only the number -> letter pairs in the format:\n\
                 Example output:\n1 -> b\n2 -> c\n3 -> a\n\
                 Do not include any explanations, the terms, or additional text."
            }
            QuestionKind::FreeForm => {
                "Answer the following question as briefly as possible.\n\
                 Do not include any explanations or additional text."
            }
        };

        let mut prompt = String::from(instructions);
        if !self.answer.trim().is_empty() && !self.question.trim().is_empty() {
            prompt.push_str("\n\nQuestion: ");
            prompt.push_str(self.question.trim());
        }
        prompt.push_str("\n\n");
        prompt.push_str(material);
        prompt
    }
}

/// Turns a question into answer text. Synchronous; may block on the network.
pub trait Generator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Settings for [`AnthropicGenerator`].
#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Blocking client for the Anthropic Messages API.
pub struct AnthropicGenerator {
    client: reqwest::blocking::Client,
    settings: AnthropicSettings,
}

impl AnthropicGenerator {
    pub fn new(settings: AnthropicSettings) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client, settings })
    }
}

impl Generator for AnthropicGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)?;

        let prompt = request.prompt();
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            messages: [Message {
                role: "user",
                content: &prompt,
            }],
        };

        let response = self
            .client
            .post(&self.settings.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json()?;
        extract_text(parsed)
    }
}

fn extract_text(response: MessagesResponse) -> Result<String, GenerationError> {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .find_map(|block| block.text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_label() {
        assert_eq!(QuestionKind::from_label("gaptext"), QuestionKind::GapText);
        assert_eq!(QuestionKind::from_label(" Matching "), QuestionKind::Matching);
        assert_eq!(QuestionKind::from_label("N/A"), QuestionKind::FreeForm);
    }

    #[test]
    fn test_gaptext_prompt_carries_instructions_and_material() {
        let request = GenerationRequest {
            question: "Fill the gaps".into(),
            answer: "The sky is [green | blue]".into(),
            kind: QuestionKind::GapText,
        };
        let prompt = request.prompt();
        assert!(prompt.starts_with("For each [...] bracket"));
        assert!(prompt.contains("Question: Fill the gaps"));
        assert!(prompt.ends_with("The sky is [green | blue]"));
    }

    #[test]
    fn test_freeform_prompt_uses_question_when_no_answer() {
        let request = GenerationRequest {
            question: "What is 6 x 7?".into(),
            answer: String::new(),
            kind: QuestionKind::FreeForm,
        };
        let prompt = request.prompt();
        assert!(prompt.ends_with("What is 6 x 7?"));
        assert!(!prompt.contains("Question:"));
    }

    #[test]
    fn test_extract_text_picks_first_text_block() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking"},{"type":"text","text":" small, cold \n"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "small, cold");

        let empty: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(matches!(extract_text(empty), Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn test_missing_api_key_fails_before_network() {
        let generator = AnthropicGenerator::new(AnthropicSettings {
            api_url: "http://127.0.0.1:9/v1/messages".into(),
            api_key: None,
            model: "test-model".into(),
            max_tokens: 10,
            temperature: 0.0,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let request = GenerationRequest {
            question: "q".into(),
            answer: String::new(),
            kind: QuestionKind::FreeForm,
        };
        assert!(matches!(
            generator.generate(&request),
            Err(GenerationError::MissingApiKey)
        ));
    }
}
