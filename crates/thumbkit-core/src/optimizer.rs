//! Rewrites mixed-language titles into a single language through an external
//! text generator. Every failure degrades to the original title.

use serde::Deserialize;
use std::time::Duration;

use crate::{
    cjk_ratio, Error, OptimizerOptions, Result, TargetLanguage, MAX_OPTIMIZED_TITLE_CHARS,
    SINGLE_LANGUAGE_HIGH, SINGLE_LANGUAGE_LOW,
};

pub const TITLE_OPTIMIZATION_SYSTEM_PROMPT: &str = "\
You rewrite video titles for thumbnails. Turn a mixed-language or messy title \
into a clean title written in a single language.

Rules:
1. Reply with the rewritten title only. No quotes, prefixes or explanations.
2. Use one language only: pure Chinese or pure English.
3. Keep the original meaning.
4. Aim for 10-18 characters in Chinese or 7-12 words in English.
5. If more than 60% of the title is Chinese, write Chinese. If more than 60% is English, write English. Otherwise pick the dominant language.
6. Drop punctuation, brackets and symbols that do not help a thumbnail. Use title case in English.

Examples:
AI技术指南 Complete Tutorial 2024 -> AI技术完整指南教程
Learn Python编程 from Zero -> Learn Python Programming from Zero
最新科技News今日更新 -> 最新科技资讯今日更新";

/// One call to a text generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &GenerationPrompt) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedTitle {
    pub text: String,
    pub was_optimized: bool,
}

impl OptimizedTitle {
    pub fn unchanged(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            was_optimized: false,
        }
    }
}

/// True when the title mixes scripts: its CJK ratio lies strictly between
/// the single-language thresholds.
pub fn needs_optimization(title: &str) -> bool {
    if title.chars().all(char::is_whitespace) {
        return false;
    }
    let ratio = cjk_ratio(title);
    ratio > SINGLE_LANGUAGE_LOW && ratio < SINGLE_LANGUAGE_HIGH
}

pub struct TitleOptimizer {
    generator: Option<Box<dyn TextGenerator>>,
    target_language: TargetLanguage,
    custom_prompt: Option<String>,
    temperature: f32,
    max_output_tokens: u32,
}

impl std::fmt::Debug for TitleOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitleOptimizer")
            .field("available", &self.generator.is_some())
            .field("target_language", &self.target_language)
            .finish_non_exhaustive()
    }
}

impl TitleOptimizer {
    pub fn new(generator: Option<Box<dyn TextGenerator>>, options: &OptimizerOptions) -> Self {
        Self {
            generator,
            target_language: options.target_language,
            custom_prompt: options
                .custom_prompt
                .clone()
                .filter(|prompt| !prompt.trim().is_empty()),
            temperature: options.temperature,
            max_output_tokens: options.max_output_tokens,
        }
    }

    /// An optimizer with no backing service; every title passes through.
    pub fn disabled() -> Self {
        Self::new(None, &OptimizerOptions::default())
    }

    pub fn is_available(&self) -> bool {
        self.generator.is_some()
    }

    pub fn prompt(&self, title: &str) -> GenerationPrompt {
        let system = self
            .custom_prompt
            .clone()
            .unwrap_or_else(|| TITLE_OPTIMIZATION_SYSTEM_PROMPT.to_string());
        let user = match self.target_language {
            TargetLanguage::Auto => title.to_string(),
            TargetLanguage::En => format!("Target language: English\n{title}"),
            TargetLanguage::Zh => format!("Target language: Chinese\n{title}"),
        };
        GenerationPrompt {
            system,
            user,
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }

    pub fn maybe_optimize(&self, title: &str) -> OptimizedTitle {
        let Some(generator) = &self.generator else {
            return OptimizedTitle::unchanged(title);
        };
        if !needs_optimization(title) {
            tracing::debug!("title is single-language, skipping optimization");
            return OptimizedTitle::unchanged(title);
        }
        let reply = generator
            .generate(&self.prompt(title))
            .and_then(|reply| clean_reply(&reply));
        match reply {
            Ok(text) => {
                tracing::info!(original = title, optimized = %text, "title optimized");
                OptimizedTitle {
                    text,
                    was_optimized: true,
                }
            }
            Err(err) => {
                tracing::warn!(%err, "title optimization failed, keeping original");
                OptimizedTitle::unchanged(title)
            }
        }
    }
}

/// First non-blank line of the reply, stripped of wrapping quotes.
pub(crate) fn clean_reply(reply: &str) -> Result<String> {
    let line = reply
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| Error::Optimization("empty reply".to_string()))?;
    let text = line
        .trim_matches(|ch| matches!(ch, '"' | '\'' | '“' | '”' | '「' | '」' | '`'))
        .trim();
    if text.is_empty() {
        return Err(Error::Optimization("empty reply".to_string()));
    }
    if text.chars().count() > MAX_OPTIMIZED_TITLE_CHARS {
        return Err(Error::Optimization(format!(
            "reply longer than {MAX_OPTIMIZED_TITLE_CHARS} characters"
        )));
    }
    Ok(text.to_string())
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, options: &OptimizerOptions) -> Self {
        Self {
            api_key: api_key.into(),
            model: options.model.clone(),
            endpoint: options.endpoint.clone(),
            timeout_ms: options.timeout_ms,
        }
    }
}

/// Google Generative Language `generateContent` client.
pub struct GeminiClient {
    config: GeminiConfig,
    agent: ureq::Agent,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.config.model)
            .field("endpoint", &self.config.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("gemini api key is empty".to_string()));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build();
        Ok(Self { config, agent })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    pub(crate) fn request_body(prompt: &GenerationPrompt) -> serde_json::Value {
        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": prompt.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
            "generationConfig": {
                "temperature": prompt.temperature,
                "maxOutputTokens": prompt.max_output_tokens,
            },
        })
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &GenerationPrompt) -> Result<String> {
        let body = Self::request_body(prompt).to_string();
        let response = self
            .agent
            .post(&self.url())
            .set("x-goog-api-key", &self.config.api_key)
            .set("Content-Type", "application/json")
            .send_string(&body);
        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(Error::Optimization(format!("gemini returned status {status}")));
            }
            Err(err) => return Err(Error::Optimization(format!("gemini request: {err}"))),
        };
        let text = response
            .into_string()
            .map_err(|err| Error::Optimization(format!("gemini response: {err}")))?;
        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|err| Error::Optimization(format!("gemini response: {err}")))?;
        parsed
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.text)
            .ok_or_else(|| Error::Optimization("gemini reply has no text".to_string()))
    }
}
