//! LLM-as-judge response validation and correction.
//!
//! Pre-analysis extracts facts from the retrieved context so the judge has
//! something concrete to check the generated answer against; validation
//! then scores the answer against those facts, and correction applies a
//! minimal surgical fix when the issues found are worth fixing. Every stage
//! degrades to a neutral result on failure rather than propagating an error
//! — a judge outage must never block an answer from reaching the user.

mod error;
#[cfg(test)]
mod tests;

pub use error::JudgeError;

use serde::{Deserialize, Serialize};

use crate::config::JudgeConfig;
use crate::llm::{LlmClient, LlmMessage};
use crate::types::Hit;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub value: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContextAnalysis {
    pub dates: Vec<ExtractedFact>,
    pub names: Vec<ExtractedFact>,
    pub numbers: Vec<ExtractedFact>,
    pub claims: Vec<ExtractedFact>,
    pub responsibilities: Vec<ExtractedFact>,
    pub raw_context: String,
    pub query: String,
}

impl ContextAnalysis {
    pub fn has_facts(&self) -> bool {
        !self.dates.is_empty()
            || !self.names.is_empty()
            || !self.numbers.is_empty()
            || !self.claims.is_empty()
            || !self.responsibilities.is_empty()
    }

    fn to_prompt_json(&self) -> serde_json::Value {
        serde_json::json!({
            "dates": self.dates,
            "names": self.names,
            "numbers": self.numbers,
            "claims": self.claims,
            "responsibilities": self.responsibilities,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub claim: String,
    #[serde(default)]
    pub fact: Option<String>,
    #[serde(default)]
    pub correction: Option<String>,
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_severity() -> String {
    "medium".to_string()
}

impl Issue {
    fn is_significant(&self) -> bool {
        matches!(self.severity.as_str(), "high" | "medium")
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub issues: Vec<Issue>,
    pub confidence: f32,
    pub needs_correction: bool,
    pub relevance_score: f32,
    pub completeness_score: f32,
}

impl ValidationResult {
    fn neutral(confidence: f32) -> Self {
        Self {
            issues: Vec::new(),
            confidence,
            needs_correction: false,
            relevance_score: 1.0,
            completeness_score: 1.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PreAnalysisResponse {
    #[serde(default)]
    dates: Vec<ExtractedFact>,
    #[serde(default)]
    names: Vec<ExtractedFact>,
    #[serde(default)]
    numbers: Vec<ExtractedFact>,
    #[serde(default)]
    claims: Vec<ExtractedFact>,
    #[serde(default)]
    responsibilities: Vec<ExtractedFact>,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default = "default_confidence")]
    confidence: f32,
    #[serde(default)]
    needs_correction: Option<bool>,
    #[serde(default = "default_score")]
    relevance_score: f32,
    #[serde(default = "default_score")]
    completeness_score: f32,
}

fn default_confidence() -> f32 {
    0.8
}

fn default_score() -> f32 {
    1.0
}

const PRE_ANALYSIS_PROMPT: &str = "Extract key facts from this context that a user might ask about.\n\n\
CONTEXT:\n{context}\n\nUSER QUESTION (for relevance):\n{query}\n\n\
Extract ALL factual information, organized by category. Be thorough - missing facts here could cause validation failures.\n\n\
Output ONLY valid JSON (no markdown, no explanation):\n\
{{\"dates\": [{{\"value\": \"the date/period\", \"context\": \"what it refers to\"}}], \
\"names\": [{{\"value\": \"name\", \"context\": \"who/what it is\"}}], \
\"numbers\": [{{\"value\": \"number/stat\", \"context\": \"what it measures\"}}], \
\"claims\": [{{\"value\": \"factual statement\", \"context\": \"source/topic\"}}], \
\"responsibilities\": [{{\"value\": \"role/duty/achievement\", \"context\": \"where/when\"}}]}}";

const VALIDATION_PROMPT: &str = "You are a judge validating an LLM response against source facts.\n\n\
EXTRACTED FACTS FROM CONTEXT:\n{analysis_json}\n\nLLM RESPONSE TO VALIDATE:\n{response}\n\n\
ORIGINAL USER QUESTION:\n{query}\n\n\
Check for fabricated gaps, hallucinations, relevance, completeness, missed information, and internal contradictions.\n\n\
Output ONLY valid JSON:\n\
{{\"issues\": [{{\"type\": \"FABRICATED_GAP\", \"claim\": \"...\", \"fact\": \"...\", \"correction\": \"...\", \"severity\": \"high\"}}], \
\"confidence\": 0.85, \"relevance_score\": 0.9, \"completeness_score\": 0.8, \"needs_correction\": true}}\n\n\
If no issues found, return: {{\"issues\": [], \"confidence\": 0.95, \"relevance_score\": 1.0, \"completeness_score\": 1.0, \"needs_correction\": false}}";

const CORRECTION_PROMPT: &str = "Fix the following issues in this response. Make minimal changes - only fix the specific issues identified.\n\n\
ORIGINAL RESPONSE:\n{response}\n\nISSUES TO FIX:\n{issues_json}\n\nAVAILABLE FACTS:\n{facts_json}\n\n\
Rules: only fix the specific issues listed, preserve the original structure and tone, use the facts to correct fabricated gaps, \
remove or correct hallucinated information, keep changes minimal and surgical.\n\n\
Output ONLY the corrected response text, nothing else.";

pub struct Judge {
    llm: std::sync::Arc<dyn LlmClient>,
    config: JudgeConfig,
}

impl Judge {
    pub fn new(llm: std::sync::Arc<dyn LlmClient>, config: JudgeConfig) -> Self {
        Self { llm, config }
    }

    fn build_context(sources: &[Hit]) -> String {
        sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                let content = source.expanded_content.as_deref().unwrap_or(&source.content);
                let doc_name = if !source.document.title.is_empty() {
                    &source.document.title
                } else {
                    &source.document.filename
                };
                format!("[{}] {}\nSource: {}", i + 1, content, doc_name)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Extracts facts from `sources` for later validation. Runs in parallel
    /// with generation in the chat orchestrator, not sequentially after it.
    #[tracing::instrument(skip(self, sources))]
    pub async fn pre_analyze_context(&self, sources: &[Hit], query: &str) -> ContextAnalysis {
        if !self.config.enabled || sources.is_empty() {
            return ContextAnalysis {
                query: query.to_string(),
                ..Default::default()
            };
        }

        let context = Self::build_context(sources);
        let prompt = PRE_ANALYSIS_PROMPT
            .replace("{context}", &context)
            .replace("{query}", query);

        let fallback = || ContextAnalysis {
            raw_context: context.clone(),
            query: query.to_string(),
            ..Default::default()
        };

        let call = self.llm.complete(vec![LlmMessage::user(prompt)]);
        let Ok(Ok(text)) = tokio::time::timeout(self.config.timeout, call).await else {
            return fallback();
        };

        let Ok(parsed) = serde_json::from_str::<PreAnalysisResponse>(&text) else {
            return fallback();
        };

        ContextAnalysis {
            dates: parsed.dates,
            names: parsed.names,
            numbers: parsed.numbers,
            claims: parsed.claims,
            responsibilities: parsed.responsibilities,
            raw_context: context,
            query: query.to_string(),
        }
    }

    /// Validates `response` against `analysis`. A disabled judge always
    /// reports full confidence; an analysis with no extracted facts can't
    /// meaningfully validate anything, so it reports reduced (not zero)
    /// confidence rather than attempting a judgment it has no basis for.
    #[tracing::instrument(skip(self, response, analysis))]
    pub async fn validate_response(&self, response: &str, analysis: &ContextAnalysis, query: &str) -> ValidationResult {
        if !self.config.enabled {
            return ValidationResult::neutral(1.0);
        }
        if !analysis.has_facts() {
            return ValidationResult::neutral(0.7);
        }

        let prompt = VALIDATION_PROMPT
            .replace("{analysis_json}", &analysis.to_prompt_json().to_string())
            .replace("{response}", response)
            .replace("{query}", query);

        let call = self.llm.complete(vec![LlmMessage::user(prompt)]);
        let Ok(Ok(text)) = tokio::time::timeout(self.config.timeout, call).await else {
            return ValidationResult::neutral(0.5);
        };

        let Ok(parsed) = serde_json::from_str::<ValidationResponse>(&text) else {
            return ValidationResult::neutral(0.5);
        };

        let needs_correction = parsed.needs_correction.unwrap_or(!parsed.issues.is_empty());
        ValidationResult {
            issues: parsed.issues,
            confidence: parsed.confidence,
            needs_correction,
            relevance_score: parsed.relevance_score,
            completeness_score: parsed.completeness_score,
        }
    }

    /// Applies a minimal correction to `response` for `validation`'s
    /// high/medium-severity issues. Returns the original response unchanged
    /// if correction isn't needed, no issue clears the severity bar, or the
    /// correction call itself fails.
    #[tracing::instrument(skip(self, response, validation, analysis))]
    pub async fn correct_response(&self, response: &str, validation: &ValidationResult, analysis: &ContextAnalysis) -> String {
        if !validation.needs_correction || validation.issues.is_empty() {
            return response.to_string();
        }

        let significant: Vec<&Issue> = validation.issues.iter().filter(|i| i.is_significant()).collect();
        if significant.is_empty() {
            return response.to_string();
        }

        let issues_json = serde_json::to_string(&significant).unwrap_or_else(|_| "[]".to_string());
        let prompt = CORRECTION_PROMPT
            .replace("{response}", response)
            .replace("{issues_json}", &issues_json)
            .replace("{facts_json}", &analysis.to_prompt_json().to_string());

        let call = self.llm.complete(vec![LlmMessage::user(prompt)]);
        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(text)) => text.trim().to_string(),
            _ => response.to_string(),
        }
    }

    /// Full analyze -> validate -> correct pipeline for non-streaming
    /// callers, or callers that didn't run pre-analysis in parallel.
    #[tracing::instrument(skip(self, response, sources))]
    pub async fn judge_response(&self, response: &str, sources: &[Hit], query: &str) -> (String, ValidationResult) {
        if !self.config.enabled {
            return (response.to_string(), ValidationResult::neutral(1.0));
        }

        let analysis = self.pre_analyze_context(sources, query).await;
        let validation = self.validate_response(response, &analysis, query).await;

        if validation.needs_correction {
            let corrected = self.correct_response(response, &validation, &analysis).await;
            return (corrected, validation);
        }

        (response.to_string(), validation)
    }
}
