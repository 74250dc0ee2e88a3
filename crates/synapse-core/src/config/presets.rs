//! Named generation presets. The Chat Orchestrator selects one by name to
//! fill in `temperature`/`max_tokens`/prompt template when a caller doesn't
//! specify its own generation parameters.

use serde::{Deserialize, Serialize};

/// One of the fixed preset names a caller may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPreset {
    Concise,
    Detailed,
    Research,
    Technical,
    Creative,
    Qna,
}

impl GenerationPreset {
    pub const ALL: [GenerationPreset; 6] = [
        GenerationPreset::Concise,
        GenerationPreset::Detailed,
        GenerationPreset::Research,
        GenerationPreset::Technical,
        GenerationPreset::Creative,
        GenerationPreset::Qna,
    ];
}

/// Resolved generation parameters for a [`GenerationPreset`].
#[derive(Debug, Clone)]
pub struct Preset {
    pub temperature: f32,
    pub max_tokens: u32,
    pub template: &'static str,
}

/// Parameters for each generation preset: sampling settings plus a
/// per-mode system prompt template.
pub fn preset_table(preset: GenerationPreset) -> Preset {
    match preset {
        GenerationPreset::Concise => Preset {
            temperature: 0.2,
            max_tokens: 400,
            template: "Answer in at most three sentences, using only the provided context.",
        },
        GenerationPreset::Detailed => Preset {
            temperature: 0.4,
            max_tokens: 2048,
            template: "Answer thoroughly, citing the provided context and noting any gaps.",
        },
        GenerationPreset::Research => Preset {
            temperature: 0.3,
            max_tokens: 3072,
            template: "Synthesize findings across the provided context like a literature review, \
                       distinguishing well-supported claims from speculative ones.",
        },
        GenerationPreset::Technical => Preset {
            temperature: 0.1,
            max_tokens: 2048,
            template: "Answer with precise technical detail, including code or configuration \
                       from the context verbatim where relevant.",
        },
        GenerationPreset::Creative => Preset {
            temperature: 0.8,
            max_tokens: 1024,
            template: "Answer engagingly while staying grounded in the provided context.",
        },
        GenerationPreset::Qna => Preset {
            temperature: 0.0,
            max_tokens: 256,
            template: "Answer the question directly in one or two sentences.",
        },
    }
}
