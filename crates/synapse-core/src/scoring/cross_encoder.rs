use std::cmp::Ordering;
use std::path::Path;

use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::debug;

use super::{RerankError, Reranker};
use crate::embedding::EmbeddingError;
use crate::types::Hit;

/// Cross-encoder reranker: scores `(query, chunk content)` pairs jointly
/// rather than comparing independently-computed embeddings.
pub struct CrossEncoderReranker {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderReranker {
    pub fn load(model_dir: &Path, max_seq_len: usize) -> Result<Self, RerankError> {
        if !model_dir.exists() {
            return Err(RerankError::Embedding(EmbeddingError::ModelNotFound {
                path: model_dir.display().to_string(),
            }));
        }
        let device = Device::Cpu;
        let config_str = std::fs::read_to_string(model_dir.join("config.json"))
            .map_err(EmbeddingError::from)?;
        let config: BertConfig = serde_json::from_str(&config_str).map_err(|e| {
            EmbeddingError::ModelLoadFailed {
                reason: e.to_string(),
            }
        })?;
        let weights_path = model_dir.join("model.safetensors");
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(EmbeddingError::from)?
        };
        let model = BertModel::load(vb, &config).map_err(EmbeddingError::from)?;

        let mut tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json")).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;
        let truncation = tokenizers::TruncationParams {
            max_length: max_seq_len,
            ..Default::default()
        };
        tokenizer
            .with_truncation(Some(truncation))
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            })?;

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn score_pair(&self, query: &str, candidate: &str) -> Result<f32, RerankError> {
        let encoding = self
            .tokenizer
            .encode((query, candidate), true)
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            })?;
        let ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(EmbeddingError::from)?;
        let mask = Tensor::new(encoding.get_attention_mask(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(EmbeddingError::from)?;
        let token_type_ids = ids.zeros_like().map_err(EmbeddingError::from)?;

        let output = self
            .model
            .forward(&ids, &token_type_ids, Some(&mask))
            .map_err(EmbeddingError::from)?;
        let pooled = output.mean(1).map_err(EmbeddingError::from)?;
        let logit: f32 = pooled
            .squeeze(0)
            .and_then(|t| t.mean(0))
            .and_then(|t| t.to_scalar())
            .map_err(EmbeddingError::from)?;
        // squash to [0, 1] so thresholds compare meaningfully against the
        // base-search cosine/RRF scores this reranker's output replaces.
        Ok(1.0 / (1.0 + (-logit).exp()))
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    #[tracing::instrument(skip(self, query, hits), fields(num_hits = hits.len()))]
    async fn rerank(&self, query: &str, mut hits: Vec<Hit>) -> Result<Vec<Hit>, RerankError> {
        for hit in &mut hits {
            let content = hit.expanded_content.as_deref().unwrap_or(&hit.content);
            let score = self.score_pair(query, content)?;
            hit.rerank_score = Some(score);
        }
        hits.sort_by(|a, b| {
            b.rerank_score
                .unwrap_or(f32::MIN)
                .partial_cmp(&a.rerank_score.unwrap_or(f32::MIN))
                .unwrap_or(Ordering::Equal)
        });
        debug!(num_hits = hits.len(), "cross-encoder rerank complete");
        Ok(hits)
    }

    fn is_available(&self) -> bool {
        true
    }
}
