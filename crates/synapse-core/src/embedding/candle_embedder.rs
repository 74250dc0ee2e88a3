//! BERT-family sentence embedder over `candle`: loads a tokenizer and model
//! weights from a local directory and mean-pools token embeddings into a
//! single fixed-dimension vector per input.

use std::path::Path;

use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;

use super::{Embedder, MAX_BATCH_SIZE};
use crate::embedding::EmbeddingError;

/// Loads a tokenizer, truncating/padding to `max_seq_len`.
fn load_tokenizer(path: &Path, max_seq_len: usize) -> Result<Tokenizer, EmbeddingError> {
    let mut tokenizer =
        Tokenizer::from_file(path).map_err(|e| EmbeddingError::TokenizationFailed {
            reason: e.to_string(),
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
    Ok(tokenizer)
}

fn select_device() -> Device {
    Device::Cpu
}

/// Candle-backed embedder. Holds the model, tokenizer and device; safe to
/// share across requests behind an `Arc` since inference only borrows.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl CandleEmbedder {
    pub fn load(model_dir: &Path, dimension: usize, max_seq_len: usize) -> Result<Self, EmbeddingError> {
        if !model_dir.exists() {
            return Err(EmbeddingError::ModelNotFound {
                path: model_dir.display().to_string(),
            });
        }
        let device = select_device();
        let config_path = model_dir.join("config.json");
        let config_str = std::fs::read_to_string(&config_path)?;
        let config: BertConfig =
            serde_json::from_str(&config_str).map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: e.to_string(),
            })?;

        let weights_path = model_dir.join("model.safetensors");
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| EmbeddingError::ModelLoadFailed {
                    reason: e.to_string(),
                })?
        };
        let model = BertModel::load(vb, &config).map_err(|e| EmbeddingError::ModelLoadFailed {
            reason: e.to_string(),
        })?;

        let tokenizer = load_tokenizer(&model_dir.join("tokenizer.json"), max_seq_len)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
        })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            })?;
        let ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = ids.zeros_like()?;

        let output = self.model.forward(&ids, &token_type_ids, Some(&mask))?;
        // mean-pool over the sequence dimension, the standard sentence-embedding
        // reduction for a BERT-family encoder with no pooler head.
        let pooled = output.mean(1)?;
        let vector: Vec<f32> = pooled.squeeze(0)?.to_vec1()?;

        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for CandleEmbedder {
    #[tracing::instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_one(text)
    }

    #[tracing::instrument(skip(self, texts))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for sub_batch in texts.chunks(MAX_BATCH_SIZE) {
            for t in sub_batch {
                out.push(self.embed_one(t)?);
            }
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_available(&self) -> bool {
        true
    }
}
