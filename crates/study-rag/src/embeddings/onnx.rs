//! ONNX Runtime sentence-transformer embedder
//!
//! Mean pooling over the attention mask, then L2 normalization. The model
//! and tokenizer are downloaded into the cache directory on first use.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;

/// Texts per inference call
const INFERENCE_BATCH: usize = 32;

struct OnnxModel {
    session: Session,
    tokenizer: Tokenizer,
    max_length: usize,
}

/// Sentence-transformer embedder backed by ONNX Runtime
pub struct OnnxEmbedder {
    model: Arc<Mutex<OnnxModel>>,
    model_name: String,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Load (downloading if needed) the configured model
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        let model_dir = config.cache_dir.join(&config.model);
        std::fs::create_dir_all(&model_dir)
            .map_err(|e| Error::Config(format!("Failed to create cache directory: {}", e)))?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            download(&config.model, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download(&config.model, "tokenizer.json", &tokenizer_path).await?;
        }

        if config.device != "cpu" {
            tracing::warn!(
                "EMBEDDING_DEVICE={} is not supported by this build, using cpu",
                config.device
            );
        }

        let session = Session::builder()
            .map_err(|e| Error::Embedding(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::Embedding(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::Embedding(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::Embedding(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Embedding(format!("Failed to load tokenizer: {}", e)))?;

        let mut model = OnnxModel {
            session,
            tokenizer,
            max_length: config.max_length,
        };

        // the hidden size depends on the model, so read it off a real output
        let dimensions = model
            .embed(&["dimension check".to_string()])?
            .first()
            .map(Vec::len)
            .filter(|&d| d > 0)
            .ok_or_else(|| Error::Embedding(format!("{} produced an empty embedding", config.model)))?;

        tracing::info!("ONNX embedder ready ({} dims)", dimensions);

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: config.model.clone(),
            dimensions,
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        tokio::task::spawn_blocking(move || {
            let mut model = model.lock();
            let mut all = Vec::with_capacity(texts.len());
            for batch in texts.chunks(INFERENCE_BATCH) {
                all.extend(model.embed(batch)?);
            }
            Ok(all)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }
}

impl OnnxModel {
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Embedding(format!("Tokenization failed: {}", e)))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for j in 0..ids.len().min(seq_len) {
                input_ids[i * seq_len + j] = ids[j] as i64;
                attention_mask[i * seq_len + j] = mask[j] as i64;
                token_type_ids[i * seq_len + j] = types[j] as i64;
            }
        }

        let shape = vec![batch_size, seq_len];
        let ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| Error::Embedding(format!("Input tensor creation failed: {}", e)))?;
        let mask_tensor = Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
            .map_err(|e| Error::Embedding(format!("Attention mask tensor creation failed: {}", e)))?;
        let types_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
            .map_err(|e| Error::Embedding(format!("Token type tensor creation failed: {}", e)))?;

        let inputs = vec![
            ("input_ids", ids_tensor.into_dyn()),
            ("attention_mask", mask_tensor.into_dyn()),
            ("token_type_ids", types_tensor.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::Embedding(format!("Inference failed: {}", e)))?;

        let output_list: Vec<_> = outputs.iter().collect();
        let output = output_list
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_list.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::Embedding("No output tensor".to_string()))?;

        let (tensor_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Embedding(format!("Failed to extract tensor: {}", e)))?;

        let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
        match dims.len() {
            // token embeddings: [batch, seq, hidden]
            3 => {
                let hidden = dims[2];
                Ok((0..batch_size)
                    .map(|i| mean_pool(data, &attention_mask[i * seq_len..(i + 1) * seq_len], i, seq_len, hidden))
                    .collect())
            }
            // already pooled: [batch, hidden]
            2 => {
                let hidden = dims[1];
                Ok(data
                    .chunks(hidden.max(1))
                    .take(batch_size)
                    .map(|row| normalize(row.to_vec()))
                    .collect())
            }
            rank => Err(Error::Embedding(format!(
                "Unexpected output tensor rank {} ({:?})",
                rank, dims
            ))),
        }
    }
}

/// Masked mean over token vectors, L2-normalized
fn mean_pool(data: &[f32], mask: &[i64], row: usize, seq_len: usize, hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (j, m) in mask.iter().enumerate() {
        if *m == 0 {
            continue;
        }
        let base = row * seq_len * hidden + j * hidden;
        if let Some(token) = data.get(base..base + hidden) {
            for (acc, v) in pooled.iter_mut().zip(token) {
                *acc += v;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        pooled.iter_mut().for_each(|v| *v /= count);
    }
    normalize(pooled)
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

/// Fetch a sentence-transformers artifact from the Hugging Face hub
async fn download(model_name: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!(
        "https://huggingface.co/sentence-transformers/{}/resolve/main/{}",
        model_name, file
    );
    tracing::info!("Downloading {}", url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::Embedding(format!("Failed to download {}: {}", file, e)))?;
    if !response.status().is_success() {
        return Err(Error::Embedding(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Embedding(format!("Failed to read {}: {}", file, e)))?;
    tokio::fs::write(path, &bytes).await?;

    tracing::info!("Downloaded {} ({} bytes)", file, bytes.len());
    Ok(())
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Empty embedding result".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts.to_vec()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "onnx"
    }

    fn model(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        // one row, three tokens, hidden size 2; last token is padding
        let data = [1.0, 0.0, 3.0, 0.0, 100.0, 100.0];
        let pooled = mean_pool(&data, &[1, 1, 0], 0, 3, 2);
        assert_eq!(pooled, vec![1.0, 0.0]);
    }

    #[test]
    fn test_pooling_keeps_model_hidden_size() {
        // hidden size 4, two real tokens
        let data = [3.0, 0.0, 0.0, 4.0, 3.0, 0.0, 0.0, 4.0];
        let pooled = mean_pool(&data, &[1, 1], 0, 2, 4);
        assert_eq!(pooled.len(), 4);
        assert!((pooled[0] - 0.6).abs() < 1e-6);
        assert!((pooled[3] - 0.8).abs() < 1e-6);

        assert_eq!(normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
