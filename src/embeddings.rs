//! # Embeddings
//!
//! The store never looks inside an embedding model; it only needs something that turns
//! an input string into a vector of the store's dimension. That contract is the
//! [`Embedder`] trait.
//!
//! With the `embeddings` cargo feature enabled, [`SentenceEmbeddingsModel`] implements
//! it with a BERT sentence-transformer run through Candle (pure Rust ML framework):
//!
//! 1. Model config, tokenizer and safetensors weights are fetched from the Hugging Face
//!    hub (and cached there by `hf-hub`).
//! 2. The input is tokenized (truncated by the tokenizer at 512 tokens) and run through
//!    the model.
//! 3. Token embeddings are mean-pooled over the attention mask and L2-normalized.
//!
//! ```no_run
//! # #[cfg(feature = "embeddings")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use awful_vectors::embeddings::{Embedder, SentenceEmbeddingsModel};
//! use awful_vectors::vector_store::VectorStore;
//!
//! let model = SentenceEmbeddingsModel::load("sentence-transformers/all-MiniLM-L6-v2")?;
//! let store = VectorStore::new(model.dimension())?;
//! store.embed_and_append(&model, "Rust is great!", false)?;
//! # Ok(()) }
//! # #[cfg(not(feature = "embeddings"))]
//! # fn main() {}
//! ```

use crate::error::StoreError;

/// Produces fixed-length vectors from arbitrary input.
pub trait Embedder {
    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Embed `input`.
    ///
    /// # Errors
    /// [`StoreError::Embedding`] when the backend fails.
    fn embed(&self, input: &str) -> Result<Vec<f32>, StoreError>;
}

#[cfg(feature = "embeddings")]
pub use model::SentenceEmbeddingsModel;

#[cfg(feature = "embeddings")]
mod model {
    use candle_core::{DType, Device, Tensor};
    use candle_nn::VarBuilder;
    use candle_transformers::models::bert::{BertModel, Config, DTYPE};
    use hf_hub::{Repo, RepoType, api::sync::Api};
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    use super::Embedder;
    use crate::error::StoreError;

    fn backend<E: std::fmt::Display>(err: E) -> StoreError {
        StoreError::Embedding(err.to_string())
    }

    /// Sentence embeddings model using Candle (pure Rust).
    pub struct SentenceEmbeddingsModel {
        model: BertModel,
        tokenizer: Tokenizer,
        device: Device,
        dimension: usize,
    }

    impl SentenceEmbeddingsModel {
        /// Load `model_id` (e.g. `sentence-transformers/all-MiniLM-L6-v2`) from the
        /// Hugging Face hub on the CPU.
        ///
        /// # Errors
        /// [`StoreError::Embedding`] if any artifact cannot be fetched or parsed.
        pub fn load(model_id: &str) -> Result<Self, StoreError> {
            let device = Device::Cpu;
            let repo =
                Repo::with_revision(model_id.to_string(), RepoType::Model, "main".to_string());
            let api = Api::new().map_err(backend)?;
            let api_repo = api.repo(repo);

            let config_filename = api_repo.get("config.json").map_err(backend)?;
            let tokenizer_filename = api_repo.get("tokenizer.json").map_err(backend)?;
            let weights_filename = api_repo.get("model.safetensors").map_err(backend)?;

            let config = std::fs::read_to_string(config_filename)?;
            let config: Config = serde_json::from_str(&config).map_err(backend)?;
            let dimension = config.hidden_size;

            let tokenizer = Tokenizer::from_file(tokenizer_filename).map_err(backend)?;

            // SAFETY: the weights file is owned by the hub cache and not mutated while mapped.
            let vb = unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)
                    .map_err(backend)?
            };
            let model = BertModel::load(vb, &config).map_err(backend)?;

            info!(model_id, dimension, "loaded sentence embeddings model");
            Ok(Self {
                model,
                tokenizer,
                device,
                dimension,
            })
        }

        fn encode(&self, text: &str) -> candle_core::Result<Vec<f32>> {
            let tokens = self
                .tokenizer
                .encode(text, true)
                .map_err(candle_core::Error::msg)?;
            debug!(tokens = tokens.len(), "tokenized input");

            let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
            let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

            let output = self.model.forward(&token_ids, &token_type_ids, None)?;
            let pooled = self.mean_pooling(&output, tokens.get_attention_mask())?;
            let normalized = pooled.broadcast_div(&pooled.sqr()?.sum_all()?.sqrt()?)?;
            normalized.to_vec1::<f32>()
        }

        /// Mean over the sequence axis, counting only unmasked tokens.
        ///
        /// `embeddings` is `[1, seq_len, hidden]`; the result is `[hidden]`.
        fn mean_pooling(
            &self,
            embeddings: &Tensor,
            attention_mask: &[u32],
        ) -> candle_core::Result<Tensor> {
            let mask = Tensor::new(attention_mask, &self.device)?
                .to_dtype(DType::F32)?
                .unsqueeze(0)?
                .unsqueeze(2)?;

            let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
            let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;
            sum.broadcast_div(&count)?.squeeze(0)
        }
    }

    impl Embedder for SentenceEmbeddingsModel {
        fn dimension(&self) -> usize {
            self.dimension
        }

        fn embed(&self, input: &str) -> Result<Vec<f32>, StoreError> {
            self.encode(input).map_err(backend)
        }
    }

}
