//! In-memory per-session vector index with diversity-aware search.
//!
//! Vectors are L2-normalized at insert so cosine similarity is a dot product.
//! Search re-ranks by maximal marginal relevance: plain top-k returns
//! near-duplicate chunks when a document repeats phrasing, so each selection
//! step trades relevance against similarity to what was already picked.

use crate::embeddings::EmbeddingModel;
use crate::error::ChatError;
use crate::types::{Chunk, RetrievedChunk};

struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

pub struct VectorIndex {
    model_id: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
            entries: Vec::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embed `chunks` and insert them all, or insert nothing.
    ///
    /// The batch is staged until every embedding succeeded, so a failing
    /// embed call leaves the index exactly as it was. Building with a
    /// different embedding model replaces the whole index rather than mixing
    /// vectors from two models.
    pub async fn build(
        &mut self,
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingModel,
    ) -> Result<usize, ChatError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_documents(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(ChatError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let mut staged = Vec::with_capacity(chunks.len());
        for (chunk, mut vector) in chunks.into_iter().zip(vectors) {
            if vector.len() != embedder.dimension() {
                return Err(ChatError::Embedding(format!(
                    "Embedding dimension {} does not match expected {}",
                    vector.len(),
                    embedder.dimension()
                )));
            }
            normalize(&mut vector);
            staged.push(IndexEntry { chunk, vector });
        }

        if embedder.model_id() != self.model_id {
            tracing::info!(
                old_model = %self.model_id,
                new_model = %embedder.model_id(),
                "Embedding model changed; replacing index contents"
            );
            self.entries.clear();
            self.model_id = embedder.model_id().to_string();
            self.dimension = embedder.dimension();
        }

        let inserted = staged.len();
        self.entries.extend(staged);
        Ok(inserted)
    }

    /// Return up to `k` chunks ranked by maximal marginal relevance:
    /// `diversity_weight * sim(query, c) - (1 - diversity_weight) *
    /// max_sim(c, selected)`, ties broken by plain-similarity rank.
    /// `diversity_weight = 1.0` degenerates to plain top-k.
    ///
    /// Scores on the returned chunks are the raw query similarities, kept for
    /// traceability regardless of the diversity re-ranking.
    pub fn search(&self, query: &[f32], k: usize, diversity_weight: f32) -> Vec<RetrievedChunk> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        // Plain similarity ranking; rank index doubles as the tie-breaker.
        let mut ranked: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, dot(&query, &e.vector)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let w = diversity_weight.clamp(0.0, 1.0);
        let mut selected: Vec<usize> = Vec::new();
        // (rank, entry index, query similarity)
        let mut candidates: Vec<(usize, usize, f32)> = ranked
            .into_iter()
            .enumerate()
            .map(|(rank, (idx, sim))| (rank, idx, sim))
            .collect();

        let mut results = Vec::new();
        while results.len() < k && !candidates.is_empty() {
            let mut best: Option<(usize, f32)> = None; // (candidate position, mmr score)
            for (pos, &(_, idx, sim)) in candidates.iter().enumerate() {
                let redundancy = if selected.is_empty() {
                    0.0
                } else {
                    selected
                        .iter()
                        .map(|&s| dot(&self.entries[idx].vector, &self.entries[s].vector))
                        .fold(f32::NEG_INFINITY, f32::max)
                };
                let mmr = w * sim - (1.0 - w) * redundancy;
                let better = match best {
                    None => true,
                    // Candidates are iterated in rank order, so on a tie the
                    // earlier (better-ranked) one is kept.
                    Some((_, best_mmr)) => mmr > best_mmr,
                };
                if better {
                    best = Some((pos, mmr));
                }
            }

            let (pos, _) = best.expect("candidates is non-empty");
            let (rank, idx, sim) = candidates.remove(pos);
            selected.push(idx);
            results.push(RetrievedChunk {
                chunk: self.entries[idx].chunk.clone(),
                score: sim,
                rank,
            });
        }

        results
    }
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
