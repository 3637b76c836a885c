//! # Knowledge Base Retriever
//!
//! Finds the knowledge-base chunks most relevant to an AI output, so the
//! entailment check can ground its verification in tenant-supplied
//! reference material instead of (or alongside) the caller-supplied
//! context. Relevance is cosine similarity between a query embedding and
//! each chunk's stored embedding; chunks below the tenant's relevance
//! floor are dropped before concatenation.

use serde::{Deserialize, Serialize};

use crate::models::KbMatch;
use crate::rpc::RpcClient;

const PREVIEW_CHARS: usize = 100;

/// One chunk in a tenant's knowledge base, with its precomputed embedding.
#[derive(Debug, Clone)]
pub struct KbChunk {
    pub chunk_id: String,
    pub document_name: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// The outcome of a retrieval call: the concatenated context handed to the
/// entailment check, and the per-chunk match records returned to the caller.
#[derive(Debug, Clone, Default)]
pub struct KbRetrieval {
    pub context: Option<String>,
    pub matches: Vec<KbMatch>,
}

pub struct KbRetriever {
    client: RpcClient,
    embedding_service_url: String,
}

impl KbRetriever {
    pub fn new(embedding_service_url: impl Into<String>) -> Self {
        Self {
            client: RpcClient::new(),
            embedding_service_url: embedding_service_url.into(),
        }
    }

    /// Embed `query`, score it against `corpus`, and keep the top `top_k`
    /// chunks whose relevance (`1 - cosine_distance`, i.e. cosine
    /// similarity) meets or exceeds `min_relevance`.
    pub async fn retrieve(
        &self,
        query: &str,
        corpus: &[KbChunk],
        min_relevance: f64,
        top_k: usize,
    ) -> KbRetrieval {
        if corpus.is_empty() {
            return KbRetrieval::default();
        }

        let query_embedding = self.embed(query).await;

        let mut scored: Vec<(f64, &KbChunk)> = corpus
            .iter()
            .map(|chunk| (relevance(&query_embedding, chunk, query), chunk))
            .filter(|(score, _)| *score >= min_relevance)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        if scored.is_empty() {
            return KbRetrieval::default();
        }

        let context = scored
            .iter()
            .map(|(_, chunk)| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let matches = scored
            .into_iter()
            .map(|(score, chunk)| KbMatch {
                chunk_id: chunk.chunk_id.clone(),
                document_name: chunk.document_name.clone(),
                relevance_score: (score * 1000.0).round() / 1000.0,
                content_preview: preview(&chunk.content),
            })
            .collect();

        KbRetrieval {
            context: Some(context),
            matches,
        }
    }

    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let request = EmbedRequest { text };
        self.client
            .post_json::<_, EmbedResponse>(&self.embedding_service_url, &request)
            .await
            .ok()
            .map(|r| r.embedding)
    }
}

/// Scores a chunk against the query, using the embedding-space cosine
/// similarity when an embedding was obtained, or a token-overlap fallback
/// (the same fallback posture every check adapter uses) otherwise.
fn relevance(query_embedding: &Option<Vec<f32>>, chunk: &KbChunk, query: &str) -> f64 {
    match query_embedding {
        Some(q) if !chunk.embedding.is_empty() => cosine_similarity(q, &chunk.embedding),
        _ => token_overlap(query, &chunk.content),
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

fn token_overlap(query: &str, content: &str) -> f64 {
    let query_tokens = crate::chunking::meaningful_tokens(query);
    if query_tokens.is_empty() {
        return 0.0;
    }
    let content_tokens = crate::chunking::meaningful_tokens(content);
    let overlap = query_tokens.iter().filter(|t| content_tokens.contains(t)).count();
    overlap as f64 / query_tokens.len() as f64
}

fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, content: &str, embedding: Vec<f32>) -> KbChunk {
        KbChunk {
            chunk_id: id.to_string(),
            document_name: "handbook.md".to_string(),
            content: content.to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn falls_back_to_token_overlap_without_embeddings() {
        let retriever = KbRetriever::new("http://127.0.0.1:1/embed");
        let corpus = vec![
            chunk("c1", "Refunds are processed within five business days.", vec![]),
            chunk("c2", "The office is closed on national holidays.", vec![]),
        ];
        let result = retriever
            .retrieve("How long do refunds take to process?", &corpus, 0.1, 5)
            .await;
        assert!(result.matches.iter().any(|m| m.chunk_id == "c1"));
    }

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn relevance_floor_excludes_weak_matches() {
        let retriever = KbRetriever::new("http://127.0.0.1:1/embed");
        let corpus = vec![chunk("c1", "completely unrelated filler text", vec![])];
        let result = retriever.retrieve("refund policy", &corpus, 0.9, 5).await;
        assert!(result.matches.is_empty());
        assert!(result.context.is_none());
    }
}
