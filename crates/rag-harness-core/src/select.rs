//! Selector with similarity, diversity-balanced (MMR), and multi-variant
//! strategies.
//!
//! The selector operates entirely through the [`Embedder`], [`VectorIndex`]
//! and [`QueryExpander`] traits, with no configuration or I/O of its own.
//!
//! # Strategies
//!
//! | Strategy | Algorithm |
//! |----------|-----------|
//! | `Similarity` | Top `k` records by ascending distance to the query vector |
//! | `DiversityBalanced { lambda }` | Maximal marginal relevance over a pool of `max(fetch_k, k)` neighbours |
//! | `MultiVariant { variants }` | Similarity per paraphrased query, merged in variant order, de-duplicated, capped at `k` |
//!
//! # Edge cases
//!
//! 1. `k <= 0` returns an empty result without calling any service.
//! 2. An empty index returns an empty result for every strategy.
//! 3. Service failures surface as [`RetrievalError::ServiceUnavailable`].

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{RetrievalError, Result};
use crate::expand::QueryExpander;
use crate::index::VectorIndex;
use crate::models::{Record, Strategy};

/// Selection tuning parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct SelectParams {
    /// Size of the candidate pool MMR re-ranks (raised to `k` if smaller).
    pub fetch_k: usize,
    /// Also run the original query alongside the generated variants.
    pub include_original: bool,
}

impl Default for SelectParams {
    fn default() -> Self {
        Self {
            fetch_k: 20,
            include_original: false,
        }
    }
}

/// Binds an embedder, an index and an optional query expander.
pub struct Selector<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    expander: Option<&'a dyn QueryExpander>,
    params: SelectParams,
}

impl<'a> Selector<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn VectorIndex) -> Self {
        Self {
            embedder,
            index,
            expander: None,
            params: SelectParams::default(),
        }
    }

    /// Attach the expander required by [`Strategy::MultiVariant`].
    pub fn with_expander(mut self, expander: &'a dyn QueryExpander) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn with_params(mut self, params: SelectParams) -> Self {
        self.params = params;
        self
    }

    /// Return at most `k` records for `query`, most relevant first.
    pub async fn select(&self, query: &str, strategy: &Strategy, k: i64) -> Result<Vec<Record>> {
        if k <= 0 {
            return Ok(Vec::new());
        }
        let k = k as usize;
        validate_strategy(strategy)?;

        if self.index.count().await? == 0 {
            debug!("index is empty, nothing to select");
            return Ok(Vec::new());
        }

        debug!(strategy = strategy.name(), k, "selecting");
        match *strategy {
            Strategy::Similarity => self.similarity(query, k).await,
            Strategy::DiversityBalanced { lambda } => self.diversity_balanced(query, k, lambda).await,
            Strategy::MultiVariant { variants } => self.multi_variant(query, k, variants).await,
        }
    }

    async fn similarity(&self, query: &str, k: usize) -> Result<Vec<Record>> {
        let query_vec = self.embedder.embed_query(query).await?;
        let hits = self.index.search_by_vector(&query_vec, k).await?;
        Ok(hits.into_iter().map(|c| c.record).collect())
    }

    async fn diversity_balanced(&self, query: &str, k: usize, lambda: f32) -> Result<Vec<Record>> {
        let query_vec = self.embedder.embed_query(query).await?;
        let pool_size = self.params.fetch_k.max(k);
        let pool = self.index.search_by_vector(&query_vec, pool_size).await?;

        let vectors: Vec<&[f32]> = pool.iter().map(|c| c.vector.as_slice()).collect();
        let picks = maximal_marginal_relevance(&query_vec, &vectors, lambda, k);

        let mut pool: Vec<Option<Record>> = pool.into_iter().map(|c| Some(c.record)).collect();
        Ok(picks
            .into_iter()
            .filter_map(|i| pool.get_mut(i).and_then(Option::take))
            .collect())
    }

    async fn multi_variant(&self, query: &str, k: usize, count: usize) -> Result<Vec<Record>> {
        let expander = self
            .expander
            .ok_or(RetrievalError::MissingCapability("query expander"))?;

        let mut variants = expander.expand(query, count).await?;
        if variants.is_empty() {
            warn!("query expander produced no variants, using the original query");
            variants.push(query.to_string());
        } else if self.params.include_original && !variants.iter().any(|v| v == query) {
            variants.insert(0, query.to_string());
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut merged = Vec::new();
        for variant in &variants {
            let hits = self.similarity(variant, k).await?;
            debug!(variant = variant.as_str(), hits = hits.len(), "variant results");
            for record in hits {
                if seen.insert(record.id.clone()) {
                    merged.push(record);
                }
            }
        }
        merged.truncate(k);
        Ok(merged)
    }
}

fn validate_strategy(strategy: &Strategy) -> Result<()> {
    match *strategy {
        Strategy::DiversityBalanced { lambda } if !(0.0..=1.0).contains(&lambda) => {
            Err(RetrievalError::InvalidParameter(format!(
                "lambda must be in [0.0, 1.0], got {}",
                lambda
            )))
        }
        Strategy::MultiVariant { variants: 0 } => Err(RetrievalError::InvalidParameter(
            "variants must be >= 1".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Maximal marginal relevance over `candidates`, returning picked indices
/// in pick order.
///
/// The first pick is the candidate most similar to `query`. Each later
/// pick maximises `λ·sim(query, c) − (1−λ)·max sim(c, picked)`, with cosine
/// similarity throughout. Ties go to the lower index. Stops after `k`
/// picks or when the candidates run out.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[&[f32]],
    lambda: f32,
    k: usize,
) -> Vec<usize> {
    let n = candidates.len();
    if k == 0 || n == 0 {
        return Vec::new();
    }

    let query_sims: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut first = 0;
    for (i, sim) in query_sims.iter().enumerate() {
        if *sim > query_sims[first] {
            first = i;
        }
    }

    let mut picked = vec![first];
    let mut is_picked = vec![false; n];
    is_picked[first] = true;
    let mut redundancy: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(c, candidates[first]))
        .collect();

    while picked.len() < k.min(n) {
        let mut best: Option<(usize, f32)> = None;
        for i in (0..n).filter(|&i| !is_picked[i]) {
            let score = lambda * query_sims[i] - (1.0 - lambda) * redundancy[i];
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        let Some((next, _)) = best else { break };

        picked.push(next);
        is_picked[next] = true;
        for (i, r) in redundancy.iter_mut().enumerate() {
            let sim = cosine_similarity(candidates[i], candidates[next]);
            if sim > *r {
                *r = sim;
            }
        }
    }

    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Distance;
    use crate::index::{index_records, memory::InMemoryIndex};
    use crate::models::Corpus;
    use crate::testing::{AxisEmbedder, DownEmbedder};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;

    struct FixedExpander(Vec<&'static str>);

    #[async_trait]
    impl QueryExpander for FixedExpander {
        async fn expand(&self, _query: &str, count: usize) -> Result<Vec<String>> {
            Ok(self.0.iter().take(count).map(|s| s.to_string()).collect())
        }
    }

    async fn animal_index(embedder: &AxisEmbedder, texts: &[&str]) -> InMemoryIndex {
        let index = InMemoryIndex::new();
        let mut corpus = Corpus::new();
        for t in texts {
            corpus = corpus.text(*t);
        }
        index_records(embedder, &index, corpus.into_records(), 2)
            .await
            .unwrap();
        index
    }

    fn texts(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.text.as_str()).collect()
    }

    #[tokio::test]
    async fn test_kitten_selects_cat() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["cat", "dog", "car"]).await;
        let selector = Selector::new(&embedder, &index);

        let results = selector
            .select("kitten", &Strategy::Similarity, 1)
            .await
            .unwrap();
        assert_eq!(texts(&results), vec!["cat"]);
    }

    #[tokio::test]
    async fn test_non_positive_k_is_empty_without_service_calls() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["cat", "dog"]).await;
        let before = embedder.calls.load(Ordering::SeqCst);
        let expander = FixedExpander(vec!["dog"]);
        let selector = Selector::new(&embedder, &index).with_expander(&expander);

        for k in [0, -1, -100] {
            for strategy in [
                Strategy::Similarity,
                Strategy::DiversityBalanced { lambda: 0.5 },
                Strategy::MultiVariant { variants: 2 },
            ] {
                assert!(selector.select("cat", &strategy, k).await.unwrap().is_empty());
            }
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_empty_for_every_strategy() {
        let index = InMemoryIndex::new();
        let expander = FixedExpander(vec!["anything"]);
        // A down embedder proves no service is contacted for an empty index.
        let selector = Selector::new(&DownEmbedder, &index).with_expander(&expander);

        for strategy in [
            Strategy::Similarity,
            Strategy::DiversityBalanced { lambda: 0.3 },
            Strategy::MultiVariant { variants: 3 },
        ] {
            assert!(selector.select("any query", &strategy, 3).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_similarity_is_deterministic() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["dog", "cat", "car", "kitten", "puppy"]).await;
        let selector = Selector::new(&embedder, &index);

        let first = selector.select("feline", &Strategy::Similarity, 5).await.unwrap();
        for _ in 0..5 {
            let again = selector.select("feline", &Strategy::Similarity, 5).await.unwrap();
            assert_eq!(first, again);
        }
        assert_eq!(&texts(&first)[..2], &["cat", "kitten"]);
    }

    #[tokio::test]
    async fn test_euclidean_index_changes_similarity_ranking() {
        let embedder = AxisEmbedder::animals();
        let records = Corpus::new().text("cat cat cat").text("cat dog").into_records();

        let cosine = InMemoryIndex::new();
        index_records(&embedder, &cosine, records.clone(), 8).await.unwrap();
        let results = Selector::new(&embedder, &cosine)
            .select("kitten", &Strategy::Similarity, 2)
            .await
            .unwrap();
        assert_eq!(texts(&results), vec!["cat cat cat", "cat dog"]);

        let euclidean = InMemoryIndex::with_distance(Distance::Euclidean);
        index_records(&embedder, &euclidean, records, 8).await.unwrap();
        let selector = Selector::new(&embedder, &euclidean);
        let results = selector
            .select("kitten", &Strategy::Similarity, 2)
            .await
            .unwrap();
        assert_eq!(texts(&results), vec!["cat dog", "cat cat cat"]);

        // MMR scores with cosine whatever the index metric.
        let results = selector
            .select("kitten", &Strategy::DiversityBalanced { lambda: 1.0 }, 1)
            .await
            .unwrap();
        assert_eq!(texts(&results), vec!["cat cat cat"]);
    }

    #[tokio::test]
    async fn test_unavailable_embedder_surfaces() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["cat"]).await;
        let selector = Selector::new(&DownEmbedder, &index);

        let err = selector
            .select("kitten", &Strategy::Similarity, 1)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_mmr_has_no_duplicates_and_respects_k() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(
            &embedder,
            &["cat", "kitten", "feline cat", "dog", "puppy", "car"],
        )
        .await;
        let selector = Selector::new(&embedder, &index);

        for lambda in [0.0, 0.25, 0.5, 1.0] {
            let results = selector
                .select("cat", &Strategy::DiversityBalanced { lambda }, 4)
                .await
                .unwrap();
            assert_eq!(results.len(), 4);
            let ids: HashSet<&str> = results.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids.len(), results.len(), "duplicate at lambda={}", lambda);
        }
    }

    #[tokio::test]
    async fn test_mmr_diversifies_at_low_lambda() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["cat", "kitten", "dog", "car"]).await;
        let selector = Selector::new(&embedder, &index);

        let relevant = selector
            .select("cat", &Strategy::DiversityBalanced { lambda: 1.0 }, 2)
            .await
            .unwrap();
        assert_eq!(texts(&relevant), vec!["cat", "kitten"]);

        let diverse = selector
            .select("cat", &Strategy::DiversityBalanced { lambda: 0.0 }, 2)
            .await
            .unwrap();
        assert_eq!(diverse[0].text, "cat");
        assert_ne!(diverse[1].text, "kitten");
    }

    #[tokio::test]
    async fn test_mmr_pool_smaller_than_k() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["cat", "dog"]).await;
        let selector = Selector::new(&embedder, &index).with_params(SelectParams {
            fetch_k: 1,
            include_original: false,
        });
        let results = selector
            .select("cat", &Strategy::DiversityBalanced { lambda: 0.5 }, 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_parameters() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["cat"]).await;
        let selector = Selector::new(&embedder, &index);

        for lambda in [-0.1, 1.5, f32::NAN] {
            let err = selector
                .select("cat", &Strategy::DiversityBalanced { lambda }, 1)
                .await
                .unwrap_err();
            assert!(matches!(err, RetrievalError::InvalidParameter(_)));
        }
        let err = selector
            .select("cat", &Strategy::MultiVariant { variants: 0 }, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_multi_variant_requires_expander() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["cat"]).await;
        let selector = Selector::new(&embedder, &index);
        let err = selector
            .select("cat", &Strategy::MultiVariant { variants: 2 }, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::MissingCapability(_)));
    }

    #[tokio::test]
    async fn test_multi_variant_is_subset_of_union() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(
            &embedder,
            &["cat", "dog", "car", "kitten and puppy", "engine oil"],
        )
        .await;
        let variants = vec!["feline", "vehicle", "canine"];
        let expander = FixedExpander(variants.clone());
        let selector = Selector::new(&embedder, &index).with_expander(&expander);

        let k = 3;
        let merged = selector
            .select("pets and cars", &Strategy::MultiVariant { variants: 3 }, k)
            .await
            .unwrap();
        assert!(merged.len() <= k as usize);

        let mut union: HashSet<String> = HashSet::new();
        for v in &variants {
            for r in selector.select(v, &Strategy::Similarity, k).await.unwrap() {
                union.insert(r.id);
            }
        }
        for r in &merged {
            assert!(union.contains(&r.id), "{} not in union", r.text);
        }
        let ids: HashSet<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), merged.len());
        assert_eq!(texts(&merged), vec!["cat", "kitten and puppy", "dog"]);
    }

    #[tokio::test]
    async fn test_multi_variant_falls_back_to_original_query() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["dog", "cat"]).await;
        let expander = FixedExpander(vec![]);
        let selector = Selector::new(&embedder, &index).with_expander(&expander);
        let results = selector
            .select("kitten", &Strategy::MultiVariant { variants: 3 }, 1)
            .await
            .unwrap();
        assert_eq!(texts(&results), vec!["cat"]);
    }

    #[tokio::test]
    async fn test_multi_variant_include_original_runs_first() {
        let embedder = AxisEmbedder::animals();
        let index = animal_index(&embedder, &["dog", "cat", "car"]).await;
        let expander = FixedExpander(vec!["vehicle"]);
        let strategy = Strategy::MultiVariant { variants: 1 };

        let without = Selector::new(&embedder, &index).with_expander(&expander);
        let results = without.select("kitten", &strategy, 2).await.unwrap();
        assert_eq!(results[0].text, "car");

        let with = Selector::new(&embedder, &index)
            .with_expander(&expander)
            .with_params(SelectParams {
                fetch_k: 20,
                include_original: true,
            });
        let results = with.select("kitten", &strategy, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "cat");
    }

    #[test]
    fn test_mmr_lambda_one_is_relevance_order() {
        let q: [f32; 2] = [1.0, 0.0];
        let a: [f32; 2] = [0.9, 0.1];
        let b: [f32; 2] = [1.0, 0.0];
        let c: [f32; 2] = [0.0, 1.0];
        let picks = maximal_marginal_relevance(&q, &[&a, &b, &c], 1.0, 3);
        assert_eq!(picks, vec![1, 0, 2]);
    }

    #[test]
    fn test_mmr_lambda_zero_picks_least_redundant() {
        let q: [f32; 2] = [1.0, 0.0];
        let a: [f32; 2] = [1.0, 0.0];
        let b: [f32; 2] = [0.99, 0.1];
        let c: [f32; 2] = [0.0, 1.0];
        let picks = maximal_marginal_relevance(&q, &[&a, &b, &c], 0.0, 2);
        assert_eq!(picks, vec![0, 2]);
    }

    #[test]
    fn test_mmr_edge_cases() {
        let q: [f32; 1] = [1.0];
        let only: &[f32] = &q;
        assert!(maximal_marginal_relevance(&q, &[], 0.5, 3).is_empty());
        assert!(maximal_marginal_relevance(&q, &[only], 0.5, 0).is_empty());
        assert_eq!(maximal_marginal_relevance(&q, &[only], 0.5, 5), vec![0]);
    }
}
