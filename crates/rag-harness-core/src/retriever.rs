//! Retriever abstraction: anything that turns a query into records.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Record, Strategy};
use crate::select::Selector;

/// A query-to-records capability.
///
/// Implemented by [`VectorStoreRetriever`] here and by remote retrievers
/// (e.g. Wikipedia) in the app crate.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Record>>;
}

/// A [`Selector`] with its strategy and result bound fixed.
pub struct VectorStoreRetriever<'a> {
    selector: Selector<'a>,
    strategy: Strategy,
    k: i64,
}

impl<'a> VectorStoreRetriever<'a> {
    pub fn new(selector: Selector<'a>, strategy: Strategy, k: i64) -> Self {
        Self {
            selector,
            strategy,
            k,
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }
}

#[async_trait]
impl Retriever for VectorStoreRetriever<'_> {
    async fn retrieve(&self, query: &str) -> Result<Vec<Record>> {
        self.selector.select(query, &self.strategy, self.k).await
    }
}
