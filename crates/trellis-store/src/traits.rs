//! Vector store trait definitions

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::StorageResult;
use crate::point::{Point, PointFilter, ScoredPoint, ScrollPage};

/// Default page size for scrolls
pub const DEFAULT_SCROLL_LIMIT: usize = 256;

/// Trait for vector store implementations
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist
    async fn initialize(&self) -> StorageResult<()>;

    /// Insert or replace points by id
    async fn upsert(&self, points: Vec<Point>) -> StorageResult<()>;

    async fn get(&self, id: &str) -> StorageResult<Option<Point>>;

    /// Points most similar to `vector`, best first, ties broken by id
    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> StorageResult<Vec<ScoredPoint>>;

    /// Matching points in id order, starting at `offset` (inclusive)
    async fn scroll(
        &self,
        filter: &PointFilter,
        offset: Option<&str>,
        limit: usize,
    ) -> StorageResult<ScrollPage>;

    /// Delete matching points, returning how many were removed
    async fn delete(&self, filter: &PointFilter) -> StorageResult<usize>;

    async fn count(&self, filter: &PointFilter) -> StorageResult<usize>;

    /// Every matching point, following scroll pages to the end
    async fn scroll_all(&self, filter: &PointFilter) -> StorageResult<Vec<Point>> {
        let mut points = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let page = self
                .scroll(filter, offset.as_deref(), DEFAULT_SCROLL_LIMIT)
                .await?;
            points.extend(page.points);
            match page.next_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(points)
    }
}

/// Score candidates against `vector` and keep the best `limit`
pub(crate) fn rank<'a>(
    candidates: impl Iterator<Item = &'a Point>,
    vector: &[f32],
    limit: usize,
) -> Vec<ScoredPoint> {
    let mut scored: Vec<ScoredPoint> = candidates
        .map(|point| ScoredPoint {
            score: cosine_similarity(vector, &point.vector),
            point: point.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.point.id.cmp(&b.point.id))
    });
    scored.truncate(limit);
    scored
}

/// Cut an id-ordered run of matching points into a page
pub(crate) fn paginate(mut matching: Vec<Point>, limit: usize) -> ScrollPage {
    let limit = limit.max(1);
    let next_offset = if matching.len() > limit {
        Some(matching[limit].id.clone())
    } else {
        None
    };
    matching.truncate(limit);
    ScrollPage {
        points: matching,
        next_offset,
    }
}
