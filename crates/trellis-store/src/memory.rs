//! In-memory vector store for testing

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::point::{Point, PointFilter, ScoredPoint, ScrollPage};
use crate::traits::{paginate, rank, VectorStore};

/// In-memory vector store
///
/// Useful for testing and temporary graphs. Points are kept in id order so
/// scrolls are stable.
pub struct MemoryVectorStore {
    dimensions: Option<usize>,
    points: RwLock<BTreeMap<String, Point>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self {
            dimensions: None,
            points: RwLock::new(BTreeMap::new()),
        }
    }

    /// Reject points whose vectors are not `dimensions` long
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn check_dimensions(expected: Option<usize>, points: &[Point]) -> StorageResult<()> {
    if let Some(expected) = expected {
        if let Some(bad) = points.iter().find(|p| p.vector.len() != expected) {
            return Err(StorageError::DimensionMismatch {
                expected,
                actual: bad.vector.len(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn upsert(&self, points: Vec<Point>) -> StorageResult<()> {
        check_dimensions(self.dimensions, &points)?;
        let mut stored = self.points.write().await;
        for point in points {
            stored.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<Point>> {
        Ok(self.points.read().await.get(id).cloned())
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> StorageResult<Vec<ScoredPoint>> {
        let stored = self.points.read().await;
        Ok(rank(
            stored.values().filter(|p| filter.matches(p)),
            vector,
            limit,
        ))
    }

    async fn scroll(
        &self,
        filter: &PointFilter,
        offset: Option<&str>,
        limit: usize,
    ) -> StorageResult<ScrollPage> {
        let stored = self.points.read().await;
        let start = offset.unwrap_or("").to_string();
        let matching = stored
            .range(start..)
            .map(|(_, p)| p)
            .filter(|p| filter.matches(p))
            .take(limit.max(1) + 1)
            .cloned()
            .collect();
        Ok(paginate(matching, limit))
    }

    async fn delete(&self, filter: &PointFilter) -> StorageResult<usize> {
        let mut stored = self.points.write().await;
        let before = stored.len();
        stored.retain(|_, p| !filter.matches(p));
        Ok(before - stored.len())
    }

    async fn count(&self, filter: &PointFilter) -> StorageResult<usize> {
        let stored = self.points.read().await;
        Ok(stored.values().filter(|p| filter.matches(p)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Payload;
    use trellis_core::{Entity, Relation};

    fn point(name: &str, vector: Vec<f32>) -> Point {
        Point::new(vector, Payload::Entity(Entity::new(name, "class")))
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryVectorStore::new();
        store.initialize().await.unwrap();

        store
            .upsert(vec![point("A", vec![1.0, 0.0]), point("B", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(store.count(&PointFilter::all()).await.unwrap(), 2);

        // Re-upsert replaces
        store.upsert(vec![point("A", vec![0.5, 0.5])]).await.unwrap();
        assert_eq!(store.count(&PointFilter::all()).await.unwrap(), 2);
        let a = store.get("entity:A").await.unwrap().unwrap();
        assert_eq!(a.vector, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_search_orders_by_score_then_id() {
        let store = MemoryVectorStore::new();
        store
            .upsert(vec![
                point("C", vec![1.0, 0.0]),
                point("A", vec![0.0, 1.0]),
                point("B", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], &PointFilter::all(), 2).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.point.id.as_str()).collect();
        assert_eq!(ids, vec!["entity:B", "entity:C"]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_scroll_pages() {
        let store = MemoryVectorStore::new();
        let points: Vec<_> = (0..5).map(|i| point(&format!("E{i}"), vec![1.0])).collect();
        store.upsert(points).await.unwrap();

        let first = store.scroll(&PointFilter::all(), None, 2).await.unwrap();
        assert_eq!(first.points.len(), 2);
        assert_eq!(first.next_offset.as_deref(), Some("entity:E2"));

        let all = store.scroll_all(&PointFilter::all()).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].id, "entity:E0");

        let last = store
            .scroll(&PointFilter::all(), Some("entity:E4"), 2)
            .await
            .unwrap();
        assert_eq!(last.points.len(), 1);
        assert!(last.next_offset.is_none());
    }

    #[tokio::test]
    async fn test_delete_by_filter() {
        let store = MemoryVectorStore::new();
        store
            .upsert(vec![
                point("A", vec![1.0]),
                Point::new(vec![1.0], Payload::Relation(Relation::new("A", "B", "calls"))),
                Point::new(vec![1.0], Payload::Relation(Relation::new("C", "D", "calls"))),
            ])
            .await
            .unwrap();

        let removed = store
            .delete(&PointFilter::relations().touching(vec!["A".into()]))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count(&PointFilter::relations()).await.unwrap(), 1);
        assert_eq!(store.count(&PointFilter::entities()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dimension_check() {
        let store = MemoryVectorStore::new().with_dimensions(2);
        let err = store.upsert(vec![point("A", vec![1.0])]).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }
}
