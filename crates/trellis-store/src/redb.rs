//! ReDB vector store backend

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::{StorageError, StorageResult};
use crate::memory::check_dimensions;
use crate::point::{Point, PointFilter, ScoredPoint, ScrollPage};
use crate::traits::{paginate, rank, VectorStore};

/// Point id to JSON-encoded [`Point`]
const POINTS: TableDefinition<&str, &[u8]> = TableDefinition::new("points");

/// ReDB-backed vector store
///
/// One table, keyed by point id, so scrolls come out in id order. Search
/// is a scan; graphs indexed from one codebase stay small enough for that.
pub struct RedbVectorStore {
    db: Mutex<Database>,
    dimensions: Option<usize>,
}

impl RedbVectorStore {
    /// Open or create a ReDB database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path).map_err(|e| StorageError::Database(e.to_string()))?;

        {
            let write_txn = db.begin_write()?;
            {
                write_txn.open_table(POINTS)?;
            }
            write_txn.commit()?;
        }

        Ok(Self {
            db: Mutex::new(db),
            dimensions: None,
        })
    }

    /// Reject points whose vectors are not `dimensions` long
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))
    }

    /// Decode every stored point accepted by `filter`, from `start` on
    fn collect_matching(
        &self,
        filter: &PointFilter,
        start: &str,
        take: usize,
    ) -> StorageResult<Vec<Point>> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(POINTS)?;

        let mut points = Vec::new();
        for entry in table.range(start..)? {
            let (_, value) = entry?;
            let point: Point = serde_json::from_slice(value.value())?;
            if filter.matches(&point) {
                points.push(point);
                if points.len() >= take {
                    break;
                }
            }
        }
        Ok(points)
    }
}

#[async_trait]
impl VectorStore for RedbVectorStore {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn upsert(&self, points: Vec<Point>) -> StorageResult<()> {
        check_dimensions(self.dimensions, &points)?;

        let db = self.lock()?;
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(POINTS)?;
            for point in &points {
                let value = serde_json::to_vec(point)?;
                table.insert(point.id.as_str(), value.as_slice())?;
            }
        }
        write_txn.commit()?;
        tracing::debug!("Upserted {} points in single transaction", points.len());

        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<Point>> {
        let db = self.lock()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(POINTS)?;

        if let Some(value) = table.get(id)? {
            let point: Point = serde_json::from_slice(value.value())?;
            Ok(Some(point))
        } else {
            Ok(None)
        }
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> StorageResult<Vec<ScoredPoint>> {
        let candidates = self.collect_matching(filter, "", usize::MAX)?;
        Ok(rank(candidates.iter(), vector, limit))
    }

    async fn scroll(
        &self,
        filter: &PointFilter,
        offset: Option<&str>,
        limit: usize,
    ) -> StorageResult<ScrollPage> {
        let matching = self.collect_matching(filter, offset.unwrap_or(""), limit.max(1) + 1)?;
        Ok(paginate(matching, limit))
    }

    async fn delete(&self, filter: &PointFilter) -> StorageResult<usize> {
        let doomed: Vec<String> = self
            .collect_matching(filter, "", usize::MAX)?
            .into_iter()
            .map(|p| p.id)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let db = self.lock()?;
        let write_txn = db.begin_write()?;
        let mut removed = 0;
        {
            let mut table = write_txn.open_table(POINTS)?;
            for id in &doomed {
                if table.remove(id.as_str())?.is_some() {
                    removed += 1;
                }
            }
        }
        write_txn.commit()?;
        tracing::debug!("Deleted {} points", removed);

        Ok(removed)
    }

    async fn count(&self, filter: &PointFilter) -> StorageResult<usize> {
        if *filter == PointFilter::all() {
            let db = self.lock()?;
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(POINTS)?;
            return Ok(table.len()? as usize);
        }
        Ok(self.collect_matching(filter, "", usize::MAX)?.len())
    }
}
