//! LanceDB-backed vector store over a pre-built NSS table.

use super::{cosine_similarity, VectorStore};
use crate::types::{Chunk, CorpusStats, FilterSet};
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, Int16Array, Int32Array, Int64Array,
    LargeStringArray, RecordBatch, StringArray, UInt32Array,
};
use arrow_schema::{DataType, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use nss_core::{AppError, AppResult};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, instrument, warn};

const STRING_COLUMNS: &[&str] = &["text", "country", "doc_name"];
const INT_COLUMNS: &[&str] = &["year", "page"];
const EMBEDDING_COLUMN: &str = "embedding";
const UNKNOWN_COUNTRY: &str = "Unknown";

/// Read-only view of the document table.
pub struct LanceDbStore {
    table: Table,
    table_name: String,
    embedding_dim: usize,
}

impl std::fmt::Debug for LanceDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanceDbStore")
            .field("table_name", &self.table_name)
            .field("embedding_dim", &self.embedding_dim)
            .finish_non_exhaustive()
    }
}

impl LanceDbStore {
    /// Open an existing table and check its columns.
    ///
    /// # Arguments
    /// * `db_path` - Directory of the LanceDB database
    /// * `table_name` - Name of the document table (typically "nss_documents")
    /// * `embedding_dim` - Expected length of the `embedding` vectors
    pub async fn open(db_path: &Path, table_name: &str, embedding_dim: usize) -> AppResult<Self> {
        if !db_path.exists() {
            return Err(AppError::Store(format!(
                "Vector store not found at {}",
                db_path.display()
            )));
        }

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to list tables: {}", e)))?;

        if !table_names.iter().any(|name| name == table_name) {
            return Err(AppError::Store(format!(
                "Table '{}' not found in {}",
                table_name,
                db_path.display()
            )));
        }

        let table = conn
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| AppError::Store(format!("Failed to read table schema: {}", e)))?;
        validate_schema(&schema, embedding_dim)?;

        debug!("Opened LanceDB table '{}' at {:?}", table_name, db_path);

        Ok(Self {
            table,
            table_name: table_name.to_string(),
            embedding_dim,
        })
    }

    async fn count(&self, predicate: Option<String>) -> AppResult<usize> {
        self.table
            .count_rows(predicate)
            .await
            .map_err(|e| AppError::Store(format!("Failed to count rows: {}", e)))
    }

    /// Read `columns` of every row matching `predicate`.
    async fn scan(&self, columns: &[&str], predicate: Option<String>) -> AppResult<Vec<RecordBatch>> {
        // Plain queries carry a default row limit, so pass the exact count
        let rows = self.count(predicate.clone()).await?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let mut query = self
            .table
            .query()
            .select(Select::columns(columns))
            .limit(rows);
        if let Some(predicate) = predicate {
            query = query.only_if(predicate);
        }

        query
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to execute scan: {}", e)))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| AppError::Store(format!("Failed to collect scan results: {}", e)))
    }
}

#[async_trait::async_trait]
impl VectorStore for LanceDbStore {
    fn name(&self) -> &str {
        "lancedb"
    }

    #[instrument(skip(self, embedding), fields(table = %self.table_name))]
    async fn search(
        &self,
        embedding: &[f32],
        filters: &FilterSet,
        limit: usize,
    ) -> AppResult<Vec<Chunk>> {
        if embedding.len() != self.embedding_dim {
            return Err(AppError::Store(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.embedding_dim,
                embedding.len()
            )));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut query = self
            .table
            .query()
            .nearest_to(embedding.to_vec())
            .map_err(|e| AppError::Store(format!("Failed to create query: {}", e)))?
            .column(EMBEDDING_COLUMN)
            .distance_type(DistanceType::Cosine)
            .limit(limit);
        if let Some(predicate) = filter_predicate(filters) {
            debug!("Search predicate: {}", predicate);
            query = query.only_if(predicate);
        }

        let mut stream = query
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to execute search: {}", e)))?;

        let mut chunks = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| AppError::Store(format!("Failed to read search results: {}", e)))?
        {
            chunks.extend(batch_to_chunks(&batch, embedding)?);
        }

        chunks.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        debug!("Retrieved {} chunks (requested {})", chunks.len(), limit);
        Ok(chunks)
    }

    async fn latest_year(&self, country: Option<&str>) -> AppResult<Option<i32>> {
        let predicate = country.map(|c| format!("country = '{}'", escape_literal(c)));
        let batches = self.scan(&["year"], predicate).await?;

        let mut latest = None;
        for batch in &batches {
            let years = required_column(batch, "year")?;
            for row in 0..batch.num_rows() {
                if let Some(year) = int_at(years, row) {
                    latest = latest.max(Some(year));
                }
            }
        }
        Ok(latest)
    }

    async fn stats(&self) -> AppResult<CorpusStats> {
        let total = self.count(None).await?;
        let batches = self.scan(&["country", "year"], None).await?;

        let mut index: BTreeMap<String, BTreeSet<i32>> = BTreeMap::new();
        for batch in &batches {
            let countries = required_column(batch, "country")?;
            let years = required_column(batch, "year")?;
            for row in 0..batch.num_rows() {
                let country =
                    string_at(countries, row).unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());
                let entry = index.entry(country).or_default();
                if let Some(year) = int_at(years, row) {
                    entry.insert(year);
                }
            }
        }

        Ok(CorpusStats::from_country_years(total, index))
    }
}

/// SQL predicate for `filters`, or `None` when nothing is constrained.
pub fn filter_predicate(filters: &FilterSet) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(ref country) = filters.country {
        clauses.push(format!("country = '{}'", escape_literal(country)));
    }
    if let Some(min) = filters.year_min {
        clauses.push(format!("year >= {}", min));
    }
    if let Some(max) = filters.year_max {
        clauses.push(format!("year <= {}", max));
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn validate_schema(schema: &Schema, embedding_dim: usize) -> AppResult<()> {
    let field = |name: &str| {
        schema
            .field_with_name(name)
            .map_err(|_| AppError::Store(format!("Table is missing column '{}'", name)))
    };

    for &name in STRING_COLUMNS {
        if !matches!(field(name)?.data_type(), DataType::Utf8 | DataType::LargeUtf8) {
            return Err(AppError::Store(format!("Column '{}' must be a string", name)));
        }
    }

    for &name in INT_COLUMNS {
        if !field(name)?.data_type().is_integer() {
            return Err(AppError::Store(format!("Column '{}' must be an integer", name)));
        }
    }

    match field(EMBEDDING_COLUMN)?.data_type() {
        DataType::FixedSizeList(item, size)
            if item.data_type() == &DataType::Float32 && *size as usize == embedding_dim =>
        {
            Ok(())
        }
        DataType::FixedSizeList(_, size) => Err(AppError::Store(format!(
            "Embedding dimension mismatch: table has {}, configured {}",
            size, embedding_dim
        ))),
        other => Err(AppError::Store(format!(
            "Column 'embedding' must be a fixed-size float list, found {}",
            other
        ))),
    }
}

fn required_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| AppError::Store(format!("Result batch is missing column '{}'", name)))
}

fn string_at(column: &ArrayRef, row: usize) -> Option<String> {
    if column.is_null(row) {
        return None;
    }
    let any = column.as_any();
    if let Some(values) = any.downcast_ref::<StringArray>() {
        return Some(values.value(row).to_string());
    }
    any.downcast_ref::<LargeStringArray>()
        .map(|values| values.value(row).to_string())
}

fn int_at(column: &ArrayRef, row: usize) -> Option<i32> {
    if column.is_null(row) {
        return None;
    }
    let any = column.as_any();
    if let Some(values) = any.downcast_ref::<Int32Array>() {
        return Some(values.value(row));
    }
    if let Some(values) = any.downcast_ref::<Int64Array>() {
        return i32::try_from(values.value(row)).ok();
    }
    if let Some(values) = any.downcast_ref::<Int16Array>() {
        return Some(i32::from(values.value(row)));
    }
    any.downcast_ref::<UInt32Array>()
        .and_then(|values| i32::try_from(values.value(row)).ok())
}

fn embedding_at(column: &ArrayRef, row: usize) -> Option<Vec<f32>> {
    let list = column.as_any().downcast_ref::<FixedSizeListArray>()?;
    let values = list.value(row);
    let values = values.as_any().downcast_ref::<Float32Array>()?;
    Some(values.values().to_vec())
}

/// Convert search results to chunks, scoring by `1 - cosine distance`.
fn batch_to_chunks(batch: &RecordBatch, query: &[f32]) -> AppResult<Vec<Chunk>> {
    let texts = required_column(batch, "text")?;
    let countries = required_column(batch, "country")?;
    let years = required_column(batch, "year")?;
    let doc_names = required_column(batch, "doc_name")?;
    let pages = required_column(batch, "page")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());
    let embeddings = batch.column_by_name(EMBEDDING_COLUMN);

    let mut chunks = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let (Some(year), Some(page)) = (int_at(years, row), int_at(pages, row)) else {
            warn!("Skipping row {} with missing year or page", row);
            continue;
        };

        let similarity_score = match distances {
            Some(d) if !d.is_null(row) => 1.0 - d.value(row),
            _ => embeddings
                .and_then(|column| embedding_at(column, row))
                .map_or(0.0, |embedding| cosine_similarity(query, &embedding)),
        };

        chunks.push(Chunk {
            text: string_at(texts, row).unwrap_or_default(),
            country: string_at(countries, row).unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            year,
            doc_name: string_at(doc_names, row).unwrap_or_default(),
            page,
            similarity_score,
        });
    }

    Ok(chunks)
}
