use crate::{
    error::{ErrorOrigin, InternalError, ProcessingException},
    result::{DataSchema, ExecutionStats, IntermediateResult},
    serialize::{deserialize, serialize},
    value::{Row, Value},
};
use roaring::RoaringBitmap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
use std::collections::BTreeMap;

///
/// NullBitmap
///
/// Rows of one data-table column whose cell is logically null. Encoded on
/// the wire as a byte string in the portable roaring format.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NullBitmap(RoaringBitmap);

impl NullBitmap {
    #[must_use]
    pub const fn new(bitmap: RoaringBitmap) -> Self {
        Self(bitmap)
    }

    #[must_use]
    pub fn contains(&self, row: u32) -> bool {
        self.0.contains(row)
    }

    pub fn insert(&mut self, row: u32) {
        self.0.insert(row);
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub const fn as_bitmap(&self) -> &RoaringBitmap {
        &self.0
    }
}

impl Serialize for NullBitmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut bytes = Vec::with_capacity(self.0.serialized_size());
        self.0
            .serialize_into(&mut bytes)
            .map_err(ser::Error::custom)?;

        serde_bytes::Bytes::new(&bytes).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NullBitmap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
        let bitmap = RoaringBitmap::deserialize_from(bytes.as_slice()).map_err(de::Error::custom)?;

        Ok(Self(bitmap))
    }
}

///
/// MetadataKey
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetadataKey {
    NumDocsScanned,
    NumEntriesScannedInFilter,
    NumEntriesScannedPostFilter,
    TotalDocs,
    NumSegmentsProcessed,
    NumSegmentsMatched,
    NumResizes,
    ResizeTimeMs,
    NumGroupsLimitReached,
}

impl MetadataKey {
    pub const ALL: [Self; 9] = [
        Self::NumDocsScanned,
        Self::NumEntriesScannedInFilter,
        Self::NumEntriesScannedPostFilter,
        Self::TotalDocs,
        Self::NumSegmentsProcessed,
        Self::NumSegmentsMatched,
        Self::NumResizes,
        Self::ResizeTimeMs,
        Self::NumGroupsLimitReached,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NumDocsScanned => "numDocsScanned",
            Self::NumEntriesScannedInFilter => "numEntriesScannedInFilter",
            Self::NumEntriesScannedPostFilter => "numEntriesScannedPostFilter",
            Self::TotalDocs => "totalDocs",
            Self::NumSegmentsProcessed => "numSegmentsProcessed",
            Self::NumSegmentsMatched => "numSegmentsMatched",
            Self::NumResizes => "numResizes",
            Self::ResizeTimeMs => "resizeTimeMs",
            Self::NumGroupsLimitReached => "numGroupsLimitReached",
        }
    }

    const fn read(self, stats: &ExecutionStats) -> u64 {
        match self {
            Self::NumDocsScanned => stats.num_docs_scanned,
            Self::NumEntriesScannedInFilter => stats.num_entries_scanned_in_filter,
            Self::NumEntriesScannedPostFilter => stats.num_entries_scanned_post_filter,
            Self::TotalDocs => stats.total_docs,
            Self::NumSegmentsProcessed => stats.num_segments_processed,
            Self::NumSegmentsMatched => stats.num_segments_matched,
            Self::NumResizes => stats.num_resizes,
            Self::ResizeTimeMs => stats.resize_time_ms,
            Self::NumGroupsLimitReached => stats.num_groups_limit_reached as u64,
        }
    }

    const fn write(self, stats: &mut ExecutionStats, value: u64) {
        match self {
            Self::NumDocsScanned => stats.num_docs_scanned = value,
            Self::NumEntriesScannedInFilter => stats.num_entries_scanned_in_filter = value,
            Self::NumEntriesScannedPostFilter => stats.num_entries_scanned_post_filter = value,
            Self::TotalDocs => stats.total_docs = value,
            Self::NumSegmentsProcessed => stats.num_segments_processed = value,
            Self::NumSegmentsMatched => stats.num_segments_matched = value,
            Self::NumResizes => stats.num_resizes = value,
            Self::ResizeTimeMs => stats.resize_time_ms = value,
            Self::NumGroupsLimitReached => stats.num_groups_limit_reached = value != 0,
        }
    }
}

///
/// DataTable
///
/// Columnar wire form of one partial result. Null cells are stored as the
/// column's placeholder value and recorded in that column's null bitmap;
/// reading a row back restores them to `Value::Null`.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DataTable {
    schema: DataSchema,
    rows: Vec<Row>,
    null_bitmaps: Vec<NullBitmap>,
    metadata: BTreeMap<String, String>,
    exceptions: Vec<ProcessingException>,
}

impl DataTable {
    /// Materialize rows, substituting placeholders for nulls.
    pub fn from_rows(schema: DataSchema, rows: Vec<Row>) -> Result<Self, InternalError> {
        let width = schema.len();
        let mut null_bitmaps = vec![NullBitmap::default(); width];
        let mut stored = Vec::with_capacity(rows.len());

        for (index, mut row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(InternalError::internal_state(
                    ErrorOrigin::Merge,
                    format!("row {index} has {} cells, schema has {width}", row.len()),
                ));
            }
            let row_id = u32::try_from(index).map_err(|_| {
                InternalError::internal_state(ErrorOrigin::Merge, "data table row count overflow")
            })?;

            for ((cell, column), bitmap) in row
                .iter_mut()
                .zip(schema.columns())
                .zip(null_bitmaps.iter_mut())
            {
                if cell.is_null() {
                    *cell = column.data_type.null_placeholder(column.field_kind);
                    bitmap.insert(row_id);
                }
            }
            stored.push(row);
        }

        Ok(Self {
            schema,
            rows: stored,
            null_bitmaps,
            metadata: BTreeMap::new(),
            exceptions: Vec::new(),
        })
    }

    pub fn from_intermediate(result: IntermediateResult) -> Result<Self, InternalError> {
        let (schema, rows, stats, exceptions) = result.into_parts();
        let mut table = Self::from_rows(schema, rows.into_rows())?;
        table.set_stats(&stats);
        table.exceptions = exceptions;

        Ok(table)
    }

    #[must_use]
    pub const fn schema(&self) -> &DataSchema {
        &self.schema
    }

    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn null_bitmap(&self, column: usize) -> Option<&NullBitmap> {
        self.null_bitmaps.get(column)
    }

    /// Stored row with placeholders in place of nulls.
    #[must_use]
    pub fn raw_row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Row with nulls restored.
    #[must_use]
    pub fn extract_row(&self, index: usize) -> Option<Row> {
        let mut row = self.rows.get(index)?.clone();
        let row_id = u32::try_from(index).ok()?;
        for (cell, bitmap) in row.iter_mut().zip(&self.null_bitmaps) {
            if bitmap.contains(row_id) {
                *cell = Value::Null;
            }
        }

        Some(row)
    }

    pub fn extract_rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.rows.len()).filter_map(|index| self.extract_row(index))
    }

    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    #[must_use]
    pub fn exceptions(&self) -> &[ProcessingException] {
        &self.exceptions
    }

    pub fn add_exception(&mut self, exception: ProcessingException) {
        self.exceptions.push(exception);
    }

    pub fn set_stats(&mut self, stats: &ExecutionStats) {
        for key in MetadataKey::ALL {
            self.metadata
                .insert(key.name().to_string(), key.read(stats).to_string());
        }
    }

    /// Stats recorded in metadata; missing or malformed entries read as zero.
    #[must_use]
    pub fn stats(&self) -> ExecutionStats {
        let mut stats = ExecutionStats::default();
        for key in MetadataKey::ALL {
            let value = self
                .metadata
                .get(key.name())
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_default();
            key.write(&mut stats, value);
        }

        stats
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, InternalError> {
        Ok(serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InternalError> {
        Ok(deserialize(bytes)?)
    }
}
