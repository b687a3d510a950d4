//! Module: block
//! Responsibility: columnar block shapes and the storage-facing source traits.
//! Does not own: segment storage, dictionaries or filter evaluation.
//! Boundary: operators only see [`ValueBlock`]s pulled from a [`BlockSource`].

mod fetcher;
mod memory;

#[cfg(test)]
mod tests;

use crate::{
    error::{ErrorOrigin, InternalError},
    value::{ByteArray, ColumnDataType, FieldKind},
};
use quarry_primitives::StoredType;
use roaring::RoaringBitmap;
use rust_decimal::Decimal;
use std::{borrow::Cow, ops::Range};

// re-exports
pub use fetcher::RowFetcher;
pub use memory::{MemoryBlockSource, MemorySegment};

/// Default number of documents per block.
pub const DEFAULT_BLOCK_SIZE: usize = 10_000;

/// Position of a document inside its block as stored in null bitmaps.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn bitmap_position(index: usize) -> u32 {
    index as u32
}

macro_rules! with_column_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            ColumnValues::Int($v) => $body,
            ColumnValues::Long($v) => $body,
            ColumnValues::Float($v) => $body,
            ColumnValues::Double($v) => $body,
            ColumnValues::BigDecimal($v) => $body,
            ColumnValues::String($v) => $body,
            ColumnValues::Bytes($v) => $body,
            ColumnValues::IntMv($v) => $body,
            ColumnValues::LongMv($v) => $body,
            ColumnValues::FloatMv($v) => $body,
            ColumnValues::DoubleMv($v) => $body,
            ColumnValues::BigDecimalMv($v) => $body,
            ColumnValues::StringMv($v) => $body,
            ColumnValues::BytesMv($v) => $body,
        }
    };
}

macro_rules! map_column_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            ColumnValues::Int($v) => ColumnValues::Int($body),
            ColumnValues::Long($v) => ColumnValues::Long($body),
            ColumnValues::Float($v) => ColumnValues::Float($body),
            ColumnValues::Double($v) => ColumnValues::Double($body),
            ColumnValues::BigDecimal($v) => ColumnValues::BigDecimal($body),
            ColumnValues::String($v) => ColumnValues::String($body),
            ColumnValues::Bytes($v) => ColumnValues::Bytes($body),
            ColumnValues::IntMv($v) => ColumnValues::IntMv($body),
            ColumnValues::LongMv($v) => ColumnValues::LongMv($body),
            ColumnValues::FloatMv($v) => ColumnValues::FloatMv($body),
            ColumnValues::DoubleMv($v) => ColumnValues::DoubleMv($body),
            ColumnValues::BigDecimalMv($v) => ColumnValues::BigDecimalMv($body),
            ColumnValues::StringMv($v) => ColumnValues::StringMv($body),
            ColumnValues::BytesMv($v) => ColumnValues::BytesMv($body),
        }
    };
}

///
/// ColumnValues
///
/// Typed value array for one column of one block. Multi-value variants hold
/// one array per document.
///

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValues {
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    BigDecimal(Vec<Decimal>),
    String(Vec<String>),
    Bytes(Vec<ByteArray>),
    IntMv(Vec<Vec<i32>>),
    LongMv(Vec<Vec<i64>>),
    FloatMv(Vec<Vec<f32>>),
    DoubleMv(Vec<Vec<f64>>),
    BigDecimalMv(Vec<Vec<Decimal>>),
    StringMv(Vec<Vec<String>>),
    BytesMv(Vec<Vec<ByteArray>>),
}

impl ColumnValues {
    #[must_use]
    pub const fn stored_type(&self) -> StoredType {
        match self {
            Self::Int(_) | Self::IntMv(_) => StoredType::Int,
            Self::Long(_) | Self::LongMv(_) => StoredType::Long,
            Self::Float(_) | Self::FloatMv(_) => StoredType::Float,
            Self::Double(_) | Self::DoubleMv(_) => StoredType::Double,
            Self::BigDecimal(_) | Self::BigDecimalMv(_) => StoredType::BigDecimal,
            Self::String(_) | Self::StringMv(_) => StoredType::String,
            Self::Bytes(_) | Self::BytesMv(_) => StoredType::Bytes,
        }
    }

    #[must_use]
    pub const fn is_single_value(&self) -> bool {
        matches!(
            self,
            Self::Int(_)
                | Self::Long(_)
                | Self::Float(_)
                | Self::Double(_)
                | Self::BigDecimal(_)
                | Self::String(_)
                | Self::Bytes(_)
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        with_column_values!(self, v => v.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the documents in `range`.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Self {
        map_column_values!(self, v => v[range.clone()].to_vec())
    }

    /// Copy of the documents at `positions`, in the given order.
    #[must_use]
    pub fn take(&self, positions: &[usize]) -> Self {
        map_column_values!(self, v => positions.iter().map(|&p| v[p].clone()).collect())
    }
}

///
/// NumericSlice
///
/// Borrowed single-value numeric column, the closed input set of the
/// numeric aggregation kernels.
///

#[derive(Clone, Copy, Debug)]
pub enum NumericSlice<'a> {
    Int(&'a [i32]),
    Long(&'a [i64]),
    Float(&'a [f32]),
    Double(&'a [f64]),
    BigDecimal(&'a [Decimal]),
}

impl NumericSlice<'_> {
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::BigDecimal(v) => v.len(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

///
/// BlockValSet
///
/// One projected column of one block plus its optional null bitmap.
/// Bitmap positions are block-relative and reset every block.
///

#[derive(Clone, Debug, PartialEq)]
pub struct BlockValSet {
    values: ColumnValues,
    null_bitmap: Option<RoaringBitmap>,
}

impl BlockValSet {
    #[must_use]
    pub const fn new(values: ColumnValues) -> Self {
        Self {
            values,
            null_bitmap: None,
        }
    }

    #[must_use]
    pub fn with_null_bitmap(mut self, null_bitmap: RoaringBitmap) -> Self {
        self.null_bitmap = Some(null_bitmap);
        self
    }

    /// Drop the null bitmap; used when null handling is disabled.
    #[must_use]
    pub fn without_null_bitmap(mut self) -> Self {
        self.null_bitmap = None;
        self
    }

    #[must_use]
    pub const fn values(&self) -> &ColumnValues {
        &self.values
    }

    #[must_use]
    pub const fn stored_type(&self) -> StoredType {
        self.values.stored_type()
    }

    #[must_use]
    pub const fn is_single_value(&self) -> bool {
        self.values.is_single_value()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub const fn null_bitmap(&self) -> Option<&RoaringBitmap> {
        self.null_bitmap.as_ref()
    }

    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.null_bitmap
            .as_ref()
            .is_some_and(|bitmap| bitmap.contains(bitmap_position(index)))
    }

    /// Number of null positions in this block.
    #[must_use]
    pub fn null_count(&self) -> u64 {
        self.null_bitmap.as_ref().map_or(0, RoaringBitmap::len)
    }

    /// True when every one of the first `length` positions is null.
    #[must_use]
    pub fn all_null(&self, length: usize) -> bool {
        length > 0 && self.null_count() >= length as u64
    }

    /// Borrow the column as a numeric slice.
    pub fn numeric_sv(&self) -> Result<NumericSlice<'_>, InternalError> {
        match &self.values {
            ColumnValues::Int(v) => Ok(NumericSlice::Int(v)),
            ColumnValues::Long(v) => Ok(NumericSlice::Long(v)),
            ColumnValues::Float(v) => Ok(NumericSlice::Float(v)),
            ColumnValues::Double(v) => Ok(NumericSlice::Double(v)),
            ColumnValues::BigDecimal(v) => Ok(NumericSlice::BigDecimal(v)),
            other => Err(InternalError::unsupported_type(
                ErrorOrigin::Aggregate,
                "numeric aggregation",
                other.stored_type(),
                other.is_single_value(),
            )),
        }
    }

    /// Column values widened to doubles; borrowed when already double.
    #[allow(clippy::cast_precision_loss)]
    pub fn double_values_sv(&self) -> Result<Cow<'_, [f64]>, InternalError> {
        let values = match self.numeric_sv()? {
            NumericSlice::Double(v) => return Ok(Cow::Borrowed(v)),
            NumericSlice::Int(v) => v.iter().map(|&x| f64::from(x)).collect(),
            NumericSlice::Long(v) => v.iter().map(|&x| x as f64).collect(),
            NumericSlice::Float(v) => v.iter().map(|&x| f64::from(x)).collect(),
            NumericSlice::BigDecimal(v) => v
                .iter()
                .map(|&x| crate::value::decimal::decimal_to_f64(x))
                .collect(),
        };

        Ok(Cow::Owned(values))
    }

    /// Copy of the documents in `range`, with the bitmap rebased.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Self {
        let null_bitmap = self.null_bitmap.as_ref().map(|bitmap| {
            let start = bitmap_position(range.start);
            let end = bitmap_position(range.end);
            bitmap
                .iter()
                .filter(|&pos| pos >= start && pos < end)
                .map(|pos| pos - start)
                .collect()
        });

        Self {
            values: self.values.slice(range),
            null_bitmap,
        }
    }

    /// Copy of the documents at `positions`, with the bitmap remapped.
    #[must_use]
    pub fn take(&self, positions: &[usize]) -> Self {
        let null_bitmap = self.null_bitmap.as_ref().map(|bitmap| {
            positions
                .iter()
                .enumerate()
                .filter(|&(_, &p)| bitmap.contains(bitmap_position(p)))
                .map(|(i, _)| bitmap_position(i))
                .collect()
        });

        Self {
            values: self.values.take(positions),
            null_bitmap,
        }
    }
}

///
/// ValueBlock
///
/// One batch of documents: segment doc ids plus one value set per requested
/// expression, in request order.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ValueBlock {
    doc_ids: Vec<u32>,
    columns: Vec<BlockValSet>,
}

impl ValueBlock {
    #[must_use]
    pub const fn new(doc_ids: Vec<u32>, columns: Vec<BlockValSet>) -> Self {
        Self { doc_ids, columns }
    }

    #[must_use]
    pub const fn num_docs(&self) -> usize {
        self.doc_ids.len()
    }

    #[must_use]
    pub fn doc_ids(&self) -> &[u32] {
        &self.doc_ids
    }

    #[must_use]
    pub fn columns(&self) -> &[BlockValSet] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Result<&BlockValSet, InternalError> {
        self.columns.get(index).ok_or_else(|| {
            InternalError::internal_state(
                ErrorOrigin::Fetch,
                format!(
                    "block has {} columns, requested column {index}",
                    self.columns.len()
                ),
            )
        })
    }
}

///
/// ColumnMetadata
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub stored_type: StoredType,
    pub single_value: bool,
    pub field_kind: FieldKind,
}

impl ColumnMetadata {
    pub fn new(
        name: impl Into<String>,
        stored_type: StoredType,
        single_value: bool,
        field_kind: FieldKind,
    ) -> Self {
        Self {
            name: name.into(),
            stored_type,
            single_value,
            field_kind,
        }
    }

    /// Result column type for this column.
    pub fn data_type(&self) -> Result<ColumnDataType, InternalError> {
        ColumnDataType::from_stored(self.stored_type, self.single_value).ok_or_else(|| {
            InternalError::unsupported_type(
                ErrorOrigin::Fetch,
                "result column",
                self.stored_type,
                self.single_value,
            )
        })
    }
}

///
/// BlockSource
///
/// Pull-based block iterator produced by the storage collaborator for one
/// set of expressions.
///

pub trait BlockSource {
    /// Next block, `None` once the input is exhausted.
    fn next_block(&mut self) -> Result<Option<ValueBlock>, InternalError>;

    /// Distinct physical columns read per document.
    fn num_columns_projected(&self) -> usize;

    /// Entries the upstream filter stage scanned.
    fn num_entries_scanned_in_filter(&self) -> u64;
}

///
/// SegmentSource
///
/// Storage collaborator for one segment. Null bitmaps are attached to
/// blocks only when `null_handling` is requested.
///

pub trait SegmentSource {
    fn name(&self) -> &str;

    fn total_docs(&self) -> u64;

    /// Physical column names, in schema order.
    fn column_names(&self) -> Vec<String>;

    fn column_metadata(&self, column: &str) -> Result<ColumnMetadata, InternalError>;

    /// Whether the documents are stored in ascending order of `column`.
    fn is_sorted_on(&self, column: &str) -> bool;

    /// Scan every matching document for `expressions`.
    fn open(
        &self,
        expressions: &[String],
        null_handling: bool,
    ) -> Result<Box<dyn BlockSource + '_>, InternalError>;

    /// Scan exactly `doc_ids`, in ascending order, for `expressions`.
    fn open_docs(
        &self,
        expressions: &[String],
        doc_ids: &RoaringBitmap,
        null_handling: bool,
    ) -> Result<Box<dyn BlockSource + '_>, InternalError>;
}

///
/// GroupKeys
///
/// Group key per document position. Multi-value grouping lets one document
/// contribute to several groups.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GroupKeys {
    SingleValue(Vec<u32>),
    MultiValue(Vec<Vec<u32>>),
}

impl GroupKeys {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::SingleValue(keys) => keys.len(),
            Self::MultiValue(keys) => keys.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
