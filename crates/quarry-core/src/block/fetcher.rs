use crate::{
    block::{BlockValSet, ColumnValues, bitmap_position},
    error::{ErrorOrigin, InternalError},
    value::{ByteArray, Row, Value},
};
use roaring::RoaringBitmap;
use rust_decimal::Decimal;

///
/// ColumnFetcher
///
/// Per-column typed accessor. Only the supported stored-type and
/// single/multi-value combinations have a variant.
///

enum ColumnFetcher<'a> {
    Int(&'a [i32]),
    Long(&'a [i64]),
    Float(&'a [f32]),
    Double(&'a [f64]),
    BigDecimal(&'a [Decimal]),
    String(&'a [String]),
    Bytes(&'a [ByteArray]),
    IntMv(&'a [Vec<i32>]),
    LongMv(&'a [Vec<i64>]),
    FloatMv(&'a [Vec<f32>]),
    DoubleMv(&'a [Vec<f64>]),
    StringMv(&'a [Vec<String>]),
}

impl<'a> ColumnFetcher<'a> {
    fn new(values: &'a ColumnValues) -> Result<Self, InternalError> {
        let fetcher = match values {
            ColumnValues::Int(v) => Self::Int(v),
            ColumnValues::Long(v) => Self::Long(v),
            ColumnValues::Float(v) => Self::Float(v),
            ColumnValues::Double(v) => Self::Double(v),
            ColumnValues::BigDecimal(v) => Self::BigDecimal(v),
            ColumnValues::String(v) => Self::String(v),
            ColumnValues::Bytes(v) => Self::Bytes(v),
            ColumnValues::IntMv(v) => Self::IntMv(v),
            ColumnValues::LongMv(v) => Self::LongMv(v),
            ColumnValues::FloatMv(v) => Self::FloatMv(v),
            ColumnValues::DoubleMv(v) => Self::DoubleMv(v),
            ColumnValues::StringMv(v) => Self::StringMv(v),
            ColumnValues::BigDecimalMv(_) | ColumnValues::BytesMv(_) => {
                return Err(InternalError::unsupported_type(
                    ErrorOrigin::Fetch,
                    "row fetch",
                    values.stored_type(),
                    false,
                ));
            }
        };

        Ok(fetcher)
    }

    fn get(&self, doc: usize) -> Option<Value> {
        let value = match self {
            Self::Int(v) => Value::Int(*v.get(doc)?),
            Self::Long(v) => Value::Long(*v.get(doc)?),
            Self::Float(v) => Value::Float(*v.get(doc)?),
            Self::Double(v) => Value::Double(*v.get(doc)?),
            Self::BigDecimal(v) => Value::BigDecimal(*v.get(doc)?),
            Self::String(v) => Value::String(v.get(doc)?.clone()),
            Self::Bytes(v) => Value::Bytes(v.get(doc)?.clone()),
            Self::IntMv(v) => Value::IntArray(v.get(doc)?.clone()),
            Self::LongMv(v) => Value::LongArray(v.get(doc)?.clone()),
            Self::FloatMv(v) => Value::FloatArray(v.get(doc)?.clone()),
            Self::DoubleMv(v) => Value::DoubleArray(v.get(doc)?.clone()),
            Self::StringMv(v) => Value::StringArray(v.get(doc)?.clone()),
        };

        Some(value)
    }

    const fn is_single_value(&self) -> bool {
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
}

struct ColumnAccessor<'a> {
    fetcher: ColumnFetcher<'a>,
    null_bitmap: Option<&'a RoaringBitmap>,
}

impl ColumnAccessor<'_> {
    fn cell(&self, doc: usize) -> Result<Value, InternalError> {
        if self.fetcher.is_single_value()
            && self
                .null_bitmap
                .is_some_and(|bitmap| bitmap.contains(bitmap_position(doc)))
        {
            return Ok(Value::Null);
        }

        self.fetcher.get(doc).ok_or_else(|| {
            InternalError::internal_state(
                ErrorOrigin::Fetch,
                format!("document {doc} is outside the current block"),
            )
        })
    }
}

///
/// RowFetcher
///
/// Row-oriented view over the columns of one block. Built once per block;
/// every accessor borrows that block's arrays.
///

pub struct RowFetcher<'a> {
    columns: Vec<ColumnAccessor<'a>>,
}

impl<'a> RowFetcher<'a> {
    pub fn new(columns: &'a [BlockValSet]) -> Result<Self, InternalError> {
        let columns = columns
            .iter()
            .map(|column| {
                Ok(ColumnAccessor {
                    fetcher: ColumnFetcher::new(column.values())?,
                    null_bitmap: column.null_bitmap(),
                })
            })
            .collect::<Result<Vec<_>, InternalError>>()?;

        Ok(Self { columns })
    }

    #[must_use]
    pub const fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Materialize the full row for `doc`.
    pub fn row(&self, doc: usize) -> Result<Row, InternalError> {
        self.columns.iter().map(|column| column.cell(doc)).collect()
    }

    /// Write the cells for `doc` into `buffer` starting at `start`.
    pub fn fill_row(
        &self,
        doc: usize,
        buffer: &mut [Value],
        start: usize,
    ) -> Result<(), InternalError> {
        let end = start + self.columns.len();
        let width = buffer.len();
        let slots = buffer.get_mut(start..end).ok_or_else(|| {
            InternalError::internal_state(
                ErrorOrigin::Fetch,
                format!("row buffer of width {width} cannot hold columns {start}..{end}"),
            )
        })?;

        for (slot, column) in slots.iter_mut().zip(&self.columns) {
            *slot = column.cell(doc)?;
        }

        Ok(())
    }

    /// Null bitmap of a single-value column. Multi-value columns never
    /// report nulls.
    #[must_use]
    pub fn column_null_bitmap(&self, column: usize) -> Option<&'a RoaringBitmap> {
        let accessor = self.columns.get(column)?;
        if accessor.fetcher.is_single_value() {
            accessor.null_bitmap
        } else {
            None
        }
    }
}
