use crate::{
    block::{
        BlockSource, BlockValSet, ColumnMetadata, ColumnValues, DEFAULT_BLOCK_SIZE, SegmentSource,
        ValueBlock, bitmap_position,
    },
    error::{ErrorOrigin, InternalError},
    value::FieldKind,
};
use roaring::RoaringBitmap;
use std::collections::{BTreeSet, HashSet};

///
/// MemoryColumn
///

#[derive(Clone, Debug)]
struct MemoryColumn {
    metadata: ColumnMetadata,
    values: BlockValSet,
}

///
/// MemorySegment
///
/// Fully materialized segment held in memory. Columns are stored whole and
/// sliced into blocks of `block_size` documents on scan.
///

#[derive(Clone, Debug)]
pub struct MemorySegment {
    name: String,
    num_docs: usize,
    block_size: usize,
    columns: Vec<MemoryColumn>,
    sorted_columns: BTreeSet<String>,
    filter: Option<RoaringBitmap>,
}

impl MemorySegment {
    pub fn new(name: impl Into<String>, num_docs: usize) -> Self {
        Self {
            name: name.into(),
            num_docs,
            block_size: DEFAULT_BLOCK_SIZE,
            columns: Vec::new(),
            sorted_columns: BTreeSet::new(),
            filter: None,
        }
    }

    /// Add one column; its value count must equal the segment's doc count.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        field_kind: FieldKind,
        values: ColumnValues,
        null_bitmap: Option<RoaringBitmap>,
    ) -> Result<Self, InternalError> {
        let name = name.into();
        if values.len() != self.num_docs {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Fetch,
                format!(
                    "column '{name}' has {} values, segment '{}' has {} documents",
                    values.len(),
                    self.name,
                    self.num_docs
                ),
            ));
        }
        if self.columns.iter().any(|c| c.metadata.name == name) {
            return Err(InternalError::invalid_argument(
                ErrorOrigin::Fetch,
                format!("duplicate column '{name}' in segment '{}'", self.name),
            ));
        }

        let metadata = ColumnMetadata::new(
            name,
            values.stored_type(),
            values.is_single_value(),
            field_kind,
        );
        let mut column = BlockValSet::new(values);
        if let Some(bitmap) = null_bitmap {
            column = column.with_null_bitmap(bitmap);
        }
        self.columns.push(MemoryColumn {
            metadata,
            values: column,
        });

        Ok(self)
    }

    #[must_use]
    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = if block_size == 0 { 1 } else { block_size };
        self
    }

    /// Declare that documents are stored in ascending order of `column`.
    #[must_use]
    pub fn with_sorted_column(mut self, column: impl Into<String>) -> Self {
        self.sorted_columns.insert(column.into());
        self
    }

    /// Restrict scans to the documents matched by a filter.
    #[must_use]
    pub fn with_filter(mut self, matching_docs: RoaringBitmap) -> Self {
        self.filter = Some(matching_docs);
        self
    }

    fn column_index(&self, name: &str) -> Result<usize, InternalError> {
        self.columns
            .iter()
            .position(|c| c.metadata.name == name)
            .ok_or_else(|| {
                InternalError::invalid_argument(
                    ErrorOrigin::Fetch,
                    format!("unknown column '{name}' in segment '{}'", self.name),
                )
            })
    }

    fn block_source(
        &self,
        expressions: &[String],
        doc_ids: Vec<u32>,
        entries_scanned_in_filter: u64,
        null_handling: bool,
    ) -> Result<MemoryBlockSource<'_>, InternalError> {
        let columns = expressions
            .iter()
            .map(|expr| self.column_index(expr))
            .collect::<Result<Vec<_>, _>>()?;
        let num_columns_projected = columns.iter().collect::<HashSet<_>>().len();

        Ok(MemoryBlockSource {
            segment: self,
            columns,
            doc_ids,
            cursor: 0,
            null_handling,
            num_columns_projected,
            entries_scanned_in_filter,
        })
    }
}

impl SegmentSource for MemorySegment {
    fn name(&self) -> &str {
        &self.name
    }

    fn total_docs(&self) -> u64 {
        self.num_docs as u64
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.metadata.name.clone()).collect()
    }

    fn column_metadata(&self, column: &str) -> Result<ColumnMetadata, InternalError> {
        let index = self.column_index(column)?;

        Ok(self.columns[index].metadata.clone())
    }

    fn is_sorted_on(&self, column: &str) -> bool {
        self.sorted_columns.contains(column)
    }

    fn open(
        &self,
        expressions: &[String],
        null_handling: bool,
    ) -> Result<Box<dyn BlockSource + '_>, InternalError> {
        let (doc_ids, scanned): (Vec<u32>, u64) = match &self.filter {
            Some(filter) => (
                filter
                    .iter()
                    .filter(|&doc| (doc as usize) < self.num_docs)
                    .collect(),
                self.num_docs as u64,
            ),
            None => ((0..self.num_docs).map(bitmap_position).collect(), 0),
        };
        let source = self.block_source(expressions, doc_ids, scanned, null_handling)?;

        Ok(Box::new(source))
    }

    fn open_docs(
        &self,
        expressions: &[String],
        doc_ids: &RoaringBitmap,
        null_handling: bool,
    ) -> Result<Box<dyn BlockSource + '_>, InternalError> {
        if let Some(max) = doc_ids.max()
            && max as usize >= self.num_docs
        {
            return Err(InternalError::internal_state(
                ErrorOrigin::Fetch,
                format!(
                    "document {max} requested from segment '{}' with {} documents",
                    self.name, self.num_docs
                ),
            ));
        }
        let source = self.block_source(expressions, doc_ids.iter().collect(), 0, null_handling)?;

        Ok(Box::new(source))
    }
}

///
/// MemoryBlockSource
///

pub struct MemoryBlockSource<'a> {
    segment: &'a MemorySegment,
    columns: Vec<usize>,
    doc_ids: Vec<u32>,
    cursor: usize,
    null_handling: bool,
    num_columns_projected: usize,
    entries_scanned_in_filter: u64,
}

impl BlockSource for MemoryBlockSource<'_> {
    fn next_block(&mut self) -> Result<Option<ValueBlock>, InternalError> {
        if self.cursor >= self.doc_ids.len() {
            return Ok(None);
        }

        let end = (self.cursor + self.segment.block_size).min(self.doc_ids.len());
        let doc_ids = self.doc_ids[self.cursor..end].to_vec();
        self.cursor = end;

        let positions: Vec<usize> = doc_ids.iter().map(|&doc| doc as usize).collect();
        let columns = self
            .columns
            .iter()
            .map(|&index| {
                let column = self.segment.columns[index].values.take(&positions);
                if self.null_handling {
                    column
                } else {
                    column.without_null_bitmap()
                }
            })
            .collect();

        Ok(Some(ValueBlock::new(doc_ids, columns)))
    }

    fn num_columns_projected(&self) -> usize {
        self.num_columns_projected
    }

    fn num_entries_scanned_in_filter(&self) -> u64 {
        self.entries_scanned_in_filter
    }
}
