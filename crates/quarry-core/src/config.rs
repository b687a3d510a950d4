//! Module: config
//! Responsibility: per-query execution options and their string-map parsing.
//! Does not own: query shape (expressions, functions, ordering).

use crate::error::{ErrorOrigin, InternalError};
use serde::Deserialize;
use std::{collections::HashMap, str::FromStr};

///
/// QueryOptions
///
/// Execution knobs shared by every operator of one query.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(rename = "enableNullHandling")]
    pub null_handling_enabled: bool,
    pub limit: usize,
    pub offset: usize,
    pub block_size: usize,
    pub max_initial_capacity: usize,
    pub num_groups_limit: usize,
}

impl QueryOptions {
    pub const DEFAULT_LIMIT: usize = 10;
    pub const DEFAULT_BLOCK_SIZE: usize = crate::block::DEFAULT_BLOCK_SIZE;
    pub const DEFAULT_MAX_INITIAL_CAPACITY: usize = crate::MAX_ROW_HOLDER_INITIAL_CAPACITY;
    pub const DEFAULT_NUM_GROUPS_LIMIT: usize = 100_000;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            null_handling_enabled: false,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
            block_size: Self::DEFAULT_BLOCK_SIZE,
            max_initial_capacity: Self::DEFAULT_MAX_INITIAL_CAPACITY,
            num_groups_limit: Self::DEFAULT_NUM_GROUPS_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_null_handling(mut self, enabled: bool) -> Self {
        self.null_handling_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    #[must_use]
    pub const fn with_max_initial_capacity(mut self, capacity: usize) -> Self {
        self.max_initial_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn with_num_groups_limit(mut self, limit: usize) -> Self {
        self.num_groups_limit = limit;
        self
    }

    /// Rows a single partial result must retain: `offset + limit`.
    #[must_use]
    pub const fn num_rows_to_keep(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }

    /// Initial heap or holder capacity for `num_rows`.
    #[must_use]
    pub fn initial_capacity(&self, num_rows: usize) -> usize {
        num_rows.min(self.max_initial_capacity)
    }

    /// Parse the string option map attached to a query. Unknown keys are
    /// ignored.
    pub fn from_map(options: &HashMap<String, String>) -> Result<Self, InternalError> {
        let mut parsed = Self::new();

        if let Some(raw) = options.get("enableNullHandling") {
            parsed.null_handling_enabled = parse_option("enableNullHandling", raw)?;
        }
        if let Some(raw) = options.get("limit") {
            parsed.limit = parse_option("limit", raw)?;
        }
        if let Some(raw) = options.get("offset") {
            parsed.offset = parse_option("offset", raw)?;
        }
        if let Some(raw) = options.get("numGroupsLimit") {
            parsed.num_groups_limit = parse_option("numGroupsLimit", raw)?;
        }
        if let Some(raw) = options.get("blockSize") {
            let block_size: usize = parse_option("blockSize", raw)?;
            if block_size == 0 {
                return Err(InternalError::invalid_argument(
                    ErrorOrigin::Config,
                    "blockSize must be positive",
                ));
            }
            parsed.block_size = block_size;
        }

        Ok(parsed)
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_option<T: FromStr>(key: &str, raw: &str) -> Result<T, InternalError> {
    raw.trim().to_ascii_lowercase().parse().map_err(|_| {
        InternalError::invalid_argument(
            ErrorOrigin::Config,
            format!("invalid value '{raw}' for query option {key}"),
        )
    })
}
