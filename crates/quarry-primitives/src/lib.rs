#[macro_use]
mod macros;

use std::fmt;

///
/// StoredType
///
/// Physical storage type of one column inside a block.
/// Logical types (timestamps, booleans, json) are stored as one of these.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StoredType {
    Int,
    Long,
    Float,
    Double,
    BigDecimal,
    String,
    Bytes,
}

impl StoredType {
    /// Return the full metadata descriptor for one stored type.
    #[must_use]
    pub const fn metadata(self) -> StoredTypeMetadata {
        stored_type_registry!(metadata_from_registry, self)
    }

    /// Return the routing family for this stored type.
    #[must_use]
    pub const fn family(self) -> StoredTypeFamily {
        self.metadata().family
    }

    /// Return the canonical upper-case type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.metadata().name
    }

    /// Return whether this type participates in numeric aggregation.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.metadata().is_numeric
    }

    /// Return whether a multi-value (array) column of this type can be fetched.
    #[must_use]
    pub const fn supports_multi_value(self) -> bool {
        self.metadata().supports_multi_value
    }
}

impl fmt::Display for StoredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

///
/// StoredTypeMetadata
///
/// Capability metadata shared by fetch, aggregation and distinct kernels.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StoredTypeMetadata {
    pub family: StoredTypeFamily,
    pub name: &'static str,
    pub is_numeric: bool,
    pub supports_multi_value: bool,
}

///
/// StoredTypeFamily
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StoredTypeFamily {
    Numeric,
    Textual,
    Binary,
}

/// Ordered list of all stored types in registry order.
pub const ALL_STORED_TYPES: [StoredType; 7] = stored_type_registry!(all_types_from_registry);

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_every_stored_type_once() {
        let mut seen = ALL_STORED_TYPES.to_vec();
        seen.sort();
        seen.dedup();

        assert_eq!(seen.len(), ALL_STORED_TYPES.len());
    }

    #[test]
    fn multi_value_support_excludes_decimal_and_bytes() {
        let mv: Vec<StoredType> = ALL_STORED_TYPES
            .into_iter()
            .filter(|ty| ty.supports_multi_value())
            .collect();

        assert_eq!(
            mv,
            vec![
                StoredType::Int,
                StoredType::Long,
                StoredType::Float,
                StoredType::Double,
                StoredType::String,
            ]
        );
    }

    #[test]
    fn numeric_family_matches_numeric_flag() {
        for ty in ALL_STORED_TYPES {
            assert_eq!(
                ty.is_numeric(),
                ty.family() == StoredTypeFamily::Numeric,
                "numeric flag should agree with family for {ty}"
            );
        }
    }

    #[test]
    fn display_uses_canonical_names() {
        assert_eq!(StoredType::BigDecimal.to_string(), "BIG_DECIMAL");
        assert_eq!(StoredType::Bytes.to_string(), "BYTES");
    }
}
