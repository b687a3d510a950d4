#[macro_export]
macro_rules! stored_type_registry_entries {
    ($macro:ident $(, @args $($args:tt)+ )?) => {
        $macro! {
            $(
                @args $($args)+;
            )?
            @entries
            (
                Int,
                Numeric,
                name = "INT",
                is_numeric = true,
                supports_multi_value = true
            ),
            (
                Long,
                Numeric,
                name = "LONG",
                is_numeric = true,
                supports_multi_value = true
            ),
            (
                Float,
                Numeric,
                name = "FLOAT",
                is_numeric = true,
                supports_multi_value = true
            ),
            (
                Double,
                Numeric,
                name = "DOUBLE",
                is_numeric = true,
                supports_multi_value = true
            ),
            (
                BigDecimal,
                Numeric,
                name = "BIG_DECIMAL",
                is_numeric = true,
                supports_multi_value = false
            ),
            (
                String,
                Textual,
                name = "STRING",
                is_numeric = false,
                supports_multi_value = true
            ),
            (
                Bytes,
                Binary,
                name = "BYTES",
                is_numeric = false,
                supports_multi_value = false
            ),
        }
    };
}

macro_rules! stored_type_registry {
    ($macro:ident) => {
        $crate::stored_type_registry_entries!($macro)
    };
    ($macro:ident, $($args:tt)+) => {
        $crate::stored_type_registry_entries!($macro, @args $($args)+)
    };
}

macro_rules! metadata_from_registry {
    ( @args $kind:expr; @entries $( ($stored:ident, $family:ident, name = $name:expr, is_numeric = $is_numeric:expr, supports_multi_value = $supports_multi_value:expr) ),* $(,)? ) => {
        match $kind {
            $(
                $crate::StoredType::$stored => $crate::StoredTypeMetadata {
                    family: $crate::StoredTypeFamily::$family,
                    name: $name,
                    is_numeric: $is_numeric,
                    supports_multi_value: $supports_multi_value,
                },
            )*
        }
    };
}

macro_rules! all_types_from_registry {
    ( @entries $( ($stored:ident, $family:ident, name = $name:expr, is_numeric = $is_numeric:expr, supports_multi_value = $supports_multi_value:expr) ),* $(,)? ) => {
        [ $( $crate::StoredType::$stored ),* ]
    };
}
