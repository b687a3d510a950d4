//! Decimal helpers: lossless parsing from primitive cells, the binary cell
//! encoding (big-endian scale then two's-complement unscaled value) and
//! HALF_EVEN precision/scale rounding.

use crate::error::{ErrorOrigin, InternalError};
use num_traits::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

const SCALE_BYTES: usize = 2;
const MAX_UNSCALED_BYTES: usize = 16;

/// Decimal from a double through its shortest round-trip rendering.
pub(crate) fn decimal_from_f64(value: f64) -> Result<Decimal, InternalError> {
    if !value.is_finite() {
        return Err(InternalError::invalid_argument(
            ErrorOrigin::Aggregate,
            format!("cannot convert non-finite value {value} to decimal"),
        ));
    }

    parse_decimal(&value.to_string())
}

/// Decimal from a float; the float is widened to a double first.
pub(crate) fn decimal_from_f32(value: f32) -> Result<Decimal, InternalError> {
    decimal_from_f64(f64::from(value))
}

/// Parse plain or scientific decimal text.
pub(crate) fn parse_decimal(text: &str) -> Result<Decimal, InternalError> {
    let trimmed = text.trim();

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|err| {
            InternalError::invalid_argument(
                ErrorOrigin::Aggregate,
                format!("cannot parse '{trimmed}' as decimal: {err}"),
            )
        })
}

#[must_use]
pub(crate) fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Encode a decimal as scale (2 bytes) followed by the minimal two's
/// complement big-endian unscaled value.
#[must_use]
pub fn serialize_decimal(value: Decimal) -> Vec<u8> {
    let unscaled = value.mantissa().to_be_bytes();
    let negative = value.mantissa() < 0;
    let fill = if negative { 0xFF } else { 0x00 };

    // keep one sign byte
    let mut start = 0;
    while start + 1 < unscaled.len()
        && unscaled[start] == fill
        && ((unscaled[start + 1] & 0x80) != 0) == negative
    {
        start += 1;
    }

    #[allow(clippy::cast_possible_truncation)]
    let scale = value.scale() as u16;
    let mut out = Vec::with_capacity(SCALE_BYTES + unscaled.len() - start);
    out.extend_from_slice(&scale.to_be_bytes());
    out.extend_from_slice(&unscaled[start..]);

    out
}

/// Decode bytes produced by [`serialize_decimal`].
pub fn deserialize_decimal(bytes: &[u8]) -> Result<Decimal, InternalError> {
    if bytes.len() <= SCALE_BYTES || bytes.len() > SCALE_BYTES + MAX_UNSCALED_BYTES {
        return Err(InternalError::invalid_argument(
            ErrorOrigin::Aggregate,
            format!("invalid serialized decimal length {}", bytes.len()),
        ));
    }

    let scale = i16::from_be_bytes([bytes[0], bytes[1]]);
    let scale = u32::try_from(scale).map_err(|_| {
        InternalError::invalid_argument(
            ErrorOrigin::Aggregate,
            format!("negative decimal scale {scale} is not supported"),
        )
    })?;

    let unscaled = &bytes[SCALE_BYTES..];
    let fill = if unscaled[0] & 0x80 == 0 { 0x00 } else { 0xFF };
    let mut buf = [fill; MAX_UNSCALED_BYTES];
    buf[MAX_UNSCALED_BYTES - unscaled.len()..].copy_from_slice(unscaled);

    Decimal::try_from_i128_with_scale(i128::from_be_bytes(buf), scale).map_err(|err| {
        InternalError::invalid_argument(
            ErrorOrigin::Aggregate,
            format!("serialized decimal out of range: {err}"),
        )
    })
}

/// Round to `precision` significant digits, HALF_EVEN. Zero means unlimited.
#[must_use]
pub(crate) fn round_to_precision(value: Decimal, precision: u32) -> Decimal {
    if precision == 0 {
        return value;
    }

    value
        .round_sf_with_strategy(precision, RoundingStrategy::MidpointNearestEven)
        .unwrap_or(value)
}

/// Round to exactly `scale` fractional digits, HALF_EVEN, padding with zeros.
#[must_use]
pub(crate) fn set_scale(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(scale);

    rounded
}
