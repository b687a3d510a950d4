use crate::{
    error::{ErrorOrigin, InternalError},
    value::decimal::decimal_to_f64,
};
use rust_decimal::Decimal;
use std::time::Instant;
use tracing::debug;

///
/// Accumulator
///
/// Running aggregate value for one scalar aggregate or one group.
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Accumulator {
    Double(f64),
    Long(i64),
    Decimal(Decimal),
}

impl Accumulator {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Double(v) => v,
            Self::Long(v) => v as f64,
            Self::Decimal(v) => decimal_to_f64(v),
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_long(self) -> i64 {
        match self {
            Self::Double(v) => v as i64,
            Self::Long(v) => v,
            Self::Decimal(v) => num_traits::ToPrimitive::to_i64(&v).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn as_decimal(self) -> Decimal {
        match self {
            Self::Double(v) => crate::value::decimal::decimal_from_f64(v).unwrap_or_default(),
            Self::Long(v) => Decimal::from(v),
            Self::Decimal(v) => v,
        }
    }
}

///
/// AggregationResultHolder
///
/// Scalar accumulator for one aggregate across a whole segment scan.
///

#[derive(Clone, Debug, PartialEq)]
pub struct AggregationResultHolder {
    value: Accumulator,
    seen_non_null: bool,
}

impl AggregationResultHolder {
    #[must_use]
    pub const fn new(initial: Accumulator) -> Self {
        Self {
            value: initial,
            seen_non_null: false,
        }
    }

    #[must_use]
    pub const fn value(&self) -> Accumulator {
        self.value
    }

    pub const fn set_value(&mut self, value: Accumulator) {
        self.value = value;
    }

    #[must_use]
    pub fn double(&self) -> f64 {
        self.value.as_f64()
    }

    pub const fn set_double(&mut self, value: f64) {
        self.value = Accumulator::Double(value);
    }

    /// Record that at least one non-null input reached this holder.
    pub const fn mark_non_null(&mut self) {
        self.seen_non_null = true;
    }

    #[must_use]
    pub const fn has_non_null(&self) -> bool {
        self.seen_non_null
    }
}

///
/// GroupState
///
/// Per-group nullness tag kept beside the accumulator.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GroupState {
    #[default]
    NoData,
    Null,
    Valued,
}

///
/// GroupSlot
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupSlot {
    pub state: GroupState,
    pub value: Accumulator,
}

impl GroupSlot {
    /// Promote `NoData` to `Valued`; a `Null` tag is kept.
    pub const fn observe(&mut self) {
        if matches!(self.state, GroupState::NoData) {
            self.state = GroupState::Valued;
        }
    }

    pub const fn mark_null(&mut self) {
        self.state = GroupState::Null;
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.state, GroupState::Null)
    }
}

///
/// GroupByResultHolder
///
/// Index-addressed accumulator per group key. Grows by doubling up to
/// `max_capacity`; each growth is counted as one resize.
///

#[derive(Clone, Debug)]
pub struct GroupByResultHolder {
    slots: Vec<GroupSlot>,
    default: Accumulator,
    max_capacity: usize,
    num_resizes: u64,
    resize_time_ms: u64,
}

impl GroupByResultHolder {
    #[must_use]
    pub fn new(initial_capacity: usize, max_capacity: usize, default: Accumulator) -> Self {
        let initial_capacity = initial_capacity.min(max_capacity);

        Self {
            slots: vec![Self::empty_slot(default); initial_capacity],
            default,
            max_capacity,
            num_resizes: 0,
            resize_time_ms: 0,
        }
    }

    const fn empty_slot(default: Accumulator) -> GroupSlot {
        GroupSlot {
            state: GroupState::NoData,
            value: default,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub const fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    #[must_use]
    pub const fn num_resizes(&self) -> u64 {
        self.num_resizes
    }

    #[must_use]
    pub const fn resize_time_ms(&self) -> u64 {
        self.resize_time_ms
    }

    /// Make room for group keys `0..capacity`.
    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<(), InternalError> {
        if capacity <= self.slots.len() {
            return Ok(());
        }
        if capacity > self.max_capacity {
            return Err(InternalError::internal_state(
                ErrorOrigin::Aggregate,
                format!(
                    "group capacity {capacity} exceeds holder maximum {}",
                    self.max_capacity
                ),
            ));
        }

        let started = Instant::now();
        let doubled = self.slots.len().saturating_mul(2).min(self.max_capacity);
        let new_capacity = capacity.max(doubled);
        self.slots
            .resize(new_capacity, Self::empty_slot(self.default));

        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.num_resizes = self.num_resizes.saturating_add(1);
        self.resize_time_ms = self.resize_time_ms.saturating_add(elapsed);
        crate::obs::sink::record(crate::obs::MetricsEvent::GroupResize {
            new_capacity: new_capacity as u64,
        });
        debug!(new_capacity, "group-by holder resized");

        Ok(())
    }

    pub fn slot(&self, group_key: u32) -> Result<&GroupSlot, InternalError> {
        self.slots
            .get(group_key as usize)
            .ok_or_else(|| Self::missing_key(group_key, self.slots.len()))
    }

    pub fn slot_mut(&mut self, group_key: u32) -> Result<&mut GroupSlot, InternalError> {
        let capacity = self.slots.len();
        self.slots
            .get_mut(group_key as usize)
            .ok_or_else(|| Self::missing_key(group_key, capacity))
    }

    fn missing_key(group_key: u32, capacity: usize) -> InternalError {
        InternalError::internal_state(
            ErrorOrigin::Aggregate,
            format!("group key {group_key} is outside holder capacity {capacity}"),
        )
    }
}
