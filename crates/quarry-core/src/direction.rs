use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Direction
///
/// Sort direction shared by selection order-by, distinct order-by and
/// group-by order-by. Null placement does not depend on it.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Orient a natural-order comparison so `Less` means "sorts first".
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }

    #[must_use]
    pub const fn is_asc(self) -> bool {
        matches!(self, Self::Asc)
    }
}
