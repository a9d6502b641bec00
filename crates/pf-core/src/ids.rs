use core::fmt;
use core::num::NonZeroU32;

/// Defines a dense, 0-based index type stored as `index + 1` so that
/// `Option<Id>` costs nothing extra.
macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(NonZeroU32);

        impl $name {
            pub fn from_index(index: u32) -> Self {
                Self(NonZeroU32::MIN.saturating_add(index))
            }

            pub fn index(self) -> u32 {
                self.0.get() - 1
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "({})"), self.index())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "{}"), self.index())
            }
        }
    };
}

dense_id!(
    /// Position of a header (shared-pressure junction) in its topology.
    HeaderId,
    "h"
);

dense_id!(
    /// Position of a branch in its topology and in the solver's branch table.
    BranchId,
    "b"
);
