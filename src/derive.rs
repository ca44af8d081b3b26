//! Tagged derive sources, replacing the source's overloaded `null`/`false`/
//! `true` sentinels.

/// One entry in a value's derive list: either a concrete past value, or
/// "all values at this step".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveEntry {
    /// A concrete `(valueIndex, stepAgo)` source. `value` index 0 is a
    /// perfectly valid source — there is no sentinel meaning here, unlike
    /// the untyped source this crate replaces.
    One { value: usize, step_ago: u32 },
    /// Expands to one entry per value at `step_ago`.
    AllAtStep { step_ago: u32 },
}

/// Per-value derive lists. `None` means "this value has no derive" (it is
/// not written from any past state); `Some(vec![])` means "has a derive
/// declaration with zero sources" — these are kept distinct, unlike the
/// source where both collapse to a falsy value.
pub type Derives = Vec<Option<Vec<DeriveEntry>>>;
