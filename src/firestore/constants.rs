pub(crate) const DEFAULT_DATABASE_ID: &str = "(default)";

/// Maximum number of writes Firestore accepts in a single `batchWrite` call.
pub const MAX_BATCH_WRITES: usize = 500;

/// Field mask path that matches no field, used to list document names only.
pub(crate) const EMPTY_FIELD_MASK: &str = "_none_";

/// Value substituted for reference values whose resource name cannot be parsed.
pub const REFERENCE_ERROR_SENTINEL: &str = "<ERROR>";
