/// Extraction limit value meaning "no limit".
pub const LIMIT_UNLIMITED: u32 = u32::MAX;

/// Session feature: an empty string coming from the backend is a null.
pub const EMPTY_STRING_IS_NULL: &str = "emptyStringIsNull";

/// Session feature: a null extracted into a string destination becomes `""`.
pub const FORCE_EMPTY_STRING: &str = "forceEmptyString";

/// Storage mode names, matched case-insensitively.
pub const STORAGE_VECTOR: &str = "vector";
pub const STORAGE_LIST: &str = "list";
pub const STORAGE_DEQUE: &str = "deque";
pub const STORAGE_UNKNOWN: &str = "unknown";
