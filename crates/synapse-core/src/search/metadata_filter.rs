//! Metadata-filter validation: a whitelist of filterable keys, string-only
//! values bounded in length, and a cap on the number of filter entries.

use std::collections::HashMap;

use super::SearchError;

pub type MetadataFilter = HashMap<String, String>;

const ALLOWED_KEYS: &[&str] = &[
    "source",
    "document_type",
    "author",
    "category",
    "tags",
    "language",
    "status",
];

const MAX_FILTER_VALUE_LENGTH: usize = 256;
const MAX_FILTER_KEYS: usize = 10;

/// Validates a caller-supplied metadata filter before it reaches any search
/// backend. Consumed by the Retrieval Orchestrator before dispatch.
pub fn validate_metadata_filter(filter: &MetadataFilter) -> Result<(), SearchError> {
    if filter.len() > MAX_FILTER_KEYS {
        return Err(SearchError::TooManyFilterKeys {
            count: filter.len(),
            max: MAX_FILTER_KEYS,
        });
    }
    for (key, value) in filter {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            return Err(SearchError::DisallowedFilterKey { key: key.clone() });
        }
        if value.len() > MAX_FILTER_VALUE_LENGTH {
            return Err(SearchError::FilterValueTooLong {
                key: key.clone(),
                max: MAX_FILTER_VALUE_LENGTH,
            });
        }
    }
    Ok(())
}
