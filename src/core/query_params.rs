use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use std::collections::HashMap;

/// Parse query parameters from a URI string.
///
/// Handles URL decoding; when a key repeats only the last value is kept.
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&') {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

pub fn get_string(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|s| !s.is_empty()).cloned()
}

fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .max(1)
}

/// The `(page, limit)` pair every paginated endpoint uses. Page is
/// 1-based; the limit is clamped to the maximum page size, and the page
/// is clamped so `(page - 1) * limit` cannot overflow.
pub fn page_params(params: &HashMap<String, String>) -> (usize, usize) {
    let limit = get_int(params, "limit", DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let page = get_int(params, "page", 1).min(usize::MAX / limit);
    (page, limit)
}

/// `totalPages = ceil(total / limit)`.
pub fn total_pages(total: usize, limit: usize) -> usize {
    total.div_ceil(limit.max(1))
}
