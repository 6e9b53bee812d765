use subtle::ConstantTimeEq;

/// Header carrying the client API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time string comparison for secrets.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Whether a request may proceed. With no key configured every request is
/// allowed; otherwise the provided key must match exactly.
pub fn is_authorized(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (None, _) => true,
        (Some(expected), Some(provided)) => constant_time_compare(expected, provided),
        (Some(_), None) => false,
    }
}
