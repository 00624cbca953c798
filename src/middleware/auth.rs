// Admin upload gate
//
// A single static shared secret compared against the configured value. This
// is not a session or token scheme.

use crate::types::{AppError, AppResult};

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Accept the request only when `supplied` matches the admin secret.
pub fn verify_admin_password(supplied: Option<&str>, expected: &str) -> AppResult<()> {
    match supplied {
        Some(password) if !expected.is_empty() && constant_time_eq(password.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}
