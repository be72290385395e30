//! Backoff schedule for failed sync passes.

/// Longest a job keeps retrying, counted from its first pass
pub const MAX_RETENTION_SECONDS: u64 = 24 * 3600;

/// Calculate next retry delay (exponential backoff)
///
/// # Formula
/// delay = base_delay * 2^(attempt - 1)
///
/// # Example (base 30s)
/// - Attempt 1: 30 seconds
/// - Attempt 2: 60 seconds
/// - Attempt 3: 120 seconds
/// - Attempt 4: 240 seconds
pub fn calculate_retry_delay(attempt: u32, base_delay_seconds: u64) -> u64 {
    base_delay_seconds.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Check if a sync job should be abandoned
///
/// # Abandonment Criteria
/// - After `max_attempts` passes
/// - Or after [`MAX_RETENTION_SECONDS`] since the first pass
pub fn should_abandon_sync(
    attempt: u32,
    max_attempts: u32,
    first_attempt_at: u64,
    current_time: u64,
) -> bool {
    attempt >= max_attempts
        || current_time.saturating_sub(first_attempt_at) >= MAX_RETENTION_SECONDS
}
