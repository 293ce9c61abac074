//! Shared metrics recording for identity store backends.

use std::time::Instant;

/// Records operation metrics for a store call.
///
/// Emits `storage_operations_total` (counter) and
/// `storage_operation_duration_ms` (histogram), both labelled with
/// `backend`, `operation` and `status`.
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    ::metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    ::metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Runs a store operation and records its metrics.
pub fn timed<T, E>(
    backend: &'static str,
    operation: &'static str,
    body: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    let start = Instant::now();
    let result = body();
    let status = if result.is_ok() { "success" } else { "error" };
    record_operation_metrics(backend, operation, start, status);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_passes_result_through() {
        let ok: Result<u8, String> = timed("memory", "get", || Ok(7));
        assert_eq!(ok, Ok(7));

        let err: Result<u8, String> = timed("memory", "get", || Err("boom".to_string()));
        assert_eq!(err, Err("boom".to_string()));
    }

    #[test]
    fn test_record_operation_metrics_without_recorder() {
        record_operation_metrics("sqlite", "put", Instant::now(), "success");
        record_operation_metrics("sqlite", "delete", Instant::now(), "error");
    }
}
