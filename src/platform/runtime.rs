use std::time::Duration;

/// Waits for the provided duration on the Tokio timer.
///
/// Zero-length waits return immediately without yielding.
pub async fn sleep(duration: Duration) {
    if duration.is_zero() {
        return;
    }

    tokio::time::sleep(duration).await;
}
