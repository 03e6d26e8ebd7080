use core::time::Duration;
use tokio_util::sync::CancellationToken;

/// Returns a token that cancels itself once `after` has elapsed.
///
/// A zero duration yields a token that is already cancelled, so a producer
/// handed this token emits nothing. The token can still be cancelled early by
/// any clone (e.g. on Ctrl+C); the timer task then exits without waiting.
///
/// Must be called from within a Tokio runtime.
pub fn deadline_token(after: Duration) -> CancellationToken {
    let token = CancellationToken::new();

    if after.is_zero() {
        token.cancel();
        return token;
    }

    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(after) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Deadline of {:?} reached, cancelling producer", after);
                timer.cancel();
            }
            () = timer.cancelled() => {}
        }
    });

    token
}
