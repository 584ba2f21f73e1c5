//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::ChatError;

/// Wrap a fallible future with a deadline. Elapsing yields
/// [`ChatError::Timeout`] carrying the limit in milliseconds.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, ChatError>>,
) -> Result<T, ChatError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ChatError::Timeout(duration.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_a_timeout_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ChatError>(1)
        };
        let err = with_timeout(Duration::from_millis(250), slow).await.unwrap_err();
        assert!(matches!(err, ChatError::Timeout(250)));
    }

    #[tokio::test]
    async fn inner_result_passes_through() {
        let value = with_timeout(Duration::from_secs(1), async { Ok::<_, ChatError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
