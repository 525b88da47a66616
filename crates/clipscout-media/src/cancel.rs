//! Job-wide cancellation signal.
//!
//! A `watch` channel carrying `true` once the job is cancelled. Loops poll
//! [`is_cancelled`] at every step; async waits race against [`cancelled`].

use tokio::sync::watch;

/// Receiving half handed to every decoding loop and provider task.
pub type CancelReceiver = watch::Receiver<bool>;

/// Create a fresh, not-yet-cancelled signal.
pub fn cancel_channel() -> (watch::Sender<bool>, CancelReceiver) {
    watch::channel(false)
}

/// Receiver that can never fire.
pub fn never_cancelled() -> CancelReceiver {
    let (tx, rx) = watch::channel(false);
    // Dropping the sender freezes the value at `false`.
    drop(tx);
    rx
}

pub fn is_cancelled(rx: &CancelReceiver) -> bool {
    *rx.borrow()
}

/// Resolve once the signal is raised; pends forever if the sender is gone.
pub async fn cancelled(rx: &mut CancelReceiver) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_resolves_after_send() {
        let (tx, mut rx) = cancel_channel();
        assert!(!is_cancelled(&rx));

        let waiter = tokio::spawn(async move {
            cancelled(&mut rx).await;
        });
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn test_never_cancelled_pends() {
        let mut rx = never_cancelled();
        let result = tokio::time::timeout(Duration::from_millis(20), cancelled(&mut rx)).await;
        assert!(result.is_err());
    }
}
