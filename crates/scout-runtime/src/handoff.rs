//! Single-slot hand-off between pipeline stages.
//!
//! A [`handoff`] pair is a [`tokio::sync::mpsc`] channel of capacity one: the
//! producer's [`put`][HandoffSender::put] waits until the previous value has
//! been taken, so at most one value is ever in flight.  The pipelined control
//! loop runs two of these in opposite directions, which strictly alternates
//! perception and decision.
//!
//! # Example
//!
//! ```rust
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let (tx, mut rx) = scout_runtime::handoff::handoff::<u32>();
//!     tx.put(7).await.unwrap();
//!     assert_eq!(rx.take().await, Some(7));
//! });
//! ```

use scout_types::ScoutError;
use tokio::sync::mpsc;

/// Producing half of a hand-off.
#[derive(Debug)]
pub struct HandoffSender<T> {
    tx: mpsc::Sender<T>,
}

/// Consuming half of a hand-off.
#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<T>,
}

/// Create a single-slot hand-off.
pub fn handoff<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

impl<T> HandoffSender<T> {
    /// Place `value` in the slot, waiting while it is occupied.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::Channel`] when the receiver has been dropped.
    pub async fn put(&self, value: T) -> Result<(), ScoutError> {
        self.tx
            .send(value)
            .await
            .map_err(|_| ScoutError::Channel("hand-off receiver dropped".to_string()))
    }
}

impl<T> HandoffReceiver<T> {
    /// Take the next value; `None` once the sender is gone and the slot is
    /// empty.
    pub async fn take(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn slot_holds_a_single_value() {
        let (tx, mut rx) = handoff::<u32>();
        tx.put(1).await.unwrap();

        // Second put must wait until the first value is taken.
        let blocked = tokio::time::timeout(Duration::from_millis(20), tx.put(2)).await;
        assert!(blocked.is_err());

        assert_eq!(rx.take().await, Some(1));
        tx.put(3).await.unwrap();
        assert_eq!(rx.take().await, Some(3));
    }

    #[tokio::test]
    async fn take_returns_none_after_sender_drops() {
        let (tx, mut rx) = handoff::<&str>();
        tx.put("last").await.unwrap();
        drop(tx);
        assert_eq!(rx.take().await, Some("last"));
        assert_eq!(rx.take().await, None);
    }

    #[tokio::test]
    async fn put_fails_once_receiver_is_gone() {
        let (tx, rx) = handoff::<u8>();
        drop(rx);
        assert!(matches!(tx.put(0).await, Err(ScoutError::Channel(_))));
    }
}
