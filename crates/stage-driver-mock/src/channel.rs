//! Simulated controller channel shared by several axes.
//!
//! Real stepper controllers sit behind one serial line or one Modbus/TCP
//! session that every axis on the controller talks through. [`SharedChannel`]
//! reproduces that: each exchange holds the line for its whole round trip, so
//! two axes never interleave a command and its reply.
//!
//! Every exchange is also appended to a transaction log, which tests use to
//! assert exactly which commands reached the controller.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// One command sent over the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Controller axis number
    pub axis: u8,
    /// Backend method that issued the command
    pub command: &'static str,
    /// Numeric argument, when the command carries one
    pub argument: Option<f64>,
}

#[derive(Debug, Default)]
struct ChannelInner {
    line: tokio::sync::Mutex<()>,
    log: Mutex<Vec<Transaction>>,
    delay: Mutex<Duration>,
}

/// Thread-safe handle to a simulated controller line.
///
/// Cloning shares the same line, log and delay.
#[derive(Debug, Clone, Default)]
pub struct SharedChannel {
    inner: Arc<ChannelInner>,
}

impl SharedChannel {
    /// New channel with no exchange delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// New channel where every exchange takes `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        let channel = Self::default();
        channel.set_delay(delay);
        channel
    }

    /// Change the exchange delay.
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock() = delay;
    }

    /// Send one command and wait for its reply.
    pub async fn exchange(&self, axis: u8, command: &'static str, argument: Option<f64>) {
        let _line = self.inner.line.lock().await;
        let delay = *self.inner.delay.lock();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        self.inner.log.lock().push(Transaction {
            axis,
            command,
            argument,
        });
    }

    /// Every transaction so far, in order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.inner.log.lock().clone()
    }

    /// Commands sent for one axis, in order.
    pub fn commands_for(&self, axis: u8) -> Vec<&'static str> {
        self.inner
            .log
            .lock()
            .iter()
            .filter(|t| t.axis == axis)
            .map(|t| t.command)
            .collect()
    }

    /// Number of times `command` was sent, any axis.
    pub fn count(&self, command: &str) -> usize {
        self.inner
            .log
            .lock()
            .iter()
            .filter(|t| t.command == command)
            .count()
    }

    /// Forget the transaction log.
    pub fn clear_log(&self) {
        self.inner.log.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_records_per_axis() {
        let channel = SharedChannel::new();
        let other = channel.clone();

        channel.exchange(1, "enable", None).await;
        other.exchange(2, "move_absolute_raw", Some(50.0)).await;
        channel.exchange(1, "position_raw", None).await;

        assert_eq!(channel.commands_for(1), vec!["enable", "position_raw"]);
        assert_eq!(channel.commands_for(2), vec!["move_absolute_raw"]);
        assert_eq!(other.count("enable"), 1);
        assert_eq!(
            channel.transactions()[1],
            Transaction {
                axis: 2,
                command: "move_absolute_raw",
                argument: Some(50.0),
            }
        );

        channel.clear_log();
        assert!(other.transactions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exchanges_are_serialized() {
        let channel = SharedChannel::with_delay(Duration::from_millis(10));
        let start = tokio::time::Instant::now();

        let a = channel.clone();
        let b = channel.clone();
        tokio::join!(a.exchange(1, "is_ready", None), b.exchange(2, "is_ready", None));

        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(channel.transactions().len(), 2);
    }
}
