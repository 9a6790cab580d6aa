//! Scripted transport shared by the tester unit tests

use crate::tester::attempt::{Connection, Dialer};
use crate::types::{Endpoint, Protocol};
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Dialer that lets the first `succeed_first` dials through and refuses the rest
pub(crate) struct CountingDialer {
    succeed_first: u32,
    dial_delay: Duration,
    panic_on_dial: bool,
    calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl CountingDialer {
    pub(crate) fn succeeding() -> Self {
        Self::succeeding_first(u32::MAX)
    }

    pub(crate) fn succeeding_first(succeed_first: u32) -> Self {
        Self {
            succeed_first,
            dial_delay: Duration::ZERO,
            panic_on_dial: false,
            calls: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }

    pub(crate) fn panicking() -> Self {
        Self { panic_on_dial: true, ..Self::succeeding() }
    }

    pub(crate) fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for CountingDialer {
    async fn dial(&self, _protocol: Protocol, _endpoint: &Endpoint) -> io::Result<Box<dyn Connection>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_dial {
            panic!("scripted dial panic");
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.dial_delay.is_zero() {
            tokio::time::sleep(self.dial_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if call < self.succeed_first {
            Ok(Box::new(NoopConnection))
        } else {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "scripted refusal"))
        }
    }
}

struct NoopConnection;

#[async_trait]
impl Connection for NoopConnection {
    async fn write_all(&mut self, _payload: &[u8]) -> io::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
