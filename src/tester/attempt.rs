//! A single connect → write → close cycle against the target
//!
//! The transport is reached through the [`Dialer`] / [`Connection`] seam so
//! the worker logic is the same for TCP, UDP and scripted test transports.
//! Failures never leave this module: they are logged and reported as an
//! [`AttemptOutcome`].

use crate::{
    logging::Logger,
    models::TestConfiguration,
    tester::accumulator::SuccessCounter,
    types::{Endpoint, Protocol},
};
use async_trait::async_trait;
use std::{io, net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    io::AsyncWriteExt,
    net::{lookup_host, TcpStream, UdpSocket},
    time::{timeout, timeout_at, Instant},
};

/// An open transport-level connection to the target
#[async_trait]
pub trait Connection: Send {
    /// Write the whole payload
    async fn write_all(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Close the connection; nothing is read from the peer first
    async fn close(&mut self) -> io::Result<()>;
}

/// Opens connections; the caller bounds the call with the attempt timeout
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, protocol: Protocol, endpoint: &Endpoint) -> io::Result<Box<dyn Connection>>;
}

/// Dialer backed by the tokio network stack
#[derive(Debug, Clone, Copy, Default)]
pub struct NetDialer;

#[async_trait]
impl Dialer for NetDialer {
    async fn dial(&self, protocol: Protocol, endpoint: &Endpoint) -> io::Result<Box<dyn Connection>> {
        match protocol {
            Protocol::Tcp => {
                let stream = TcpStream::connect(endpoint.to_string()).await?;
                Ok(Box::new(TcpConnection { stream }))
            }
            Protocol::Udp => {
                let remote = resolve(endpoint).await?;
                let local: SocketAddr = if remote.is_ipv4() {
                    ([0, 0, 0, 0], 0).into()
                } else {
                    ([0u16; 8], 0).into()
                };
                let socket = UdpSocket::bind(local).await?;
                socket.connect(remote).await?;
                Ok(Box::new(UdpConnection { socket }))
            }
        }
    }
}

async fn resolve(endpoint: &Endpoint) -> io::Result<SocketAddr> {
    lookup_host(endpoint.to_string())
        .await?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no addresses found for {}", endpoint)))
}

struct TcpConnection {
    stream: TcpStream,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn write_all(&mut self, payload: &[u8]) -> io::Result<()> {
        self.stream.write_all(payload).await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

struct UdpConnection {
    socket: UdpSocket,
}

#[async_trait]
impl Connection for UdpConnection {
    async fn write_all(&mut self, payload: &[u8]) -> io::Result<()> {
        let sent = self.socket.send(payload).await?;
        if sent != payload.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", sent, payload.len()),
            ));
        }
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        // Dropping the socket releases it; there is no handshake to fail
        Ok(())
    }
}

/// Stage of an attempt at which it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptStage {
    Dial,
    Deadline,
    Write,
    Close,
}

impl AttemptStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStage::Dial => "dial",
            AttemptStage::Deadline => "deadline",
            AttemptStage::Write => "write",
            AttemptStage::Close => "close",
        }
    }
}

/// Why a single attempt did not complete cleanly
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("cannot connect to {endpoint}: {source}")]
    Dial {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("write deadline of {}ms exceeded sending to {}", .timeout.as_millis(), .endpoint)]
    Deadline { endpoint: String, timeout: Duration },

    #[error("cannot send data to {endpoint}: {source}")]
    Write {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("error while closing connection to {endpoint}: {source}")]
    Close {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

impl AttemptError {
    pub fn stage(&self) -> AttemptStage {
        match self {
            AttemptError::Dial { .. } => AttemptStage::Dial,
            AttemptError::Deadline { .. } => AttemptStage::Deadline,
            AttemptError::Write { .. } => AttemptStage::Write,
            AttemptError::Close { .. } => AttemptStage::Close,
        }
    }

    /// A close failure happens after the payload left, so the attempt still counts
    pub fn counts_as_success(&self) -> bool {
        matches!(self, AttemptError::Close { .. })
    }

    /// Underlying cause without the endpoint prefix
    pub fn cause(&self) -> String {
        match self {
            AttemptError::Dial { source, .. }
            | AttemptError::Write { source, .. }
            | AttemptError::Close { source, .. } => source.to_string(),
            AttemptError::Deadline { timeout, .. } => {
                format!("timed out after {}ms", timeout.as_millis())
            }
        }
    }
}

/// Terminal state of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(AttemptStage),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded)
    }
}

/// Runs attempts for one test run; cloned into every spawned task
#[derive(Clone)]
pub struct AttemptWorker {
    config: Arc<TestConfiguration>,
    dialer: Arc<dyn Dialer>,
    counter: SuccessCounter,
    logger: Logger,
}

impl AttemptWorker {
    pub fn new(
        config: Arc<TestConfiguration>,
        dialer: Arc<dyn Dialer>,
        counter: SuccessCounter,
        logger: Logger,
    ) -> Self {
        Self { config, dialer, counter, logger }
    }

    /// Perform attempt number `sequence` (1-based) and record its outcome.
    ///
    /// The counter is incremented before this future completes, so once the
    /// task has been joined its contribution is visible.
    pub async fn run(self, sequence: u32) -> AttemptOutcome {
        let endpoint = self.config.endpoint().to_string();
        let protocol = self.config.protocol();

        match self.exchange(&endpoint).await {
            Ok(()) => {
                self.counter.increment().await;
                self.logger.info(&format!("successful connection and data sent to {}", endpoint))
                    .field("attempt", sequence)
                    .field("protocol", protocol)
                    .field("endpoint", &endpoint)
                    .log()
                    .await;
                AttemptOutcome::Succeeded
            }
            Err(error) if error.counts_as_success() => {
                self.counter.increment().await;
                self.logger.warn(&format!("data sent but {}", error))
                    .field("attempt", sequence)
                    .field("protocol", protocol)
                    .field("endpoint", &endpoint)
                    .field("stage", error.stage().as_str())
                    .field("error", error.cause())
                    .log()
                    .await;
                AttemptOutcome::Succeeded
            }
            Err(error) => {
                self.logger.warn(&error.to_string())
                    .field("attempt", sequence)
                    .field("protocol", protocol)
                    .field("endpoint", &endpoint)
                    .field("stage", error.stage().as_str())
                    .field("error", error.cause())
                    .log()
                    .await;
                AttemptOutcome::Failed(error.stage())
            }
        }
    }

    async fn exchange(&self, endpoint: &str) -> Result<(), AttemptError> {
        let limit = self.config.timeout();

        let dial = self.dialer.dial(self.config.protocol(), self.config.endpoint());
        let mut connection = match timeout(limit, dial).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(source)) => {
                return Err(AttemptError::Dial { endpoint: endpoint.to_string(), source });
            }
            Err(_) => {
                let source = io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("dial timed out after {}ms", limit.as_millis()),
                );
                return Err(AttemptError::Dial { endpoint: endpoint.to_string(), source });
            }
        };

        // Measured from connection success, not from attempt start
        let deadline = Instant::now() + limit;
        match timeout_at(deadline, connection.write_all(self.config.message())).await {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                return Err(AttemptError::Write { endpoint: endpoint.to_string(), source });
            }
            Err(_) => {
                return Err(AttemptError::Deadline { endpoint: endpoint.to_string(), timeout: limit });
            }
        }

        connection
            .close()
            .await
            .map_err(|source| AttemptError::Close { endpoint: endpoint.to_string(), source })
    }
}
