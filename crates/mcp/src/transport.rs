//! MCP transport layer.
//!
//! Splits the duplex byte stream into an input side (`McpTransport`), owned
//! by the single reader, and a shareable output side (`MessageSink`) that
//! serializes writes so concurrent responses never interleave.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};

use crate::error::McpError;

/// One read from the input side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A non-empty line, trimmed.
    Line(String),
    /// A line that is not valid UTF-8.
    Undecodable,
    /// An empty or whitespace-only line.
    Idle,
    /// The input stream is closed.
    Closed,
}

/// Trait for MCP message transport.
///
/// Implementations handle the wire format (newline-delimited JSON) over
/// different channels (stdio, in-memory).
#[async_trait]
pub trait McpTransport: Send {
    /// Read the next line from the transport.
    async fn receive(&mut self) -> Result<Inbound, McpError>;

    /// Read everything until the input is exhausted.
    async fn receive_all(&mut self) -> Result<String, McpError>;

    /// Handle for writing responses. Clones share one underlying writer.
    fn sink(&self) -> Arc<dyn MessageSink>;
}

/// Output side of a transport.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Write one message followed by a newline, then flush.
    async fn send(&self, message: &str) -> Result<(), McpError>;
}

/// Mutex-guarded writer emitting whole lines.
pub struct LineWriter<W> {
    inner: Mutex<W>,
}

impl<W> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<W> MessageSink for LineWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: &str) -> Result<(), McpError> {
        let mut writer = self.inner.lock().await;
        writer.write_all(message.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Newline-delimited JSON over any async byte stream pair.
pub struct StreamTransport<R, W> {
    reader: R,
    writer: Arc<LineWriter<W>>,
}

/// Reads from stdin, writes to stdout.
pub type StdioTransport = StreamTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl<R, W> StreamTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer: Arc::new(LineWriter::new(writer)),
        }
    }
}

impl StreamTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Create a new stdio transport.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> McpTransport for StreamTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn receive(&mut self) -> Result<Inbound, McpError> {
        let mut buf = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut buf).await?;
        if bytes_read == 0 {
            return Ok(Inbound::Closed);
        }
        let line = match String::from_utf8(buf) {
            Ok(line) => line,
            Err(_) => return Ok(Inbound::Undecodable),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Inbound::Idle);
        }
        Ok(Inbound::Line(trimmed.to_string()))
    }

    async fn receive_all(&mut self) -> Result<String, McpError> {
        let mut input = String::new();
        self.reader.read_to_string(&mut input).await?;
        Ok(input)
    }

    fn sink(&self) -> Arc<dyn MessageSink> {
        self.writer.clone()
    }
}

/// In-memory transport for testing, backed by channel pairs.
pub struct ChannelTransport {
    rx: mpsc::Receiver<String>,
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Create a pair of connected transports for testing.
    ///
    /// Messages sent on one transport are received by the other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = mpsc::channel(32);
        let (tx_b, rx_a) = mpsc::channel(32);
        (Self { rx: rx_a, tx: tx_a }, Self { rx: rx_b, tx: tx_b })
    }

    pub async fn send(&self, message: &str) -> Result<(), McpError> {
        ChannelSink(self.tx.clone()).send(message).await
    }
}

struct ChannelSink(mpsc::Sender<String>);

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send(&self, message: &str) -> Result<(), McpError> {
        self.0.send(message.to_string()).await.map_err(|e| {
            McpError::Transport(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
        })
    }
}

#[async_trait]
impl McpTransport for ChannelTransport {
    async fn receive(&mut self) -> Result<Inbound, McpError> {
        match self.rx.recv().await {
            Some(msg) if msg.trim().is_empty() => Ok(Inbound::Idle),
            Some(msg) => Ok(Inbound::Line(msg.trim().to_string())),
            None => Ok(Inbound::Closed),
        }
    }

    async fn receive_all(&mut self) -> Result<String, McpError> {
        let mut lines = Vec::new();
        while let Some(msg) = self.rx.recv().await {
            lines.push(msg);
        }
        Ok(lines.join("\n"))
    }

    fn sink(&self) -> Arc<dyn MessageSink> {
        Arc::new(ChannelSink(self.tx.clone()))
    }
}
