//! One producer, two independent sinks.

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::InvoiceError;

/// What happened to one sink over a whole render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkOutcome {
    pub bytes_written: u64,
    /// First error the sink hit; the sink received nothing after it.
    pub error: Option<String>,
}

impl SinkOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

struct SinkSlot<W> {
    name: &'static str,
    writer: Option<W>,
    bytes_written: u64,
    error: Option<String>,
}

impl<W: AsyncWrite + Unpin> SinkSlot<W> {
    fn new(name: &'static str, writer: Option<W>) -> Self {
        Self {
            name,
            writer,
            bytes_written: 0,
            error: None,
        }
    }

    fn failed(name: &'static str, error: String) -> Self {
        Self {
            name,
            writer: None,
            bytes_written: 0,
            error: Some(error),
        }
    }

    fn is_live(&self) -> bool {
        self.writer.is_some()
    }

    fn fail(&mut self, error: std::io::Error) {
        metrics::counter!("invoice_sink_failures_total", "sink" => self.name).increment(1);
        tracing::warn!(
            sink = self.name,
            bytes_written = self.bytes_written,
            error = %error,
            "invoice sink failed, continuing with the other sink"
        );
        self.writer = None;
        self.error = Some(error.to_string());
    }

    async fn write(&mut self, chunk: &[u8]) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        match writer.write_all(chunk).await {
            Ok(()) => self.bytes_written += chunk.len() as u64,
            Err(e) => self.fail(e),
        }
    }

    async fn close(&mut self) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writer.shutdown().await {
            self.fail(e);
        }
    }

    fn outcome(&self) -> SinkOutcome {
        SinkOutcome {
            bytes_written: self.bytes_written,
            error: self.error.clone(),
        }
    }
}

/// Writes every chunk to a file sink and a response sink concurrently.
///
/// A failing sink is dropped and the other keeps receiving chunks. Writing
/// only fails once both sinks have failed.
pub struct FanOutWriter<F, R> {
    file: SinkSlot<F>,
    response: SinkSlot<R>,
}

impl<F, R> FanOutWriter<F, R>
where
    F: AsyncWrite + Unpin,
    R: AsyncWrite + Unpin,
{
    pub fn new(file: F, response: R) -> Self {
        Self {
            file: SinkSlot::new("file", Some(file)),
            response: SinkSlot::new("response", Some(response)),
        }
    }

    /// Starts with a file sink that could not be opened.
    pub fn without_file(file_error: std::io::Error, response: R) -> Self {
        metrics::counter!("invoice_sink_failures_total", "sink" => "file").increment(1);
        tracing::warn!(error = %file_error, "invoice file could not be opened, streaming response only");
        Self {
            file: SinkSlot::failed("file", file_error.to_string()),
            response: SinkSlot::new("response", Some(response)),
        }
    }

    /// Writes one chunk to every live sink.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), InvoiceError> {
        self.ensure_live()?;
        tokio::join!(self.file.write(chunk), self.response.write(chunk));
        self.ensure_live()
    }

    /// Flushes and shuts down both sinks.
    pub async fn finish(mut self) -> Result<(SinkOutcome, SinkOutcome), InvoiceError> {
        tokio::join!(self.file.close(), self.response.close());
        self.ensure_live()?;
        Ok((self.file.outcome(), self.response.outcome()))
    }

    fn ensure_live(&self) -> Result<(), InvoiceError> {
        if self.file.is_live() || self.response.is_live() {
            return Ok(());
        }
        Err(InvoiceError::AllSinksFailed {
            file: self.file.error.clone().unwrap_or_default(),
            response: self.response.error.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Accepts `limit` bytes, then fails every write.
    struct FailingWriter {
        limit: usize,
        accepted: Vec<u8>,
    }

    impl FailingWriter {
        fn new(limit: usize) -> Self {
            Self {
                limit,
                accepted: Vec::new(),
            }
        }
    }

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let room = self.limit - self.accepted.len();
            if room == 0 {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "client gone")));
            }
            let n = room.min(buf.len());
            self.accepted.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn both_sinks_receive_every_chunk() {
        let mut writer = FanOutWriter::new(Vec::new(), Vec::new());
        writer.write_chunk(b"hello ").await.unwrap();
        writer.write_chunk(b"world").await.unwrap();

        let (file, response) = writer.finish().await.unwrap();
        assert_eq!(file.bytes_written, 11);
        assert_eq!(response.bytes_written, 11);
        assert!(file.succeeded() && response.succeeded());
    }

    #[tokio::test]
    async fn failing_response_does_not_stop_the_file() {
        let mut writer = FanOutWriter::new(Vec::new(), FailingWriter::new(4));
        writer.write_chunk(b"abc").await.unwrap();
        writer.write_chunk(b"defgh").await.unwrap();
        writer.write_chunk(b"ij").await.unwrap();

        let (file, response) = writer.finish().await.unwrap();
        assert_eq!(file.bytes_written, 10);
        assert!(file.succeeded());
        assert_eq!(response.bytes_written, 3);
        assert!(response.error.unwrap().contains("client gone"));
    }

    #[tokio::test]
    async fn failing_file_does_not_stop_the_response() {
        let mut writer = FanOutWriter::new(FailingWriter::new(0), Vec::new());
        writer.write_chunk(b"abc").await.unwrap();

        let (file, response) = writer.finish().await.unwrap();
        assert!(!file.succeeded());
        assert_eq!(response.bytes_written, 3);
    }

    #[tokio::test]
    async fn fails_once_both_sinks_are_gone() {
        let mut writer = FanOutWriter::new(FailingWriter::new(0), FailingWriter::new(0));
        let result = writer.write_chunk(b"abc").await;
        assert!(matches!(result, Err(InvoiceError::AllSinksFailed { .. })));
    }

    #[tokio::test]
    async fn missing_file_sink_streams_response_only() {
        let mut writer: FanOutWriter<Vec<u8>, Vec<u8>> = FanOutWriter::without_file(
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            Vec::new(),
        );
        writer.write_chunk(b"abc").await.unwrap();
        let (file, response) = writer.finish().await.unwrap();
        assert_eq!(file.error.as_deref(), Some("read-only"));
        assert_eq!(response.bytes_written, 3);
    }
}
