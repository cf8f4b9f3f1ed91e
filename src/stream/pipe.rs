use crate::def::{RunConn, RunSplit};
use crate::stream::deadline::Deadlines;
use crate::stream::split::{IoReadHalf, IoWriteHalf};
use std::io::{Error, ErrorKind, Result};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf, ReadHalf, WriteHalf,
};
use tokio::time::Instant;

pub const DEFAULT_PIPE_BUFFER: usize = 4096;

/// One end of an in-memory, full duplex connection. Neither end has a
/// socket address.
pub struct PipeRunConn {
    inner: DuplexStream,
    deadlines: Deadlines,
}

/// Creates a connected pair of in-memory connections. Each direction buffers
/// up to `max_buf_size` bytes before writes wait for the reader.
pub fn pipe(max_buf_size: usize) -> (PipeRunConn, PipeRunConn) {
    let (a, b) = tokio::io::duplex(max_buf_size);
    (PipeRunConn::new(a), PipeRunConn::new(b))
}

impl PipeRunConn {
    fn new(inner: DuplexStream) -> Self {
        Self {
            inner,
            deadlines: Deadlines::default(),
        }
    }
}

fn no_addr() -> Error {
    Error::new(ErrorKind::Unsupported, "pipe has no socket address")
}

#[async_trait::async_trait]
impl RunConn for PipeRunConn {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.deadlines.read(self.inner.read(buf)).await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.deadlines.write(self.inner.write(buf)).await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.shutdown().await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Err(no_addr())
    }

    fn peer_addr(&self) -> Result<SocketAddr> {
        Err(no_addr())
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines.read = deadline;
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.deadlines.write = deadline;
        Ok(())
    }
}

impl RunSplit for PipeRunConn {
    type ReadHalf = IoReadHalf<ReadHalf<DuplexStream>>;
    type WriteHalf = IoWriteHalf<WriteHalf<DuplexStream>>;

    fn split(self) -> (Self::ReadHalf, Self::WriteHalf) {
        let (r, w) = tokio::io::split(self.inner);
        (
            IoReadHalf::new(r, self.deadlines.read),
            IoWriteHalf::new(w, self.deadlines.write),
        )
    }
}

impl AsyncRead for PipeRunConn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for PipeRunConn {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
