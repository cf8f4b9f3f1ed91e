use crate::def::{RunConn, RunSplit};
use crate::stream::deadline::Deadlines;
use crate::stream::split::{IoReadHalf, IoWriteHalf};
use std::io::Result;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::Instant;

// TcpStream 的包装
pub struct TcpRunConn {
    inner: TcpStream,
    deadlines: Deadlines,
}

impl TcpRunConn {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            inner: stream,
            deadlines: Deadlines::default(),
        }
    }

    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }

    pub fn into_inner(self) -> TcpStream {
        self.inner
    }
}

#[async_trait::async_trait]
impl RunConn for TcpRunConn {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.deadlines.read(self.inner.read(buf)).await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.deadlines.write(self.inner.write(buf)).await
    }

    /// Shuts down the write side; the socket itself is released on drop.
    async fn close(&mut self) -> Result<()> {
        self.inner.shutdown().await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr()
    }

    fn peer_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr()
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

impl RunSplit for TcpRunConn {
    type ReadHalf = IoReadHalf<OwnedReadHalf>;
    type WriteHalf = IoWriteHalf<OwnedWriteHalf>;

    fn split(self) -> (Self::ReadHalf, Self::WriteHalf) {
        let (r, w) = self.inner.into_split();
        (
            IoReadHalf::new(r, self.deadlines.read),
            IoWriteHalf::new(w, self.deadlines.write),
        )
    }
}

impl AsyncRead for TcpRunConn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpRunConn {
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
