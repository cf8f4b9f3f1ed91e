use crate::def::RunConn;
use bytes::{Buf, Bytes};
use log::debug;
use std::cmp;
use std::io::{Error, IoSlice, Result};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};
use tokio::time::Instant;

/// Where the injected bytes come from.
enum Head {
    /// Remaining prefix bytes. Never empty while the head is active.
    Bytes(Bytes),
    /// Lazily read prefix. Its end of stream marks the end of the head.
    Reader(Box<dyn AsyncRead + Unpin + Send + Sync>),
}

/// A connection that serves `head` to readers before any byte of the
/// wrapped connection.
///
/// This is useful when a protocol needs to be detected by reading some
/// initial bytes, and then those bytes need to be passed on to the actual
/// protocol handler. Writes, close, addresses and deadlines go straight to
/// the wrapped connection.
///
/// Reads take `&mut self`, so only one reader at a time. See
/// [`SharedPrefixedConn`](crate::stream::shared::SharedPrefixedConn) for
/// concurrent readers.
pub struct PrefixedConn<C> {
    conn: C,
    head: Head,
    consumed_head: bool,
    // underlying error raised in the same call that returned prefix bytes
    pending: Option<Error>,
}

impl<C> PrefixedConn<C> {
    /// Wraps `conn`, inserting `head` at the start of the read stream.
    /// An empty `head` makes the wrapper read straight from `conn`.
    pub fn wrap(conn: C, head: impl Into<Bytes>) -> Self {
        let head = head.into();
        let consumed_head = head.is_empty();
        Self {
            conn,
            head: Head::Bytes(head),
            consumed_head,
            pending: None,
        }
    }

    /// Wraps `conn`, reading from `head` until it reports end of stream.
    ///
    /// Each read is served by a single read of `head` while it still yields
    /// data; the source's end of stream is never handed to the caller, the
    /// read goes on to `conn` instead.
    pub fn wrap_reader<R>(conn: C, head: R) -> Self
    where
        R: AsyncRead + Unpin + Send + Sync + 'static,
    {
        Self {
            conn,
            head: Head::Reader(Box::new(head)),
            consumed_head: false,
            pending: None,
        }
    }

    pub fn get_ref(&self) -> &C {
        &self.conn
    }

    pub fn get_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Whether reads are now served by the wrapped connection only.
    pub fn is_head_consumed(&self) -> bool {
        self.consumed_head
    }

    /// Splits into the wrapped connection and the unread prefix bytes.
    ///
    /// Fails, handing the wrapper back, when the prefix is a reader that
    /// has not reached its end or an error is still waiting to be reported.
    pub fn try_into_parts(self) -> std::result::Result<(C, Bytes), Self> {
        if self.pending.is_some() {
            return Err(self);
        }
        if self.consumed_head {
            return Ok((self.conn, Bytes::new()));
        }
        match self.head {
            Head::Bytes(head) => Ok((self.conn, head)),
            Head::Reader(_) => Err(self),
        }
    }

    fn finish_head(&mut self) {
        debug!("prefix consumed, reading from connection");
        self.consumed_head = true;
        self.head = Head::Bytes(Bytes::new());
    }
}

// Copies as much of `head` as fits into `buf` and advances past it.
fn copy_head(head: &mut Bytes, buf: &mut [u8]) -> usize {
    let n = cmp::min(head.len(), buf.len());
    buf[..n].copy_from_slice(&head[..n]);
    head.advance(n);
    n
}

#[async_trait::async_trait]
impl<C: RunConn> RunConn for PrefixedConn<C> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.consumed_head {
            match &mut self.head {
                Head::Bytes(head) => {
                    let n = copy_head(head, buf);
                    if head.is_empty() {
                        self.finish_head();
                    }
                    if n == buf.len() {
                        return Ok(n);
                    }
                    // 前缀已读完但缓冲区还有空间, 继续从连接读; 此处 n > 0
                    return match self.conn.read(&mut buf[n..]).await {
                        Ok(m) => Ok(n + m),
                        Err(e) => {
                            self.pending = Some(e);
                            Ok(n)
                        }
                    };
                }
                Head::Reader(r) => {
                    let n = r.read(buf).await?;
                    if n > 0 {
                        return Ok(n);
                    }
                    self.finish_head();
                }
            }
        }
        if let Some(e) = self.pending.take() {
            return Err(e);
        }
        self.conn.read(buf).await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.conn.write(buf).await
    }

    async fn close(&mut self) -> Result<()> {
        self.conn.close().await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.conn.local_addr()
    }

    fn peer_addr(&self) -> Result<SocketAddr> {
        self.conn.peer_addr()
    }

    fn set_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.conn.set_deadline(deadline)
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.conn.set_read_deadline(deadline)
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.conn.set_write_deadline(deadline)
    }
}

// The poll surface never waits on the connection while it holds prefix
// bytes: after a partial copy the connection is polled once, and if it is
// not ready the prefix bytes are returned on their own.
impl<C: AsyncRead + Unpin> AsyncRead for PrefixedConn<C> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        if !this.consumed_head {
            match &mut this.head {
                Head::Bytes(head) => {
                    let n = cmp::min(head.len(), buf.remaining());
                    buf.put_slice(&head[..n]);
                    head.advance(n);
                    if head.is_empty() {
                        this.finish_head();
                    }
                    if buf.remaining() == 0 {
                        return Poll::Ready(Ok(()));
                    }
                    if let Poll::Ready(Err(e)) = Pin::new(&mut this.conn).poll_read(cx, buf) {
                        this.pending = Some(e);
                    }
                    return Poll::Ready(Ok(()));
                }
                Head::Reader(r) => {
                    let before = buf.filled().len();
                    ready!(Pin::new(r).poll_read(cx, buf))?;
                    if buf.filled().len() > before {
                        return Poll::Ready(Ok(()));
                    }
                    this.finish_head();
                }
            }
        }
        if let Some(e) = this.pending.take() {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut this.conn).poll_read(cx, buf)
    }
}

impl<C: AsyncWrite + Unpin> AsyncWrite for PrefixedConn<C> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize>> {
        Pin::new(&mut self.conn).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<Result<usize>> {
        Pin::new(&mut self.conn).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.conn.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.conn).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.conn).poll_shutdown(cx)
    }
}
