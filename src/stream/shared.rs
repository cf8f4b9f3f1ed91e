use crate::def::{RunConn, RunReadHalf, RunSplit, RunWriteHalf};
use bytes::{Buf, Bytes};
use log::debug;
use std::cmp;
use std::io::{Error, ErrorKind, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;

struct Reader<R> {
    half: R,
    pending: Option<Error>,
}

// 地址在连接存续期间不变, 拆分前记录一次
type AddrSnapshot = std::result::Result<SocketAddr, (ErrorKind, String)>;

fn snapshot(addr: Result<SocketAddr>) -> AddrSnapshot {
    addr.map_err(|e| (e.kind(), e.to_string()))
}

fn restore(addr: &AddrSnapshot) -> Result<SocketAddr> {
    addr.clone()
        .map_err(|(kind, msg)| Error::new(kind, msg))
}

/// A prefixed connection that may be read from several tasks at once.
///
/// The prefix is copied out and advanced under a lock, so every prefix byte
/// goes to exactly one caller. The connection is split when wrapped: reads
/// take turns on the read half, writes and close on the write half, and a
/// reader waiting for data never holds up a writer. Which caller gets which
/// bytes is unspecified.
///
/// Addresses are read from the connection when it is wrapped.
pub struct SharedPrefixedConn<C: RunSplit> {
    head: Mutex<Bytes>,
    consumed_head: AtomicBool,
    reader: tokio::sync::Mutex<Reader<C::ReadHalf>>,
    writer: tokio::sync::Mutex<C::WriteHalf>,
    local_addr: AddrSnapshot,
    peer_addr: AddrSnapshot,
}

impl<C: RunSplit> SharedPrefixedConn<C> {
    pub fn wrap(conn: C, head: impl Into<Bytes>) -> Self {
        let head = head.into();
        let consumed_head = AtomicBool::new(head.is_empty());
        let local_addr = snapshot(conn.local_addr());
        let peer_addr = snapshot(conn.peer_addr());
        let (r, w) = conn.split();
        Self {
            head: Mutex::new(head),
            consumed_head,
            reader: tokio::sync::Mutex::new(Reader {
                half: r,
                pending: None,
            }),
            writer: tokio::sync::Mutex::new(w),
            local_addr,
            peer_addr,
        }
    }

    pub fn is_head_consumed(&self) -> bool {
        self.consumed_head.load(Ordering::Acquire)
    }

    /// Returns the read and write halves of the wrapped connection.
    pub fn into_halves(self) -> (C::ReadHalf, C::WriteHalf) {
        (self.reader.into_inner().half, self.writer.into_inner())
    }

    // Copies the next prefix bytes into `buf`; zero once the prefix is gone.
    fn take_head(&self, buf: &mut [u8]) -> usize {
        let mut head = self.head.lock().unwrap_or_else(PoisonError::into_inner);
        let n = cmp::min(head.len(), buf.len());
        buf[..n].copy_from_slice(&head[..n]);
        head.advance(n);
        if head.is_empty() && !self.consumed_head.swap(true, Ordering::AcqRel) {
            debug!("shared prefix consumed, reading from connection");
        }
        n
    }

    /// Reads through a shared reference.
    ///
    /// A call that got prefix bytes returns them at once when another
    /// reader is busy on the connection.
    pub async fn read_shared(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut n = 0;
        if !self.is_head_consumed() {
            n = self.take_head(buf);
            if n == buf.len() {
                return Ok(n);
            }
        }
        let mut reader = if n > 0 {
            match self.reader.try_lock() {
                Ok(reader) => reader,
                Err(_) => return Ok(n),
            }
        } else {
            self.reader.lock().await
        };
        if let Some(e) = reader.pending.take() {
            if n > 0 {
                reader.pending = Some(e);
                return Ok(n);
            }
            return Err(e);
        }
        match reader.half.read(&mut buf[n..]).await {
            Ok(m) => Ok(n + m),
            Err(e) if n == 0 => Err(e),
            Err(e) => {
                reader.pending = Some(e);
                Ok(n)
            }
        }
    }

    /// Writes through a shared reference. Only other writes are waited for.
    pub async fn write_shared(&self, buf: &[u8]) -> Result<usize> {
        self.writer.lock().await.write(buf).await
    }

    pub async fn close_shared(&self) -> Result<()> {
        self.writer.lock().await.close().await
    }
}

#[async_trait::async_trait]
impl<C: RunSplit> RunConn for SharedPrefixedConn<C> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read_shared(buf).await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.writer.get_mut().write(buf).await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.get_mut().close().await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        restore(&self.local_addr)
    }

    fn peer_addr(&self) -> Result<SocketAddr> {
        restore(&self.peer_addr)
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.reader.get_mut().half.set_read_deadline(deadline)
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.writer.get_mut().set_write_deadline(deadline)
    }
}
