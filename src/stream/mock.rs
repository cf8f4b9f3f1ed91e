use crate::def::{RunConn, RunReadHalf, RunSplit, RunWriteHalf};
use std::collections::VecDeque;
use std::io::{Error, ErrorKind, Result};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Instant;

/// A connection that replays a fixed script of read results and records
/// everything done to it. An exhausted script reads as end of stream.
pub struct ScriptConn {
    script: VecDeque<std::result::Result<Vec<u8>, ErrorKind>>,
    pub reads: usize,
    pub written: Vec<u8>,
    pub closed: bool,
    pub read_deadline: Option<Instant>,
    pub write_deadline: Option<Instant>,
    pub local: SocketAddr,
    pub peer: SocketAddr,
}

impl ScriptConn {
    pub fn new(script: Vec<std::result::Result<Vec<u8>, ErrorKind>>) -> Self {
        Self {
            script: script.into(),
            reads: 0,
            written: Vec::new(),
            closed: false,
            read_deadline: None,
            write_deadline: None,
            local: SocketAddr::from(([127, 0, 0, 1], 40000)),
            peer: SocketAddr::from(([127, 0, 0, 1], 50000)),
        }
    }

    fn next_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reads += 1;
        match self.script.pop_front() {
            None => Ok(0),
            Some(Err(kind)) => Err(Error::new(kind, "scripted failure")),
            Some(Ok(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.script.push_front(Ok(chunk.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

#[async_trait::async_trait]
impl RunConn for ScriptConn {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.next_chunk(buf)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local)
    }

    fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.peer)
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.read_deadline = deadline;
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.write_deadline = deadline;
        Ok(())
    }
}

impl AsyncRead for ScriptConn {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<Result<()>> {
        let this = self.get_mut();
        let n = this.next_chunk(buf.initialize_unfilled())?;
        buf.advance(n);
        Poll::Ready(Ok(()))
    }
}

/// Read side of a split [`ScriptConn`].
pub struct ScriptReadHalf(ScriptConn);

/// Write side of a split [`ScriptConn`]; records what reaches it.
pub struct ScriptWriteHalf {
    pub written: Vec<u8>,
    pub closed: bool,
    pub write_deadline: Option<Instant>,
}

impl RunSplit for ScriptConn {
    type ReadHalf = ScriptReadHalf;
    type WriteHalf = ScriptWriteHalf;

    fn split(self) -> (ScriptReadHalf, ScriptWriteHalf) {
        let w = ScriptWriteHalf {
            written: self.written.clone(),
            closed: self.closed,
            write_deadline: self.write_deadline,
        };
        (ScriptReadHalf(self), w)
    }
}

#[async_trait::async_trait]
impl RunReadHalf for ScriptReadHalf {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.0.next_chunk(buf)
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.0.read_deadline = deadline;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RunWriteHalf for ScriptWriteHalf {
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<()> {
        self.write_deadline = deadline;
        Ok(())
    }
}

/// Fails every read.
pub struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<Result<()>> {
        Poll::Ready(Err(Error::new(ErrorKind::InvalidData, "bad source")))
    }
}
