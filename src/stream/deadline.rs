use std::future::Future;
use std::io::{Error, ErrorKind, Result};
use tokio::time::{timeout_at, Instant};

/// Absolute read and write deadlines for a connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct Deadlines {
    pub read: Option<Instant>,
    pub write: Option<Instant>,
}

impl Deadlines {
    pub async fn read<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        run_until(self.read, fut).await
    }

    pub async fn write<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        run_until(self.write, fut).await
    }
}

pub fn timed_out() -> Error {
    Error::new(ErrorKind::TimedOut, "i/o timeout")
}

async fn run_until<F, T>(deadline: Option<Instant>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        None => fut.await,
        Some(d) => {
            // 已过期的截止时间直接失败, 不再发起 I/O
            if Instant::now() >= d {
                return Err(timed_out());
            }
            timeout_at(d, fut).await.map_err(|_| timed_out())?
        }
    }
}
