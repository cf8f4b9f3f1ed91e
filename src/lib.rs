//! Connections that replay a prefix of bytes before the data of the
//! connection they wrap.
//!
//! A protocol detector reads the first bytes of a connection to decide
//! who handles it; [`PrefixedConn::wrap`] puts those bytes back so the
//! handler sees the stream from its start.

pub mod def;
pub mod listener;
pub mod object;
pub mod stream;

#[cfg(test)]
mod test;

pub use def::RunConn;
pub use stream::pipe::{pipe, PipeRunConn};
pub use stream::prefixed::PrefixedConn;
pub use stream::shared::SharedPrefixedConn;
pub use stream::tcp::TcpRunConn;
