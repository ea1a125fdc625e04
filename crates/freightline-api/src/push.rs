//! Push transport abstraction.
//!
//! A [`PushTransport`] dials one connection per call; the returned
//! [`PushConnection`] yields server-pushed events until the server closes
//! the stream or an error occurs. Reconnection policy lives with the caller,
//! not here: a transport never retries on its own.

use std::future::Future;

use secrecy::SecretString;

use crate::error::Error;
use crate::models::PushEvent;

/// Factory for push connections bound to a session token.
pub trait PushTransport: Send + Sync + 'static {
    type Connection: PushConnection;

    /// Establish a connection authenticated with `token`.
    ///
    /// Resolves once the connection is open (the "onopen" point).
    fn connect(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Self::Connection, Error>> + Send;
}

/// One open push connection.
pub trait PushConnection: Send + 'static {
    /// Wait for the next pushed event.
    ///
    /// - `Some(Ok(event))`: a message arrived
    /// - `Some(Err(e))`: the connection failed; no further events follow
    /// - `None`: the server closed the stream
    fn next_event(&mut self) -> impl Future<Output = Option<Result<PushEvent, Error>>> + Send;

    /// Close the connection. Must be safe to call after the stream ended.
    fn close(self) -> impl Future<Output = ()> + Send;
}
