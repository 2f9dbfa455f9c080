// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The byte-stream the session runs over.
//!
//! The session reads and writes concurrently (a dedicated task blocks on
//! receive while the main loop sends), so a transport splits into two
//! independently owned halves.

use std::future::Future;
use std::io;

/// A connected transport carrying whole frames in each direction.
pub trait Transport: Send + 'static {
    type Tx: TransportTx;
    type Rx: TransportRx;

    /// Splits the transport into its sending and receiving halves.
    fn split(self) -> (Self::Tx, Self::Rx);
}

/// The sending half.
pub trait TransportTx: Send + 'static {
    /// Sends one frame.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Closes the connection. Further receives on the other half will
    /// observe end-of-stream.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// The receiving half.
pub trait TransportRx: Send + 'static {
    /// Receives one frame, or `None` on a clean end-of-stream.
    fn recv(&mut self) -> impl Future<Output = io::Result<Option<Vec<u8>>>> + Send;
}
