// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The session's terminal error.

use std::fmt;
use std::io;

use ferrogram_mtproto::errors::FrameError;
use ferrogram_mtproto::handshake;
use ferrogram_tl_types::deserialize;

/// Why a session stopped. The first error wins; everything after it is
/// only logged.
#[derive(Debug)]
pub enum SessionError {
    /// The transport failed to send or receive.
    Transport(io::Error),

    /// An incoming frame could not be understood, or carried a transport
    /// error code.
    Frame(FrameError),

    /// A decoded frame held malformed object data.
    Codec(deserialize::Error),

    /// The key exchange failed.
    Handshake(handshake::Error),

    /// A handler reported an error.
    Handler(String),
}

impl SessionError {
    /// Convenience constructor for handler failures.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Frame(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::Handshake(e) => Some(e),
            Self::Handler(_) => None,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Frame(e) => write!(f, "frame error: {e}"),
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Handshake(e) => write!(f, "handshake error: {e}"),
            Self::Handler(message) => write!(f, "handler error: {message}"),
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        Self::Transport(error)
    }
}

impl From<FrameError> for SessionError {
    fn from(error: FrameError) -> Self {
        Self::Frame(error)
    }
}

impl From<deserialize::Error> for SessionError {
    fn from(error: deserialize::Error) -> Self {
        Self::Codec(error)
    }
}

impl From<handshake::Error> for SessionError {
    fn from(error: handshake::Error) -> Self {
        Self::Handshake(error)
    }
}
