// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors of the framing layer.

use std::fmt;

use ferrogram_crypto as crypto;

/// A message frame could not be produced or understood.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameError {
    /// The received data was a bare 4-byte error code rather than a
    /// frame. The absolute value resembles an HTTP status code; `404`
    /// for example means the server does not know our authorization key.
    TransportCode {
        /// The negative error code.
        code: i32,
    },

    /// The received data is too short to contain a valid frame.
    FrameTooShort {
        /// How many bytes there were.
        len: usize,
    },

    /// The frame was keyed by an authorization key other than ours.
    BadAuthKeyId {
        /// The key identifier found in the frame.
        got: i64,
    },

    /// An encrypted frame arrived before the handshake produced a key.
    MissingAuthKey,

    /// The message key embedded in the frame does not match the hash of
    /// the decrypted plaintext: the frame is corrupt or forged.
    BadMsgKey,

    /// The length field inside the frame was not strictly positive.
    BadMessageLength {
        /// The length value found.
        got: i32,
    },

    /// The length field inside the frame points past its end.
    TruncatedPayload {
        /// The length value found.
        got: usize,

        /// How many payload bytes were actually available.
        available: usize,
    },

    /// The encrypted part of the frame is not a whole number of cipher
    /// blocks.
    BadEncryptedPadding,
}

impl std::error::Error for FrameError {}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::TransportCode { code } => {
                write!(f, "transport-level error code {}", code.abs())
            }
            Self::FrameTooShort { len } => {
                write!(f, "frame of {len} bytes is too short to be valid")
            }
            Self::BadAuthKeyId { got } => write!(f, "frame keyed by foreign auth key {got:x}"),
            Self::MissingAuthKey => write!(f, "received an encrypted frame without an auth key"),
            Self::BadMsgKey => write!(f, "message key mismatch"),
            Self::BadMessageLength { got } => write!(f, "bad message length {got}"),
            Self::TruncatedPayload { got, available } => {
                write!(f, "message length {got} exceeds the {available} available bytes")
            }
            Self::BadEncryptedPadding => write!(f, "encrypted data is not block aligned"),
        }
    }
}

impl From<crypto::Error> for FrameError {
    fn from(error: crypto::Error) -> Self {
        match error {
            crypto::Error::InvalidBuffer => Self::BadEncryptedPadding,
            crypto::Error::AuthKeyMismatch { got } => Self::BadAuthKeyId { got },
        }
    }
}
