// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The unencrypted frame used before the handshake completes:
//!
//! ```text
//! [auth_key_id = 0] [   msg_id   ] [ length ] [ payload... ]
//! [    8 bytes    ] [  8 bytes   ] [ 4 bytes] [   ...      ]
//! ```

use ferrogram_tl_types::Serializable;

use crate::errors::FrameError;
use crate::mtp::Msg;

pub(super) fn format(msg_id: i64, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 8 + 4 + payload.len());
    0i64.serialize(&mut buf);
    msg_id.serialize(&mut buf);
    (payload.len() as i32).serialize(&mut buf);
    buf.extend(payload);
    buf
}

/// The caller has already checked the minimum length and that
/// `auth_key_id` is zero.
pub(super) fn parse(raw: &[u8]) -> Result<Msg, FrameError> {
    let len = i32::from_le_bytes(raw[16..20].try_into().unwrap());
    if len <= 0 {
        return Err(FrameError::BadMessageLength { got: len });
    }
    let len = len as usize;
    if 20 + len > raw.len() {
        return Err(FrameError::TruncatedPayload {
            got: len,
            available: raw.len() - 20,
        });
    }

    // Anything travelling unencrypted belongs to the key exchange.
    Ok(Msg::key_ex(raw[20..20 + len].to_vec()))
}
