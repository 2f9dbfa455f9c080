// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The encrypted frame: `auth_key_id + msg_key + AES-IGE ciphertext`,
//! where the plaintext is
//!
//! ```text
//! [ salt ] [ session_id ] [ msg_id ] [ seq_no ] [ length ] [ payload ] [ padding ]
//! [  8   ] [     8      ] [   8    ] [    4   ] [   4    ] [   ...   ] [ 0..15   ]
//! ```
//!
//! and `msg_key` is the middle of the SHA-1 of the plaintext without the
//! padding (the MTProto 1.0 scheme).

use ferrogram_crypto::{calc_msg_key_v1, decrypt_data_v1, encrypt_data_v1, Side};
use ferrogram_tl_types::Serializable;

use crate::errors::FrameError;
use crate::mtp::{Auth, Msg, MsgKind};

// salt + session_id + msg_id + seq_no + length
const ENVELOPE_HEADER_LEN: usize = 8 + 8 + 8 + 4 + 4;

pub(super) fn format(auth: &Auth, msg_id: i64, seq_no: i32, payload: &[u8]) -> Vec<u8> {
    let mut envelope = Vec::with_capacity(ENVELOPE_HEADER_LEN + payload.len());
    auth.salt.serialize(&mut envelope);
    envelope.extend(&auth.session_id);
    msg_id.serialize(&mut envelope);
    seq_no.serialize(&mut envelope);
    (payload.len() as i32).serialize(&mut envelope);
    envelope.extend(payload);

    encrypt_data_v1(&envelope, &auth.key, Side::Client)
}

pub(super) fn parse(auth: &Auth, raw: &[u8]) -> Result<Msg, FrameError> {
    let (plaintext, msg_key) = decrypt_data_v1(raw, &auth.key, Side::Server)?;
    if plaintext.len() < ENVELOPE_HEADER_LEN {
        return Err(FrameError::FrameTooShort {
            len: plaintext.len(),
        });
    }

    let seq_no = i32::from_le_bytes(plaintext[24..28].try_into().unwrap());
    let len = i32::from_le_bytes(plaintext[28..32].try_into().unwrap());
    if len <= 0 {
        return Err(FrameError::BadMessageLength { got: len });
    }
    let len = len as usize;
    if ENVELOPE_HEADER_LEN + len > plaintext.len() {
        return Err(FrameError::TruncatedPayload {
            got: len,
            available: plaintext.len() - ENVELOPE_HEADER_LEN,
        });
    }

    // The message key covers exactly the envelope without its padding.
    if msg_key != calc_msg_key_v1(&plaintext[..ENVELOPE_HEADER_LEN + len]) {
        return Err(FrameError::BadMsgKey);
    }

    let payload = plaintext[ENVELOPE_HEADER_LEN..ENVELOPE_HEADER_LEN + len].to_vec();
    let kind = if seq_no % 2 == 1 {
        MsgKind::Content
    } else {
        MsgKind::Service
    };
    Ok(Msg { payload, kind })
}
