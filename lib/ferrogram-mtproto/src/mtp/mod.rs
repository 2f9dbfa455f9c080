// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The message envelope of the protocol.
//!
//! Before the handshake completes, payloads travel in [unencrypted
//! frames]; afterwards every frame is encrypted under the authorization
//! key. The [`Framer`] owns the key (once installed) and the
//! `msg_id`/`seq_no` counters, so a session needs exactly one.
//!
//! [unencrypted frames]: https://core.telegram.org/mtproto/description#unencrypted-message

mod encrypted;
mod plain;

use std::time::{SystemTime, UNIX_EPOCH};

use ferrogram_crypto::AuthKey;

use crate::errors::FrameError;
use crate::handshake::AuthResult;

/// Whether a message counts towards the content sequence.
///
/// Handshake and service traffic uses the non-content numbering; anything
/// the user asked to send is content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsgKind {
    Content,
    KeyEx,
    Service,
}

impl MsgKind {
    fn content_related(&self) -> bool {
        matches!(self, MsgKind::Content)
    }
}

/// One message: a serialized boxed object and its kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Msg {
    pub payload: Vec<u8>,
    pub kind: MsgKind,
}

impl Msg {
    pub fn content(payload: Vec<u8>) -> Self {
        Self {
            payload,
            kind: MsgKind::Content,
        }
    }

    pub fn key_ex(payload: Vec<u8>) -> Self {
        Self {
            payload,
            kind: MsgKind::KeyEx,
        }
    }

    pub fn service(payload: Vec<u8>) -> Self {
        Self {
            payload,
            kind: MsgKind::Service,
        }
    }
}

/// Credentials shared with the server after a completed handshake.
struct Auth {
    key: AuthKey,
    salt: i64,
    session_id: [u8; 8],
}

/// Produces and parses message frames.
///
/// Frames are unencrypted until [`Framer::install_auth`] hands over the
/// key produced by the handshake; from then on, every outgoing frame is
/// encrypted and every incoming frame must be keyed by the same key.
pub struct Framer {
    auth: Option<Auth>,
    time_offset: i32,
    sequence: i32,
    last_msg_id: i64,
    msg_counter: u32,
}

impl Framer {
    pub fn new() -> Self {
        Self {
            auth: None,
            time_offset: 0,
            sequence: 0,
            last_msg_id: 0,
            msg_counter: 0,
        }
    }

    /// Installs the handshake product, switching the framer to encrypted
    /// mode and adopting the server's clock offset.
    pub fn install_auth(&mut self, auth: &AuthResult) {
        self.time_offset = auth.time_offset;
        self.auth = Some(Auth {
            key: auth.auth_key.clone(),
            salt: auth.server_salt,
            session_id: auth.session_id,
        });
    }

    /// Whether an authorization key has been installed.
    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// Wraps a message into a frame ready for the transport, encrypted
    /// exactly when an authorization key is installed.
    pub fn format(&mut self, msg: &Msg) -> Vec<u8> {
        let msg_id = self.next_msg_id();
        let seq_no = self.next_seq_no(msg.kind.content_related());
        match &self.auth {
            None => plain::format(msg_id, &msg.payload),
            Some(auth) => encrypted::format(auth, msg_id, seq_no, &msg.payload),
        }
    }

    /// The inverse of [`Framer::format`] for incoming data.
    pub fn parse(&self, raw: &[u8]) -> Result<Msg, FrameError> {
        if raw.len() == 4 {
            // A bare error code instead of a frame.
            let code = i32::from_le_bytes(raw.try_into().unwrap());
            return Err(FrameError::TransportCode { code });
        }
        if raw.len() < 20 {
            return Err(FrameError::FrameTooShort { len: raw.len() });
        }

        let auth_key_id = i64::from_le_bytes(raw[..8].try_into().unwrap());
        if auth_key_id == 0 {
            plain::parse(raw)
        } else {
            match &self.auth {
                Some(auth) => encrypted::parse(auth, raw),
                None => Err(FrameError::MissingAuthKey),
            }
        }
    }

    /// Generates the next message identifier: unix seconds (on the
    /// server's clock) in the high 32 bits, a 22-bit counter below, and
    /// the low two bits zero to mark a client message.
    fn next_msg_id(&mut self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time is before epoch");

        let seconds = now.as_secs() as i64 + self.time_offset as i64;
        let counter = (self.msg_counter & 0x3f_ffff) as i64;
        self.msg_counter = self.msg_counter.wrapping_add(1);

        let mut msg_id = (seconds << 32) | (counter << 2);
        if msg_id <= self.last_msg_id {
            msg_id = self.last_msg_id + 4;
        }
        self.last_msg_id = msg_id;
        msg_id
    }

    /// Generates the next sequence number. Content messages are numbered
    /// `2n+1` and bump the counter; everything else gets `2n`.
    fn next_seq_no(&mut self, content_related: bool) -> i32 {
        if content_related {
            let seq_no = self.sequence * 2 + 1;
            self.sequence += 1;
            seq_no
        } else {
            self.sequence * 2
        }
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}
