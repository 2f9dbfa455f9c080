// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use crate::sha1;

/// A 256-byte authorization key, the shared secret produced by the
/// Diffie-Hellman handshake, along with the derived identifiers MTProto
/// uses to refer to it.
#[derive(Clone)]
pub struct AuthKey {
    pub(crate) data: [u8; 256],
    pub(crate) aux_hash: [u8; 8],
    pub(crate) key_id: [u8; 8],
}

impl PartialEq for AuthKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_id == other.key_id
    }
}

impl AuthKey {
    /// Wraps raw key material, deriving the auxiliary hash and key
    /// identifier from its SHA-1.
    pub fn from_bytes(data: [u8; 256]) -> Self {
        let sha = sha1!(&data);
        let mut aux_hash = [0; 8];
        aux_hash.copy_from_slice(&sha[0..8]);
        let mut key_id = [0; 8];
        key_id.copy_from_slice(&sha[12..20]);

        Self {
            data,
            aux_hash,
            key_id,
        }
    }

    /// The raw key material, suitable for persisting.
    pub fn to_bytes(&self) -> [u8; 256] {
        self.data
    }

    /// The 8-byte identifier prefixing every encrypted frame.
    pub fn key_id(&self) -> [u8; 8] {
        self.key_id
    }

    /// Computes the `new_nonce_hashN` value the server echoes at the end
    /// of the handshake (`N` is 1 for ok, 2 for retry, 3 for failure).
    pub fn calc_new_nonce_hash(&self, new_nonce: &[u8; 32], number: u8) -> [u8; 16] {
        let mut hash = [0; 16];
        hash.copy_from_slice(&sha1!(new_nonce, [number], self.aux_hash)[4..20]);
        hash
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never log key material.
        f.debug_struct("AuthKey")
            .field("key_id", &u64::from_le_bytes(self.key_id))
            .finish()
    }
}
