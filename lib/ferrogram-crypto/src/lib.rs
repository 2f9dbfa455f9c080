// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cryptographic utilities to work with MTProto 1.0 data: AES-IGE, the
//! message-envelope key derivation, RSA with the hash-and-pad scheme of
//! the key exchange, authorization keys, and Pollard-rho factorization.

pub mod aes;
mod auth_key;
pub mod factorize;
pub mod hex;
pub mod rsa;
pub mod sha;

use std::fmt;

pub use auth_key::AuthKey;
use getrandom::getrandom;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The ciphertext is either too small or not padded correctly.
    InvalidBuffer,

    /// The data was keyed by a different authorization key than ours.
    AuthKeyMismatch {
        /// The key identifier found in the data.
        got: i64,
    },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::InvalidBuffer => write!(f, "invalid ciphertext buffer length"),
            Error::AuthKeyMismatch { got } => {
                write!(f, "auth key mismatch, data keyed by {got:x}")
            }
        }
    }
}

/// The direction a message travels in. The envelope key derivation uses a
/// different slice of the authorization key for each direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    // "x = 0 for messages from client to server and x = 8 for those from
    // server to client"
    fn x(&self) -> usize {
        match *self {
            Side::Client => 0,
            Side::Server => 8,
        }
    }
}

/// Derives the `(key, iv)` pair for one message under the MTProto 1.0
/// scheme: four SHA-1 hashes over slices of the authorization key mixed
/// with the message key.
pub fn calc_key_v1(auth_key: &AuthKey, msg_key: &[u8; 16], side: Side) -> ([u8; 32], [u8; 32]) {
    let x = side.x();
    let data = &auth_key.data;

    // sha1_a = SHA1 (msg_key + substr (auth_key, x, 32));
    let sha1_a = sha1!(msg_key, &data[x..x + 32]);
    // sha1_b = SHA1 (substr (auth_key, 32+x, 16) + msg_key + substr (auth_key, 48+x, 16));
    let sha1_b = sha1!(&data[32 + x..32 + x + 16], msg_key, &data[48 + x..48 + x + 16]);
    // sha1_c = SHA1 (substr (auth_key, 64+x, 32) + msg_key);
    let sha1_c = sha1!(&data[64 + x..64 + x + 32], msg_key);
    // sha1_d = SHA1 (msg_key + substr (auth_key, 96+x, 32));
    let sha1_d = sha1!(msg_key, &data[96 + x..96 + x + 32]);

    // aes_key = substr (sha1_a, 0, 8) + substr (sha1_b, 8, 12) + substr (sha1_c, 4, 12);
    let key = {
        let mut buffer = [0; 32];
        buffer[0..8].copy_from_slice(&sha1_a[0..8]);
        buffer[8..20].copy_from_slice(&sha1_b[8..20]);
        buffer[20..32].copy_from_slice(&sha1_c[4..16]);
        buffer
    };

    // aes_iv = substr (sha1_a, 8, 12) + substr (sha1_b, 0, 8)
    //        + substr (sha1_c, 16, 4) + substr (sha1_d, 0, 8);
    let iv = {
        let mut buffer = [0; 32];
        buffer[0..12].copy_from_slice(&sha1_a[8..20]);
        buffer[12..20].copy_from_slice(&sha1_b[0..8]);
        buffer[20..24].copy_from_slice(&sha1_c[16..20]);
        buffer[24..32].copy_from_slice(&sha1_d[0..8]);
        buffer
    };

    (key, iv)
}

/// The 16-byte message key of a plaintext envelope: the middle of its
/// SHA-1, computed before any padding is appended.
pub fn calc_msg_key_v1(plaintext: &[u8]) -> [u8; 16] {
    let mut msg_key = [0; 16];
    msg_key.copy_from_slice(&sha1!(plaintext)[4..20]);
    msg_key
}

// Separated from `encrypt_data_v1` so tests can pin the padding.
fn do_encrypt_data_v1(
    plaintext: &[u8],
    auth_key: &AuthKey,
    side: Side,
    random_padding: &[u8; 16],
) -> Vec<u8> {
    let msg_key = calc_msg_key_v1(plaintext);
    let (key, iv) = calc_key_v1(auth_key, &msg_key, side);

    let mut padded = plaintext.to_vec();
    let padding = (16 - plaintext.len() % 16) % 16;
    padded.extend(&random_padding[..padding]);

    let encrypted = aes::ige_encrypt(&padded, &key, &iv);

    let mut result = Vec::with_capacity(8 + 16 + encrypted.len());
    result.extend(&auth_key.key_id);
    result.extend(&msg_key);
    result.extend(&encrypted);
    result
}

/// Encrypts an envelope plaintext, producing the full
/// `auth_key_id + msg_key + ciphertext` run ready for the wire.
pub fn encrypt_data_v1(plaintext: &[u8], auth_key: &AuthKey, side: Side) -> Vec<u8> {
    let random_padding = {
        let mut buffer = [0; 16];
        getrandom(&mut buffer).expect("failed to generate secure padding");
        buffer
    };
    do_encrypt_data_v1(plaintext, auth_key, side, &random_padding)
}

/// The inverse of [`encrypt_data_v1`], returning the padded plaintext.
///
/// The message key can only be verified once the envelope inside has been
/// parsed (it hashes the plaintext without padding), so that check is the
/// caller's job; compare against [`calc_msg_key_v1`].
pub fn decrypt_data_v1(
    ciphertext: &[u8],
    auth_key: &AuthKey,
    side: Side,
) -> Result<(Vec<u8>, [u8; 16]), Error> {
    if ciphertext.len() < 24 || (ciphertext.len() - 24) % 16 != 0 {
        return Err(Error::InvalidBuffer);
    }

    let key_id = &ciphertext[..8];
    if auth_key.key_id != *key_id {
        return Err(Error::AuthKeyMismatch {
            got: i64::from_le_bytes(key_id.try_into().unwrap()),
        });
    }

    let mut msg_key = [0; 16];
    msg_key.copy_from_slice(&ciphertext[8..24]);

    let (key, iv) = calc_key_v1(auth_key, &msg_key, side);
    let plaintext = aes::ige_decrypt(&ciphertext[24..], &key, &iv);
    Ok((plaintext, msg_key))
}

/// Derives the temporary AES key and initialization vector used to
/// decrypt the server's Diffie-Hellman answer.
pub fn generate_key_data_from_nonce(
    server_nonce: &[u8; 16],
    new_nonce: &[u8; 32],
) -> ([u8; 32], [u8; 32]) {
    let hash1 = sha1!(new_nonce, server_nonce);
    let hash2 = sha1!(server_nonce, new_nonce);
    let hash3 = sha1!(new_nonce, new_nonce);

    // key = hash1 + hash2[:12]
    let key = {
        let mut buffer = [0; 32];
        buffer[..20].copy_from_slice(&hash1);
        buffer[20..].copy_from_slice(&hash2[..12]);
        buffer
    };

    // iv = hash2[12:20] + hash3 + new_nonce[:4]
    let iv = {
        let mut buffer = [0; 32];
        buffer[..8].copy_from_slice(&hash2[12..]);
        buffer[8..28].copy_from_slice(&hash3);
        buffer[28..].copy_from_slice(&new_nonce[..4]);
        buffer
    };

    (key, iv)
}
