// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! AES-256 in Infinite Garble Extension mode, composed from the plain
//! block cipher. The mode chains both the previous ciphertext and the
//! previous plaintext block into every block.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

/// Encrypts the plaintext with AES-IGE. The input length must be a
/// multiple of 16.
pub fn ige_encrypt(plaintext: &[u8], key: &[u8; 32], iv: &[u8; 32]) -> Vec<u8> {
    assert!(plaintext.len() % 16 == 0);

    let cipher = aes::Aes256::new(GenericArray::from_slice(key));
    let mut ciphertext = vec![0; plaintext.len()];

    let mut prev_cipher = [0; 16];
    let mut prev_plain = [0; 16];
    prev_cipher.copy_from_slice(&iv[..16]);
    prev_plain.copy_from_slice(&iv[16..]);

    for (plain_block, cipher_block) in plaintext.chunks(16).zip(ciphertext.chunks_mut(16)) {
        // block = encrypt(plaintext XOR prev_cipher) XOR prev_plain
        cipher_block
            .iter_mut()
            .zip(plain_block)
            .zip(prev_cipher)
            .for_each(|((c, p), x)| *c = p ^ x);

        cipher.encrypt_block(GenericArray::from_mut_slice(cipher_block));

        cipher_block
            .iter_mut()
            .zip(prev_plain)
            .for_each(|(c, x)| *c ^= x);

        prev_cipher.copy_from_slice(cipher_block);
        prev_plain.copy_from_slice(plain_block);
    }

    ciphertext
}

/// Decrypts AES-IGE ciphertext. The input length must be a multiple
/// of 16.
pub fn ige_decrypt(ciphertext: &[u8], key: &[u8; 32], iv: &[u8; 32]) -> Vec<u8> {
    assert!(ciphertext.len() % 16 == 0);

    let cipher = aes::Aes256::new(GenericArray::from_slice(key));
    let mut plaintext = vec![0; ciphertext.len()];

    let mut prev_cipher = [0; 16];
    let mut prev_plain = [0; 16];
    prev_cipher.copy_from_slice(&iv[..16]);
    prev_plain.copy_from_slice(&iv[16..]);

    for (cipher_block, plain_block) in ciphertext.chunks(16).zip(plaintext.chunks_mut(16)) {
        // block = decrypt(ciphertext XOR prev_plain) XOR prev_cipher
        plain_block
            .iter_mut()
            .zip(cipher_block)
            .zip(prev_plain)
            .for_each(|((p, c), x)| *p = c ^ x);

        cipher.decrypt_block(GenericArray::from_mut_slice(plain_block));

        plain_block
            .iter_mut()
            .zip(prev_cipher)
            .for_each(|(p, x)| *p ^= x);

        prev_cipher.copy_from_slice(cipher_block);
        prev_plain.copy_from_slice(plain_block);
    }

    plaintext
}
