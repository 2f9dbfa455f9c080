// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! "Textbook" RSA with the hash-and-pad scheme the key exchange uses to
//! protect `p_q_inner_data`.

use num_bigint::BigUint;

use crate::sha1;

/// A server RSA public key.
#[derive(Clone, Debug)]
pub struct Key {
    n: BigUint,
    e: BigUint,
}

impl Key {
    /// Parses the modulus and public exponent from base-10 strings.
    pub fn new(n: &str, e: &str) -> Option<Self> {
        Some(Self {
            n: BigUint::parse_bytes(n.as_bytes(), 10)?,
            e: BigUint::parse_bytes(e.as_bytes(), 10)?,
        })
    }

    /// Builds a key from big-endian modulus and exponent bytes.
    pub fn from_bytes(n: &[u8], e: &[u8]) -> Self {
        Self {
            n: BigUint::from_bytes_be(n),
            e: BigUint::from_bytes_be(e),
        }
    }

    /// The 64-bit fingerprint the server uses to refer to this key: the
    /// tail of the SHA-1 of the serialized `rsa_public_key n:bytes
    /// e:bytes` constructor body.
    pub fn fingerprint(&self) -> i64 {
        let mut buffer = Vec::new();
        extend_tl_bytes(&mut buffer, &self.n.to_bytes_be());
        extend_tl_bytes(&mut buffer, &self.e.to_bytes_be());

        let sha = sha1!(&buffer);
        i64::from_le_bytes(sha[12..20].try_into().unwrap())
    }
}

/// Appends a length-prefixed, 4-byte-padded byte string, the way the
/// wire codec frames `bytes`.
fn extend_tl_bytes(buffer: &mut Vec<u8>, data: &[u8]) {
    let written = if data.len() < 254 {
        buffer.push(data.len() as u8);
        data.len() + 1
    } else {
        buffer.push(254);
        buffer.extend(&(data.len() as u32).to_le_bytes()[..3]);
        data.len()
    };
    buffer.extend(data);
    buffer.extend(std::iter::repeat(0).take((4 - written % 4) % 4));
}

/// Encrypts `data` as `RSA(SHA1(data) + data + random padding)`, with the
/// padding chosen so the number is exactly 255 bytes long. The result is
/// the usual 256-byte big-endian block.
pub fn encrypt_hashed(data: &[u8], key: &Key, random_bytes: &[u8; 256]) -> Vec<u8> {
    assert!(data.len() <= 255 - 20);

    let padding = 255 - 20 - data.len();
    let payload = {
        let mut buffer = Vec::with_capacity(255);
        buffer.extend(sha1!(data));
        buffer.extend(data);
        buffer.extend(&random_bytes[..padding]);
        buffer
    };

    let ciphertext = BigUint::from_bytes_be(&payload).modpow(&key.e, &key.n);
    let mut block = ciphertext.to_bytes_be();
    while block.len() < 256 {
        block.insert(0, 0);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_key() -> Key {
        // The well-known test-server public key.
        Key::new(
            "25342889448840415564971689590713473206898847759084779052582026594546022463853940585885215951168491965708222649399180603818074200620463776135424884632162512403163793083921641631564740959529419359595852941166848940585952337613333022396096584117954892216031229237302943701877588456738335398602461675225081791820393153757504952636234951323237820036543581047826906120927972487366805292115792231423684261262330394324750785450942589751755390156647751460719351439969059949569615302809050721500330239005077889855323917509948255722081644689442127297605422579707142646660768825302832201908302295573257427896031830742328565032949",
            "65537",
        )
        .unwrap()
    }

    #[test]
    fn fingerprint_matches_advertised_value() {
        // The fingerprint the server actually advertises for this key.
        assert_eq!(get_test_key().fingerprint(), -5595554452916591101);
    }

    #[test]
    fn encrypted_block_shape() {
        let key = get_test_key();
        let data = vec![0x55; 100];
        let block = encrypt_hashed(&data, &key, &[0xaa; 256]);

        assert_eq!(block.len(), 256);
        // Deterministic given fixed padding.
        assert_eq!(block, encrypt_hashed(&data, &key, &[0xaa; 256]));
        // And not the identity.
        assert_ne!(&block[20..120], &data[..]);
    }
}
