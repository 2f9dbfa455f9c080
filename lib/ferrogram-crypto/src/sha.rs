// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Computes the SHA-1 of the concatenation of the arguments, as a
/// `[u8; 20]`.
///
/// # Examples
///
/// ```
/// use ferrogram_crypto::sha1;
///
/// let hash = sha1!(b"hello", b" ", b"world");
/// assert_eq!(hash[..4], [0x2a, 0xae, 0x6c, 0x35]);
/// ```
#[macro_export]
macro_rules! sha1 {
    ( $( $x:expr ),+ $(,)? ) => {{
        use sha1::Digest;
        let mut hasher = sha1::Sha1::new();
        $( hasher.update($x); )+
        let hash: [u8; 20] = hasher.finalize().into();
        hash
    }};
}
