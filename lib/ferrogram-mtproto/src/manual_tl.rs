// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Hand-written support for the few constructors that cannot be
//! generated, because their payload is not plain TL data.

use std::io::{self, Write};

use flate2::write::GzDecoder;

use ferrogram_tl_types::{deserialize, Cursor, Deserializable};

/// `gzip_packed#3072cfa1 packed_data:bytes = Object;`
///
/// The server is free to wrap any object in one of these; the packed
/// data is the gzip of the boxed object it stands for.
pub struct GzipPacked {
    pub packed_data: Vec<u8>,
}

impl GzipPacked {
    pub const CONSTRUCTOR_ID: u32 = 0x3072cfa1;

    /// Whether the boxed object in `body` is a `gzip_packed`.
    pub fn is_gzipped(body: &[u8]) -> bool {
        body.len() >= 4
            && u32::from_le_bytes(body[..4].try_into().unwrap()) == Self::CONSTRUCTOR_ID
    }

    /// Reads the boxed `gzip_packed` wrapper, without decompressing.
    pub fn from_bytes(body: &[u8]) -> deserialize::Result<Self> {
        let mut cursor = Cursor::from_slice(body);
        let id = u32::deserialize(&mut cursor)?;
        if id != Self::CONSTRUCTOR_ID {
            return Err(deserialize::Error::UnexpectedConstructor { id });
        }
        Ok(Self {
            packed_data: Vec::<u8>::deserialize(&mut cursor)?,
        })
    }

    /// Decompresses the wrapped object back into its boxed form.
    pub fn decompress(&self) -> io::Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(Vec::new());
        decoder.write_all(&self.packed_data)?;
        decoder.finish()
    }
}
