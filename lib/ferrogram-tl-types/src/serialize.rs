// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The writing half of the wire codec.

/// Anything implementing this trait can serialize itself according to the
/// [Binary Data Serialization] rules.
///
/// Serialization happens into in-memory buffers and cannot fail.
///
/// [Binary Data Serialization]: https://core.telegram.org/mtproto/serialize
pub trait Serializable {
    /// Serializes the bare body into the given buffer.
    fn serialize(&self, buf: &mut impl Extend<u8>);

    /// Convenience function to serialize the value into a fresh buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.serialize(&mut buffer);
        buffer
    }
}

/// Booleans are serialized boxed:
///
/// * `boolFalse#bc799737 = Bool;`
/// * `boolTrue#997275b5 = Bool;`
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Serializable;
///
/// assert_eq!(true.to_bytes(), [0xb5, 0x75, 0x72, 0x99]);
/// assert_eq!(false.to_bytes(), [0x37, 0x97, 0x79, 0xbc]);
/// ```
impl Serializable for bool {
    #[allow(clippy::unreadable_literal)]
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        if *self { 0x997275b5u32 } else { 0xbc799737u32 }.serialize(buf)
    }
}

/// `int ? = Int;`, little-endian.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Serializable;
///
/// assert_eq!(1i32.to_bytes(), [0x01, 0x00, 0x00, 0x00]);
/// assert_eq!((-1i32).to_bytes(), [0xff, 0xff, 0xff, 0xff]);
/// ```
impl Serializable for i32 {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.to_le_bytes())
    }
}

/// `int ? = Int;`, little-endian. Constructor identifiers use this form.
impl Serializable for u32 {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.to_le_bytes())
    }
}

/// `long ? = Long;`, little-endian.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Serializable;
///
/// assert_eq!(1i64.to_bytes(), [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
/// ```
impl Serializable for i64 {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.to_le_bytes())
    }
}

/// `long ? = Long;`, little-endian, unsigned flavor.
impl Serializable for u64 {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.to_le_bytes())
    }
}

/// `double ? = Double;`, little-endian IEEE 754.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Serializable;
///
/// assert_eq!(1.5f64.to_bytes(), [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf8, 0x3f]);
/// ```
impl Serializable for f64 {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.to_le_bytes())
    }
}

/// `int128 4*[ int ] = Int128;`, a fixed byte run.
impl Serializable for [u8; 16] {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.iter().copied())
    }
}

/// `int256 8*[ int ] = Int256;`, a fixed byte run.
impl Serializable for [u8; 32] {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.iter().copied())
    }
}

/// Byte strings are length-prefixed and zero-padded to 4 bytes: a single
/// length byte when shorter than 254 bytes, or the byte `254` followed by
/// the length in 3 little-endian bytes otherwise.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Serializable;
///
/// assert_eq!(Vec::<u8>::new().to_bytes(), [0x00, 0x00, 0x00, 0x00]);
/// assert_eq!((&[0x7f_u8][..]).to_bytes(), [0x01, 0x7f, 0x00, 0x00]);
/// assert_eq!(
///     (&[0u8; 254][..]).to_bytes()[..8],
///     [0xfe, 0xfe, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
/// );
/// ```
impl Serializable for &[u8] {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let written = if self.len() < 254 {
            buf.extend([self.len() as u8]);
            self.len() + 1
        } else {
            buf.extend([
                254,
                (self.len() & 0xff) as u8,
                ((self.len() >> 8) & 0xff) as u8,
                ((self.len() >> 16) & 0xff) as u8,
            ]);
            self.len()
        };

        buf.extend(self.iter().copied());

        let padding = (4 - written % 4) % 4;
        buf.extend(std::iter::repeat(0).take(padding));
    }
}

/// Same as the `&[u8]` impl; `bytes` fields use this type.
impl Serializable for Vec<u8> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        (&self[..]).serialize(buf)
    }
}

/// `string ? = String;`: UTF-8 bytes with the byte-string framing.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Serializable;
///
/// assert_eq!("US".to_string().to_bytes(), [0x02, b'U', b'S', 0x00]);
/// assert_eq!("Hi!".to_string().to_bytes(), [0x03, b'H', b'i', b'!']);
/// ```
impl Serializable for String {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        self.as_bytes().serialize(buf)
    }
}

/// `Vector t;` in its boxed form: the `vector#1cb5c415` tag, then the item
/// count, then the items.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Serializable;
///
/// assert_eq!(
///     vec![1i32].to_bytes(),
///     [0x15, 0xc4, 0xb5, 0x1c, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
/// );
/// ```
impl<T: Serializable> Serializable for Vec<T> {
    #[allow(clippy::unreadable_literal)]
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        0x1cb5c415u32.serialize(buf);
        (self.len() as i32).serialize(buf);
        for item in self {
            item.serialize(buf);
        }
    }
}

/// `vector t;` in its bare form: the item count, then the items, with no
/// leading tag.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::{RawVec, Serializable};
///
/// assert_eq!(RawVec(vec![1i32]).to_bytes(), [0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
/// ```
impl<T: Serializable> Serializable for crate::RawVec<T> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        (self.0.len() as i32).serialize(buf);
        for item in self.0.iter() {
            item.serialize(buf);
        }
    }
}

/// A blob is written through untouched; the bytes must already be a
/// serialized boxed object.
impl Serializable for crate::Blob {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        buf.extend(self.0.iter().copied())
    }
}
