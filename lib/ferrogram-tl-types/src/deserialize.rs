// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The reading half of the wire codec.

use std::fmt;

/// The error type for deserialization failures.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The end of the buffer was reached before the value was complete.
    UnexpectedEof,

    /// A boxed value began with a constructor identifier that does not
    /// belong to the expected type.
    UnexpectedConstructor {
        /// The unexpected constructor identifier.
        id: u32,
    },

    /// The buffer contained bytes past the end of a value that was
    /// expected to fill it entirely.
    TrailingBytes {
        /// How many bytes were left over.
        remaining: usize,
    },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UnexpectedEof => write!(f, "unexpected eof"),
            Self::UnexpectedConstructor { id } => write!(f, "unexpected constructor: {id:08x}"),
            Self::TrailingBytes { remaining } => {
                write!(f, "{remaining} trailing bytes after deserialization")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A cursor over an in-memory buffer.
///
/// Restricting reads to byte slices keeps the error surface down to the
/// three cases of [`Error`], so generated code can stay a linear sequence
/// of `?`-propagated reads.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// How many bytes have been consumed so far.
    ///
    /// Callers use this to find where a nested value ended, for example to
    /// hash exactly the bytes that made up an object.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// How many bytes remain unconsumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reads the next constructor identifier without advancing.
    pub fn peek_id(&self) -> Result<u32> {
        match self.buf.get(self.pos..self.pos + 4) {
            Some(bytes) => Ok(u32::from_le_bytes(bytes.try_into().unwrap())),
            None => Err(Error::UnexpectedEof),
        }
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        match self.buf.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                Ok(byte)
            }
            None => Err(Error::UnexpectedEof),
        }
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.buf.get(self.pos..self.pos + buf.len()) {
            Some(bytes) => {
                buf.copy_from_slice(bytes);
                self.pos += buf.len();
                Ok(())
            }
            None => Err(Error::UnexpectedEof),
        }
    }

    /// Consumes and returns everything that is left.
    pub fn read_to_end(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos..];
        self.pos = self.buf.len();
        rest
    }
}

/// Anything implementing this trait can reconstruct itself from its wire
/// form.
pub trait Deserializable {
    /// Deserializes an instance of the type from the cursor.
    fn deserialize(buf: &mut Cursor) -> Result<Self>
    where
        Self: Sized;

    /// Convenience function to deserialize an instance from raw bytes.
    ///
    /// Trailing bytes are not an error here; use this when the value does
    /// not necessarily span the whole buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrogram_tl_types::Deserializable;
    ///
    /// assert_eq!(bool::from_bytes(&[0x37, 0x97, 0x79, 0xbc]).unwrap(), false);
    /// ```
    fn from_bytes(buf: &[u8]) -> Result<Self>
    where
        Self: Sized,
    {
        Self::deserialize(&mut Cursor::from_slice(buf))
    }
}

/// Reads a boxed boolean (`boolTrue`/`boolFalse`).
impl Deserializable for bool {
    #[allow(clippy::unreadable_literal)]
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let id = u32::deserialize(buf)?;
        match id {
            0x997275b5 => Ok(true),
            0xbc799737 => Ok(false),
            _ => Err(Error::UnexpectedConstructor { id }),
        }
    }
}

/// `int ? = Int;`, little-endian.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Deserializable;
///
/// assert_eq!(i32::from_bytes(&[0xff, 0xff, 0xff, 0xff]).unwrap(), -1i32);
/// ```
impl Deserializable for i32 {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let mut bytes = [0; 4];
        buf.read_exact(&mut bytes)?;
        Ok(Self::from_le_bytes(bytes))
    }
}

impl Deserializable for u32 {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let mut bytes = [0; 4];
        buf.read_exact(&mut bytes)?;
        Ok(Self::from_le_bytes(bytes))
    }
}

/// `long ? = Long;`, little-endian.
impl Deserializable for i64 {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let mut bytes = [0; 8];
        buf.read_exact(&mut bytes)?;
        Ok(Self::from_le_bytes(bytes))
    }
}

impl Deserializable for u64 {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let mut bytes = [0; 8];
        buf.read_exact(&mut bytes)?;
        Ok(Self::from_le_bytes(bytes))
    }
}

/// `double ? = Double;`, little-endian IEEE 754.
impl Deserializable for f64 {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let mut bytes = [0; 8];
        buf.read_exact(&mut bytes)?;
        Ok(Self::from_le_bytes(bytes))
    }
}

/// `int128 4*[ int ] = Int128;`.
impl Deserializable for [u8; 16] {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let mut bytes = [0; 16];
        buf.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

/// `int256 8*[ int ] = Int256;`.
impl Deserializable for [u8; 32] {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let mut bytes = [0; 32];
        buf.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

/// Reads a length-prefixed, padded byte string.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Deserializable;
///
/// assert_eq!(Vec::<u8>::from_bytes(&[0x01, 0x7f, 0x00, 0x00]).unwrap(), vec![0x7f_u8]);
/// ```
impl Deserializable for Vec<u8> {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let first = buf.read_byte()?;
        let (len, header) = if first == 254 {
            let mut bytes = [0; 3];
            buf.read_exact(&mut bytes)?;
            (
                bytes[0] as usize | (bytes[1] as usize) << 8 | (bytes[2] as usize) << 16,
                4,
            )
        } else {
            (first as usize, 1)
        };

        let mut result = vec![0; len];
        buf.read_exact(&mut result)?;

        let padding = (4 - (header + len) % 4) % 4;
        let mut dump = [0; 3];
        buf.read_exact(&mut dump[..padding])?;

        Ok(result)
    }
}

/// `string ? = String;`: a byte string decoded as UTF-8, lossily.
impl Deserializable for String {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        Ok(String::from_utf8_lossy(&Vec::<u8>::deserialize(buf)?).into())
    }
}

/// Reads a boxed vector, validating the `vector#1cb5c415` tag.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_types::Deserializable;
///
/// let bytes = [0x15, 0xc4, 0xb5, 0x1c, 0x01, 0x00, 0x00, 0x00, 0x7f, 0x00, 0x00, 0x00];
/// assert_eq!(Vec::<i32>::from_bytes(&bytes).unwrap(), vec![0x7f_i32]);
/// ```
impl<T: Deserializable> Deserializable for Vec<T> {
    #[allow(clippy::unreadable_literal)]
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let id = u32::deserialize(buf)?;
        if id != 0x1cb5c415 {
            return Err(Error::UnexpectedConstructor { id });
        }
        let len = u32::deserialize(buf)?;
        (0..len).map(|_| T::deserialize(buf)).collect()
    }
}

/// Reads a bare vector: no tag, just the count and the items.
impl<T: Deserializable> Deserializable for crate::RawVec<T> {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        let len = u32::deserialize(buf)?;
        Ok(Self(
            (0..len)
                .map(|_| T::deserialize(buf))
                .collect::<Result<_>>()?,
        ))
    }
}

/// A blob swallows everything that remains in the buffer.
impl Deserializable for crate::Blob {
    fn deserialize(buf: &mut Cursor) -> Result<Self> {
        Ok(Self(buf.read_to_end().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Serializable;

    #[test]
    fn read_past_end() {
        assert_eq!(i32::from_bytes(&[0, 0, 0]), Err(Error::UnexpectedEof));
        assert_eq!(
            Vec::<u8>::from_bytes(&[0x02, b'U']),
            Err(Error::UnexpectedEof)
        );
    }

    #[test]
    fn peek_does_not_advance() {
        let bytes = 0x11223344u32.to_bytes();
        let mut cursor = Cursor::from_slice(&bytes);
        assert_eq!(cursor.peek_id(), Ok(0x11223344));
        assert_eq!(cursor.pos(), 0);
        assert_eq!(u32::deserialize(&mut cursor), Ok(0x11223344));
        assert_eq!(cursor.pos(), 4);
    }

    #[test]
    fn long_byte_string_roundtrip() {
        let data = (0..=255u8).cycle().take(300).collect::<Vec<_>>();
        let bytes = data.to_bytes();
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(Vec::<u8>::from_bytes(&bytes).unwrap(), data);
    }

    #[test]
    fn bad_vector_tag() {
        let bytes = [0x00, 0x00, 0x00, 0x00];
        assert_eq!(
            Vec::<i32>::from_bytes(&bytes),
            Err(Error::UnexpectedConstructor { id: 0 })
        );
    }
}
