// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Rust definitions for the schema [`types`], [`functions`] and boxed
//! [`enums`], generated at build time from the `tl/*.tl` files, together
//! with the wire codec they are built on.
//!
//! Every generated item implements [`Serializable`]; types additionally
//! implement [`Deserializable`]. The [`Object`] sum covers every known
//! constructor and acts as the factory for incoming boxed data.
//!
//! # Features
//!
//! * `tl-api`: generate code for `tl/api.tl` (on by default).
//! * `tl-mtproto`: generate code for `tl/mtproto.tl`, which low-level
//!   protocol code such as the key exchange needs (on by default).
//! * `deserializable-functions`: also implement [`Deserializable`] for
//!   [`functions`], which only servers (and tests) need.
//! * `impl-debug`: derive `Debug` for the generated code (on by default).

pub mod deserialize;
mod generated;
pub mod serialize;

pub use deserialize::{Cursor, Deserializable};
pub use generated::{enums, functions, name_for_id, types, Object, LAYER};
pub use serialize::Serializable;

/// The concrete, bare form of a vector (`vector` rather than `Vector`): a
/// count followed by the items, with no leading constructor tag.
#[derive(Clone, Debug, PartialEq)]
pub struct RawVec<T>(pub Vec<T>);

/// An unparsed run of bytes holding some serialized boxed object.
///
/// Fields whose schema type is a generic parameter (`!X`) or the catch-all
/// `Object` carry one of these: the bytes pass through (de)serialization
/// without interpretation.
#[derive(Clone, Debug, PartialEq)]
pub struct Blob(pub Vec<u8>);

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Anything with a constructor identifier known to both ends of the
/// connection.
pub trait Identifiable {
    /// The unique identifier of the constructor.
    const CONSTRUCTOR_ID: u32;
}

/// Marks a function as invocable and names the type of its reply.
pub trait RemoteCall: Serializable {
    /// The type of the value the other end answers with.
    type Return: Deserializable;
}
