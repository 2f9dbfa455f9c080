// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Turns parsed [Type Language] definitions into Rust code: a `struct`
//! per constructor, an `enum` per boxed type, and the `Object` sum that
//! works as a factory keyed on constructor identifiers.
//!
//! The output is meant to be written into `OUT_DIR` by a build script and
//! `include!`d by the crate that owns the schema files.
//!
//! [Type Language]: https://core.telegram.org/mtproto/TL

#![deny(unsafe_code)]

mod enums;
mod grouper;
mod metadata;
mod objects;
mod rustifier;
mod structs;

use std::io::{self, Write};

use ferrogram_tl_parser::tl::{Category, Definition, Ty};

/// What to generate besides the structs and enums themselves.
pub struct Config {
    /// Generate the `name_for_id` registry mapping identifiers back to
    /// their schema names.
    pub gen_name_for_id: bool,

    /// Generate the `Object` sum over every constructor.
    pub gen_object_enum: bool,

    /// Implement `Deserializable` for functions too. Only code that reads
    /// requests (servers, tests) wants this.
    pub deserializable_functions: bool,

    /// Derive `Debug` for the generated items.
    pub impl_debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gen_name_for_id: false,
            gen_object_enum: false,
            deserializable_functions: false,
            impl_debug: true,
        }
    }
}

/// `Bool` is special-cased as Rust's `bool` and gets no generated code.
const SPECIAL_CASED_TYPES: [&str; 1] = ["Bool"];

pub(crate) fn ignore_type(ty: &Ty) -> bool {
    SPECIAL_CASED_TYPES.iter().any(|&special| special == ty.name)
}

/// Writes the Rust code for the given definitions into `file`.
pub fn generate_rust_code<W: Write>(
    file: &mut W,
    definitions: &[Definition],
    layer: i32,
    config: &Config,
) -> io::Result<()> {
    writeln!(
        file,
        "/// The schema layer from which the definitions were generated."
    )?;
    writeln!(file, "pub const LAYER: i32 = {layer};")?;

    if config.gen_name_for_id {
        write_name_for_id(file, definitions)?;
    }

    let metadata = metadata::Metadata::new(definitions);
    structs::write_category_mod(file, Category::Types, definitions, &metadata, config)?;
    structs::write_category_mod(file, Category::Functions, definitions, &metadata, config)?;
    enums::write_enums_mod(file, definitions, &metadata, config)?;

    if config.gen_object_enum {
        objects::write_object_enum(file, definitions, config)?;
    }

    Ok(())
}

/// Writes the registry mapping constructor identifiers back to schema
/// names, mainly for logging. It is scoped to the generated module, so
/// code generated from other schemas can coexist.
fn write_name_for_id<W: Write>(file: &mut W, definitions: &[Definition]) -> io::Result<()> {
    writeln!(
        file,
        "/// Returns the schema name of the constructor with the given identifier."
    )?;
    writeln!(file, "#[allow(clippy::unreadable_literal)]")?;
    writeln!(file, "pub fn name_for_id(id: u32) -> &'static str {{")?;
    writeln!(file, "    match id {{")?;
    writeln!(file, "        0x1cb5c415 => \"vector\",")?;
    for def in definitions {
        writeln!(file, "        {:#x} => \"{}\",", def.id, def.full_name())?;
    }
    writeln!(file, "        _ => \"(unknown)\",")?;
    writeln!(file, "    }}")?;
    writeln!(file, "}}")?;
    Ok(())
}
