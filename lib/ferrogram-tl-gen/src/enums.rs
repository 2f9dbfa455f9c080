// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Generation of one `enum` per result type. A type with one constructor
//! still gets a (trivial) enum, so every boxed type reads and writes the
//! same way.

use std::io::{self, Write};

use ferrogram_tl_parser::tl::{Definition, Ty};

use crate::grouper;
use crate::metadata::Metadata;
use crate::rustifier::{rusty_class_name, rusty_namespaced_type_name, rusty_variant_name};
use crate::Config;

/// Writes the `enum` listing every constructor of the type:
///
/// ```ignore
/// pub enum Name {
///     Variant(crate::types::Variant),
/// }
/// ```
fn write_enum<W: Write>(
    file: &mut W,
    indent: &str,
    ty: &Ty,
    metadata: &Metadata,
    config: &Config,
) -> io::Result<()> {
    if config.impl_debug {
        writeln!(file, "{indent}#[derive(Clone, Debug, PartialEq)]")?;
    } else {
        writeln!(file, "{indent}#[derive(Clone, PartialEq)]")?;
    }
    writeln!(file, "{indent}pub enum {} {{", rusty_class_name(&ty.name))?;
    for def in metadata.defs_with_type(ty) {
        let boxed = metadata.is_recursive_def(def);
        writeln!(
            file,
            "{indent}    {}({}{}{}),",
            rusty_variant_name(def),
            if boxed { "Box<" } else { "" },
            rusty_namespaced_type_name(def),
            if boxed { ">" } else { "" },
        )?;
    }
    writeln!(file, "{indent}}}")?;
    Ok(())
}

/// Writes the boxed `impl Serializable`: the variant's constructor
/// identifier, then its bare body.
fn write_serializable<W: Write>(
    file: &mut W,
    indent: &str,
    ty: &Ty,
    metadata: &Metadata,
) -> io::Result<()> {
    writeln!(
        file,
        "{indent}impl crate::Serializable for {} {{",
        rusty_class_name(&ty.name)
    )?;
    writeln!(
        file,
        "{indent}    fn serialize(&self, buf: &mut impl Extend<u8>) {{"
    )?;
    writeln!(file, "{indent}        match self {{")?;
    for def in metadata.defs_with_type(ty) {
        writeln!(
            file,
            "{indent}            Self::{}(x) => {{",
            rusty_variant_name(def)
        )?;
        writeln!(
            file,
            "{indent}                {}::CONSTRUCTOR_ID.serialize(buf);",
            rusty_namespaced_type_name(def)
        )?;
        writeln!(file, "{indent}                x.serialize(buf)")?;
        writeln!(file, "{indent}            }}")?;
    }
    writeln!(file, "{indent}        }}")?;
    writeln!(file, "{indent}    }}")?;
    writeln!(file, "{indent}}}")?;
    Ok(())
}

/// Writes the boxed `impl Deserializable`: reads the identifier, then
/// dispatches to the matching constructor.
fn write_deserializable<W: Write>(
    file: &mut W,
    indent: &str,
    ty: &Ty,
    metadata: &Metadata,
) -> io::Result<()> {
    writeln!(
        file,
        "{indent}impl crate::Deserializable for {} {{",
        rusty_class_name(&ty.name)
    )?;
    writeln!(
        file,
        "{indent}    fn deserialize(buf: &mut crate::Cursor) -> crate::deserialize::Result<Self> {{"
    )?;
    writeln!(file, "{indent}        let id = u32::deserialize(buf)?;")?;
    writeln!(file, "{indent}        Ok(match id {{")?;
    for def in metadata.defs_with_type(ty) {
        let boxed = metadata.is_recursive_def(def);
        writeln!(
            file,
            "{indent}            {}::CONSTRUCTOR_ID => Self::{}({}{}::deserialize(buf)?{}),",
            rusty_namespaced_type_name(def),
            rusty_variant_name(def),
            if boxed { "Box::new(" } else { "" },
            rusty_namespaced_type_name(def),
            if boxed { ")" } else { "" },
        )?;
    }
    writeln!(
        file,
        "{indent}            _ => return Err(crate::deserialize::Error::UnexpectedConstructor {{ id }}),"
    )?;
    writeln!(file, "{indent}        }})")?;
    writeln!(file, "{indent}    }}")?;
    writeln!(file, "{indent}}}")?;
    Ok(())
}

/// Writes a `From<Struct>` conversion for every variant.
fn write_impl_from<W: Write>(
    file: &mut W,
    indent: &str,
    ty: &Ty,
    metadata: &Metadata,
) -> io::Result<()> {
    for def in metadata.defs_with_type(ty) {
        let boxed = metadata.is_recursive_def(def);
        writeln!(
            file,
            "{indent}impl From<{}> for {} {{",
            rusty_namespaced_type_name(def),
            rusty_class_name(&ty.name),
        )?;
        writeln!(
            file,
            "{indent}    fn from(x: {}) -> Self {{",
            rusty_namespaced_type_name(def),
        )?;
        writeln!(
            file,
            "{indent}        Self::{}({}x{})",
            rusty_variant_name(def),
            if boxed { "Box::new(" } else { "" },
            if boxed { ")" } else { "" },
        )?;
        writeln!(file, "{indent}    }}")?;
        writeln!(file, "{indent}}}")?;
    }
    Ok(())
}

/// Writes the whole `enums` module.
pub(crate) fn write_enums_mod<W: Write>(
    file: &mut W,
    definitions: &[Definition],
    metadata: &Metadata,
    config: &Config,
) -> io::Result<()> {
    writeln!(file, "/// Every boxed type as an `enum` over its constructors.")?;
    writeln!(file, "#[allow(clippy::large_enum_variant)]")?;
    writeln!(file, "pub mod enums {{")?;

    for (ns, tys) in grouper::group_types_by_ns(definitions) {
        let indent = if ns.is_empty() {
            writeln!(file, "    #[allow(unused_imports)]")?;
            writeln!(file, "    use crate::{{Deserializable, Identifiable, Serializable}};")?;
            "    "
        } else {
            writeln!(file, "    #[allow(clippy::large_enum_variant)]")?;
            writeln!(file, "    pub mod {ns} {{")?;
            writeln!(file, "        #[allow(unused_imports)]")?;
            writeln!(file, "        use crate::{{Deserializable, Identifiable, Serializable}};")?;
            "        "
        };

        for ty in tys.iter().filter(|ty| !crate::ignore_type(ty)) {
            write_enum(file, indent, ty, metadata, config)?;
            write_serializable(file, indent, ty, metadata)?;
            write_deserializable(file, indent, ty, metadata)?;
            write_impl_from(file, indent, ty, metadata)?;
        }

        if !ns.is_empty() {
            writeln!(file, "    }}")?;
        }
    }

    writeln!(file, "}}")
}
