// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Generation of the `Object` sum covering every constructor in the
//! schema. It acts as the factory for boxed data whose type is unknown
//! until the constructor identifier has been read.

use std::io::{self, Write};

use ferrogram_tl_parser::tl::{Category, Definition};

use crate::rustifier::{rusty_namespaced_type_name, rusty_object_variant_name};
use crate::Config;

fn generated_defs<'a>(definitions: &'a [Definition]) -> impl Iterator<Item = &'a Definition> {
    definitions.iter().filter(|d| !crate::ignore_type(&d.ty))
}

/// Writes the `Object` enum and its impls.
pub(crate) fn write_object_enum<W: Write>(
    file: &mut W,
    definitions: &[Definition],
    config: &Config,
) -> io::Result<()> {
    writeln!(file, "/// Every constructor and function in the schema as one")?;
    writeln!(file, "/// sum, used to read and dispatch boxed objects whose")?;
    writeln!(file, "/// type is not known up front.")?;
    writeln!(file, "#[allow(clippy::large_enum_variant)]")?;
    if config.impl_debug {
        writeln!(file, "#[derive(Clone, Debug, PartialEq)]")?;
    } else {
        writeln!(file, "#[derive(Clone, PartialEq)]")?;
    }
    writeln!(file, "pub enum Object {{")?;
    for def in generated_defs(definitions) {
        writeln!(
            file,
            "    {}({}),",
            rusty_object_variant_name(def),
            rusty_namespaced_type_name(def),
        )?;
    }
    writeln!(file, "}}")?;

    writeln!(file, "#[allow(clippy::unreadable_literal)]")?;
    writeln!(file, "impl Object {{")?;

    writeln!(file, "    /// The constructor identifier of the contained value.")?;
    writeln!(file, "    pub fn constructor_id(&self) -> u32 {{")?;
    writeln!(file, "        use crate::Identifiable;")?;
    writeln!(file, "        match self {{")?;
    for def in generated_defs(definitions) {
        writeln!(
            file,
            "            Self::{}(_) => {}::CONSTRUCTOR_ID,",
            rusty_object_variant_name(def),
            rusty_namespaced_type_name(def),
        )?;
    }
    writeln!(file, "        }}")?;
    writeln!(file, "    }}")?;

    if config.gen_name_for_id {
        writeln!(file, "    /// The schema name of the contained value.")?;
        writeln!(file, "    pub fn name(&self) -> &'static str {{")?;
        writeln!(file, "        name_for_id(self.constructor_id())")?;
        writeln!(file, "    }}")?;
    }

    // Functions are deserializable only when server-side code asks for it.
    writeln!(file, "    /// Reads one boxed object from the cursor. The caller")?;
    writeln!(file, "    /// decides what to make of any leftover bytes.")?;
    writeln!(
        file,
        "    pub fn deserialize(buf: &mut crate::Cursor) -> crate::deserialize::Result<Self> {{"
    )?;
    writeln!(file, "        use crate::{{Deserializable, Identifiable}};")?;
    writeln!(file, "        let id = u32::deserialize(buf)?;")?;
    writeln!(file, "        Ok(match id {{")?;
    for def in generated_defs(definitions)
        .filter(|d| d.category == Category::Types || config.deserializable_functions)
    {
        writeln!(
            file,
            "            {}::CONSTRUCTOR_ID => Self::{}({}::deserialize(buf)?),",
            rusty_namespaced_type_name(def),
            rusty_object_variant_name(def),
            rusty_namespaced_type_name(def),
        )?;
    }
    writeln!(
        file,
        "            _ => return Err(crate::deserialize::Error::UnexpectedConstructor {{ id }}),"
    )?;
    writeln!(file, "        }})")?;
    writeln!(file, "    }}")?;

    writeln!(file, "    /// Reads one boxed object spanning the whole buffer.")?;
    writeln!(
        file,
        "    pub fn from_bytes(buf: &[u8]) -> crate::deserialize::Result<Self> {{"
    )?;
    writeln!(file, "        let mut cursor = crate::Cursor::from_slice(buf);")?;
    writeln!(file, "        let object = Self::deserialize(&mut cursor)?;")?;
    writeln!(file, "        if cursor.remaining() != 0 {{")?;
    writeln!(
        file,
        "            return Err(crate::deserialize::Error::TrailingBytes {{ remaining: cursor.remaining() }});"
    )?;
    writeln!(file, "        }}")?;
    writeln!(file, "        Ok(object)")?;
    writeln!(file, "    }}")?;
    writeln!(file, "}}")?;

    // Functions already serialize their own identifier.
    writeln!(file, "impl crate::Serializable for Object {{")?;
    writeln!(file, "    fn serialize(&self, buf: &mut impl Extend<u8>) {{")?;
    writeln!(file, "        use crate::{{Identifiable, Serializable}};")?;
    writeln!(file, "        match self {{")?;
    for def in generated_defs(definitions) {
        match def.category {
            Category::Types => {
                writeln!(
                    file,
                    "            Self::{}(x) => {{",
                    rusty_object_variant_name(def)
                )?;
                writeln!(
                    file,
                    "                {}::CONSTRUCTOR_ID.serialize(buf);",
                    rusty_namespaced_type_name(def)
                )?;
                writeln!(file, "                x.serialize(buf)")?;
                writeln!(file, "            }}")?;
            }
            Category::Functions => {
                writeln!(
                    file,
                    "            Self::{}(x) => x.serialize(buf),",
                    rusty_object_variant_name(def)
                )?;
            }
        }
    }
    writeln!(file, "        }}")?;
    writeln!(file, "    }}")?;
    writeln!(file, "}}")?;

    for def in generated_defs(definitions) {
        writeln!(
            file,
            "impl From<{}> for Object {{",
            rusty_namespaced_type_name(def)
        )?;
        writeln!(
            file,
            "    fn from(x: {}) -> Self {{",
            rusty_namespaced_type_name(def)
        )?;
        writeln!(file, "        Self::{}(x)", rusty_object_variant_name(def))?;
        writeln!(file, "    }}")?;
        writeln!(file, "}}")?;
    }

    Ok(())
}
