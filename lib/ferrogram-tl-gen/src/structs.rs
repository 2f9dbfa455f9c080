// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Generation of one `struct` per definition, along with its trait impls.

use std::io::{self, Write};

use ferrogram_tl_parser::tl::{Category, Definition, ParameterType};

use crate::grouper;
use crate::metadata::Metadata;
use crate::rustifier::{
    rusty_attr_name, rusty_class_name, rusty_type, rusty_type_name, rusty_type_path,
};
use crate::Config;

/// Writes the `struct` definition itself:
///
/// ```ignore
/// pub struct Name {
///     pub field: Type,
/// }
/// ```
///
/// Flags parameters are omitted; their value is recomputed from the
/// fields that depend on them.
fn write_struct<W: Write>(
    file: &mut W,
    indent: &str,
    def: &Definition,
    config: &Config,
) -> io::Result<()> {
    if config.impl_debug {
        writeln!(file, "{indent}#[derive(Clone, Debug, PartialEq)]")?;
    } else {
        writeln!(file, "{indent}#[derive(Clone, PartialEq)]")?;
    }
    writeln!(file, "{indent}pub struct {} {{", rusty_class_name(&def.name))?;
    for param in def.params.iter() {
        match param.ty {
            // Not stored; see above.
            ParameterType::Flags => {}
            ParameterType::Normal { .. } => {
                writeln!(
                    file,
                    "{indent}    pub {}: {},",
                    rusty_attr_name(param),
                    rusty_type_name(param)
                )?;
            }
        }
    }
    writeln!(file, "{indent}}}")?;
    Ok(())
}

/// Writes the corresponding `impl Identifiable`.
fn write_identifiable<W: Write>(file: &mut W, indent: &str, def: &Definition) -> io::Result<()> {
    writeln!(
        file,
        "{indent}impl crate::Identifiable for {} {{",
        rusty_class_name(&def.name)
    )?;
    writeln!(file, "{indent}    const CONSTRUCTOR_ID: u32 = {:#x};", def.id)?;
    writeln!(file, "{indent}}}")?;
    Ok(())
}

/// Writes the corresponding `impl Serializable`: every field in
/// declaration order, conditionals present only when their bit is set,
/// and a leading constructor identifier for functions (which are only
/// ever boxed).
fn write_serializable<W: Write>(
    file: &mut W,
    indent: &str,
    def: &Definition,
    _metadata: &Metadata,
) -> io::Result<()> {
    writeln!(
        file,
        "{indent}impl crate::Serializable for {} {{",
        rusty_class_name(&def.name)
    )?;

    let uses_buf = def.category == Category::Functions || !def.params.is_empty();
    writeln!(
        file,
        "{indent}    fn serialize(&self, {}buf: &mut impl Extend<u8>) {{",
        if uses_buf { "" } else { "_" },
    )?;

    if def.category == Category::Functions {
        writeln!(file, "{indent}        Self::CONSTRUCTOR_ID.serialize(buf);")?;
    }

    for param in def.params.iter() {
        match &param.ty {
            ParameterType::Flags => {
                // The flags value is the OR of every bit whose gated field
                // is present.
                write!(file, "{indent}        (0u32")?;
                for p in def.params.iter() {
                    if let ParameterType::Normal {
                        ty,
                        flag: Some(flag),
                    } = &p.ty
                    {
                        if flag.name == param.name {
                            write!(
                                file,
                                " | if self.{}{} {{ {} }} else {{ 0 }}",
                                rusty_attr_name(p),
                                if ty.name == "true" { "" } else { ".is_some()" },
                                1u32 << flag.index,
                            )?;
                        }
                    }
                }
                writeln!(file, ").serialize(buf);")?;
            }
            ParameterType::Normal { ty, flag } => {
                // Presence bits serialize through the flags value alone.
                if ty.name == "true" {
                    continue;
                }
                if flag.is_some() {
                    writeln!(
                        file,
                        "{indent}        if let Some(ref x) = self.{} {{",
                        rusty_attr_name(param)
                    )?;
                    writeln!(file, "{indent}            x.serialize(buf);")?;
                    writeln!(file, "{indent}        }}")?;
                } else {
                    writeln!(
                        file,
                        "{indent}        self.{}.serialize(buf);",
                        rusty_attr_name(param)
                    )?;
                }
            }
        }
    }

    writeln!(file, "{indent}    }}")?;
    writeln!(file, "{indent}}}")?;
    Ok(())
}

/// Writes the corresponding `impl Deserializable`: the exact mirror of
/// serialization.
fn write_deserializable<W: Write>(
    file: &mut W,
    indent: &str,
    def: &Definition,
    metadata: &Metadata,
) -> io::Result<()> {
    writeln!(
        file,
        "{indent}impl crate::Deserializable for {} {{",
        rusty_class_name(&def.name)
    )?;
    writeln!(
        file,
        "{indent}    fn deserialize({}buf: &mut crate::Cursor) -> crate::deserialize::Result<Self> {{",
        if def.params.is_empty() { "_" } else { "" },
    )?;

    for (i, param) in def.params.iter().enumerate() {
        match &param.ty {
            ParameterType::Flags => {
                let unused = metadata.is_unused_flag(def, param);
                writeln!(
                    file,
                    "{indent}        let {}{} = u32::deserialize(buf)?;",
                    if unused { "_" } else { "" },
                    rusty_attr_name(param)
                )?;
            }
            ParameterType::Normal { ty, flag } => {
                if ty.name == "true" {
                    // Guaranteed by the parser.
                    let flag = flag.as_ref().unwrap();
                    writeln!(
                        file,
                        "{indent}        let {} = ({} & {}) != 0;",
                        rusty_attr_name(param),
                        flag.name,
                        1u32 << flag.index,
                    )?;
                    continue;
                }

                write!(file, "{indent}        let {} = ", rusty_attr_name(param))?;
                if let Some(flag) = flag {
                    writeln!(file, "if ({} & {}) != 0 {{", flag.name, 1u32 << flag.index)?;
                    write!(file, "{indent}            Some(")?;
                }
                if (ty.generic_ref || ty.name == "Object") && i != def.params.len() - 1 {
                    // A blob has no length marker, so there is no way to
                    // know where it ends unless it is the last field.
                    write!(
                        file,
                        "unimplemented!(\"cannot read a blob in the middle of a definition\")"
                    )?;
                } else {
                    write!(file, "{}::deserialize(buf)?", rusty_type_path(param))?;
                }
                if flag.is_some() {
                    writeln!(file, ")")?;
                    writeln!(file, "{indent}        }} else {{")?;
                    writeln!(file, "{indent}            None")?;
                    write!(file, "{indent}        }}")?;
                }
                writeln!(file, ";")?;
            }
        }
    }

    writeln!(file, "{indent}        Ok(Self {{")?;
    for param in def.params.iter() {
        match &param.ty {
            ParameterType::Flags => {}
            ParameterType::Normal { .. } => {
                writeln!(file, "{indent}            {},", rusty_attr_name(param))?;
            }
        }
    }
    writeln!(file, "{indent}        }})")?;
    writeln!(file, "{indent}    }}")?;
    writeln!(file, "{indent}}}")?;
    Ok(())
}

/// Writes the corresponding `impl RemoteCall` naming the reply type.
fn write_remote_call<W: Write>(file: &mut W, indent: &str, def: &Definition) -> io::Result<()> {
    writeln!(
        file,
        "{indent}impl crate::RemoteCall for {} {{",
        rusty_class_name(&def.name)
    )?;
    writeln!(file, "{indent}    type Return = {};", rusty_type(&def.ty))?;
    writeln!(file, "{indent}}}")?;
    Ok(())
}

/// Writes a whole definition: `struct` plus every impl it gets.
fn write_definition<W: Write>(
    file: &mut W,
    indent: &str,
    def: &Definition,
    metadata: &Metadata,
    config: &Config,
) -> io::Result<()> {
    write_struct(file, indent, def, config)?;
    write_identifiable(file, indent, def)?;
    write_serializable(file, indent, def, metadata)?;
    if def.category == Category::Types || config.deserializable_functions {
        write_deserializable(file, indent, def, metadata)?;
    }
    if def.category == Category::Functions {
        write_remote_call(file, indent, def)?;
    }
    Ok(())
}

/// Writes the `types` or `functions` module for the given category.
pub(crate) fn write_category_mod<W: Write>(
    file: &mut W,
    category: Category,
    definitions: &[Definition],
    metadata: &Metadata,
    config: &Config,
) -> io::Result<()> {
    match category {
        Category::Types => {
            writeln!(file, "/// Every type constructor as a bare `struct`.")?;
            writeln!(
                file,
                "#[allow(clippy::cognitive_complexity, clippy::identity_op, clippy::unreadable_literal)]"
            )?;
            writeln!(file, "pub mod types {{")?;
        }
        Category::Functions => {
            writeln!(file, "/// Every function as a `struct`; the associated")?;
            writeln!(file, "/// `RemoteCall::Return` names its reply type.")?;
            writeln!(
                file,
                "#[allow(clippy::cognitive_complexity, clippy::identity_op, clippy::unreadable_literal)]"
            )?;
            writeln!(file, "pub mod functions {{")?;
        }
    }

    for (ns, defs) in grouper::group_by_ns(definitions, category) {
        let indent = if ns.is_empty() {
            writeln!(file, "    #[allow(unused_imports)]")?;
            writeln!(
                file,
                "    use crate::{{Deserializable, Identifiable, Serializable}};"
            )?;
            "    "
        } else {
            writeln!(file, "    pub mod {ns} {{")?;
            writeln!(file, "        #[allow(unused_imports)]")?;
            writeln!(
                file,
                "        use crate::{{Deserializable, Identifiable, Serializable}};"
            )?;
            "        "
        };

        for def in defs.iter().filter(|d| !crate::ignore_type(&d.ty)) {
            write_definition(file, indent, def, metadata, config)?;
        }

        if !ns.is_empty() {
            writeln!(file, "    }}")?;
        }
    }

    writeln!(file, "}}")
}
