// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Helpers to turn schema names into Rust names.
//!
//! These conventions are purely cosmetic for humans reading the generated
//! code; nothing on the wire depends on them.

use ferrogram_tl_parser::tl::{Definition, Parameter, ParameterType, Ty};

/// Converts a schema name into a Rust type name: `CamelCase`, with
/// underscores and dots eaten, and runs of capitals collapsed
/// (`resPQ` becomes `ResPq`, `p_q_inner_data` becomes `PQInnerData`).
pub(crate) fn rusty_class_name(name: &str) -> String {
    enum Casing {
        Upper,
        Lower,
        Keep,
    }

    let name = match name.rfind('.') {
        Some(pos) => &name[pos + 1..],
        None => name,
    };

    let mut result = String::with_capacity(name.len());
    let mut casing = Casing::Upper;
    for c in name.chars() {
        if c == '_' {
            casing = Casing::Upper;
            continue;
        }
        casing = match casing {
            Casing::Upper => {
                result.push(c.to_ascii_uppercase());
                Casing::Lower
            }
            Casing::Lower => {
                result.push(c.to_ascii_lowercase());
                if c.is_ascii_uppercase() {
                    Casing::Lower
                } else {
                    Casing::Keep
                }
            }
            Casing::Keep => {
                result.push(c);
                if c.is_ascii_uppercase() {
                    Casing::Lower
                } else {
                    Casing::Keep
                }
            }
        };
    }
    result
}

/// The full path to the Rust item for a type reference: bare types live in
/// `crate::types`, boxed ones in `crate::enums`.
pub(crate) fn rusty_namespaced_class_name(ty: &Ty) -> String {
    let mut result = String::new();
    result.push_str(if ty.bare {
        "crate::types::"
    } else {
        "crate::enums::"
    });
    for ns in ty.namespace.iter() {
        result.push_str(ns);
        result.push_str("::");
    }
    result.push_str(&rusty_class_name(&ty.name));
    result
}

/// The full path to the `struct` generated for a definition.
pub(crate) fn rusty_namespaced_type_name(def: &Definition) -> String {
    let mut result = String::from(match def.category {
        ferrogram_tl_parser::tl::Category::Types => "crate::types::",
        ferrogram_tl_parser::tl::Category::Functions => "crate::functions::",
    });
    for ns in def.namespace.iter() {
        result.push_str(ns);
        result.push_str("::");
    }
    result.push_str(&rusty_class_name(&def.name));
    result
}

/// The enum variant name for a definition, with the redundant type-name
/// prefix removed (`server_DH_params_ok` under `Server_DH_Params` becomes
/// just `Ok`).
pub(crate) fn rusty_variant_name(def: &Definition) -> String {
    let name = rusty_class_name(&def.name);
    let ty_name = rusty_class_name(&def.ty.name);

    let variant = match name.strip_prefix(&ty_name) {
        Some(rest) => rest,
        None => &name,
    };

    match variant {
        // The whole name was the prefix; fall back to its last word.
        "" => {
            let pos = name
                .bytes()
                .rposition(|c| c.is_ascii_uppercase())
                .unwrap_or(0);
            &name[pos..]
        }
        // `Self` cannot name a variant; use the two last words instead.
        "Self" => {
            let pos = name
                .bytes()
                .take(name.len() - variant.len())
                .rposition(|c| c.is_ascii_uppercase())
                .unwrap_or(0);
            &name[pos..]
        }
        _ => variant,
    }
    .to_string()
}

/// The variant name a definition gets in the `Object` sum: the namespace
/// flattened in by concatenation.
pub(crate) fn rusty_object_variant_name(def: &Definition) -> String {
    let mut result = String::new();
    for ns in def.namespace.iter() {
        result.push_str(&rusty_class_name(ns));
    }
    result.push_str(&rusty_class_name(&def.name));
    result
}

/// The field name for a parameter, escaping reserved words.
pub(crate) fn rusty_attr_name(param: &Parameter) -> String {
    match &param.name[..] {
        "final" => "r#final".into(),
        "loop" => "r#loop".into(),
        "self" => "is_self".into(),
        "static" => "r#static".into(),
        "type" => "r#type".into(),
        name => name.into(),
    }
}

/// The builtin Rust type for a primitive schema type name, if any.
fn builtin_type(ty: &Ty) -> Option<&'static str> {
    Some(match ty.name.as_str() {
        "Bool" => "bool",
        "true" => "bool",
        "int" => "i32",
        "long" => "i64",
        "int128" => "[u8; 16]",
        "int256" => "[u8; 32]",
        "double" => "f64",
        "string" => "String",
        "bytes" => "Vec<u8>",
        "Object" => "crate::Blob",
        // `%Vector<t>` forces the bare form just like lowercase `vector<t>`.
        "Vector" | "vector" if ty.bare => "crate::RawVec",
        "Vector" => "Vec",
        _ => return None,
    })
}

fn push_sanitized_name(result: &mut String, ty: &Ty) {
    match builtin_type(ty) {
        Some(builtin) => result.push_str(builtin),
        None => result.push_str(&rusty_namespaced_class_name(ty)),
    }
}

fn push_sanitized_path(result: &mut String, ty: &Ty) {
    // Most sanitized names are already valid paths.
    match ty.name.as_str() {
        "bytes" => result.push_str("Vec::<u8>"),
        "int128" => result.push_str("<[u8; 16]>"),
        "int256" => result.push_str("<[u8; 32]>"),
        _ => push_sanitized_name(result, ty),
    }
}

/// The Rust type for a type reference (`Vector<long>` becomes `Vec<i64>`).
///
/// Generic references can hold any value, so they are stored as an
/// unparsed [`Blob`] rather than infecting everything with type
/// parameters.
pub(crate) fn rusty_type(ty: &Ty) -> String {
    let mut result = String::new();
    if ty.generic_ref {
        result.push_str("crate::Blob");
    } else {
        push_sanitized_name(&mut result, ty);
        if let Some(arg) = &ty.generic_arg {
            result.push('<');
            push_sanitized_name(&mut result, arg);
            result.push('>');
        }
    }
    result
}

/// The Rust type for a parameter, wrapping conditionals in `Option`.
pub(crate) fn rusty_type_name(param: &Parameter) -> String {
    match &param.ty {
        ParameterType::Flags => "u32".into(),
        ParameterType::Normal { ty, flag } if flag.is_some() && ty.name == "true" => {
            // `flags.N?true` is a presence bit, not a value.
            "bool".into()
        }
        ParameterType::Normal { ty, flag } => {
            let mut result = String::new();
            if flag.is_some() {
                result.push_str("Option<");
            }
            result.push_str(&rusty_type(ty));
            if flag.is_some() {
                result.push('>');
            }
            result
        }
    }
}

/// Like [`rusty_type_name`] but usable as an expression path
/// (`Vec::<u8>` rather than `Vec<u8>`); `Option` is not applied.
pub(crate) fn rusty_type_path(param: &Parameter) -> String {
    match &param.ty {
        ParameterType::Flags => "u32".into(),
        ParameterType::Normal { ty, flag } if flag.is_some() && ty.name == "true" => "bool".into(),
        ParameterType::Normal { ty, .. } => {
            let mut result = String::new();
            if ty.generic_ref {
                result.push_str("crate::Blob");
            } else {
                push_sanitized_path(&mut result, ty);
                if let Some(arg) = &ty.generic_arg {
                    result.push_str("::<");
                    push_sanitized_path(&mut result, arg);
                    result.push('>');
                }
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrogram_tl_parser::tl::Category;
    use std::str::FromStr;

    fn definition(def: &str) -> Definition {
        Definition::from_str(def).unwrap()
    }

    #[test]
    fn check_rusty_class_name() {
        assert_eq!(rusty_class_name("ns.some_OK_name"), "SomeOkName");
        assert_eq!(rusty_class_name("resPQ"), "ResPq");
        assert_eq!(rusty_class_name("p_q_inner_data"), "PQInnerData");
        assert_eq!(rusty_class_name("server_DH_params_ok"), "ServerDhParamsOk");
    }

    #[test]
    fn check_rusty_variant_name() {
        assert_eq!(
            rusty_variant_name(&definition("server_DH_params_ok#1 = Server_DH_Params")),
            "Ok"
        );
        assert_eq!(
            rusty_variant_name(&definition("new_session_created#1 = NewSession")),
            "Created"
        );
        // The prefix is the whole name: fall back to the last word.
        assert_eq!(rusty_variant_name(&definition("resPQ#1 = ResPQ")), "Pq");
        assert_eq!(
            rusty_variant_name(&definition("nearestDc#1 = NearestDc")),
            "Dc"
        );
        assert_eq!(
            rusty_variant_name(&definition("inputPeerSelf#1 = InputPeer")),
            "PeerSelf"
        );
    }

    #[test]
    fn check_object_variant_name() {
        let mut def = definition("messages.botCallbackAnswer#1 = messages.BotCallbackAnswer");
        def.category = Category::Types;
        assert_eq!(rusty_object_variant_name(&def), "MessagesBotCallbackAnswer");
    }

    #[test]
    fn check_param_types() {
        let def = definition(
            "dcOption#5d8c6cc1 flags:# ipv6:flags.0?true id:int port:flags.3?int ips:Vector<string> = DcOption",
        );
        let names: Vec<String> = def.params.iter().map(rusty_type_name).collect();
        assert_eq!(names, ["u32", "bool", "i32", "Option<i32>", "Vec<String>"]);
    }
}
