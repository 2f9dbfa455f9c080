// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::{HashMap, HashSet};

use ferrogram_tl_parser::tl::{Category, Definition, Parameter, ParameterType, Ty};

type TyKey<'a> = (&'a [String], &'a str);

fn ty_key<'a>(namespace: &'a [String], name: &'a str) -> TyKey<'a> {
    (namespace, name)
}

/// Cross-definition facts several generation passes need.
pub(crate) struct Metadata<'a> {
    recursing_defs: HashSet<u32>,
    defs_with_type: HashMap<TyKey<'a>, Vec<&'a Definition>>,
    unused_flags: HashMap<u32, Vec<&'a Parameter>>,
}

impl<'a> Metadata<'a> {
    pub fn new(definitions: &'a [Definition]) -> Self {
        let mut metadata = Self {
            recursing_defs: HashSet::new(),
            defs_with_type: HashMap::new(),
            unused_flags: HashMap::new(),
        };

        for def in definitions {
            for flags_param in def
                .params
                .iter()
                .filter(|p| matches!(p.ty, ParameterType::Flags))
            {
                let used = def.params.iter().any(|p| match &p.ty {
                    ParameterType::Normal {
                        flag: Some(flag), ..
                    } => flag.name == flags_param.name,
                    _ => false,
                });
                if !used {
                    metadata
                        .unused_flags
                        .entry(def.id)
                        .or_default()
                        .push(flags_param);
                }
            }
        }

        for def in definitions.iter().filter(|d| d.category == Category::Types) {
            metadata
                .defs_with_type
                .entry(ty_key(&def.ty.namespace, &def.ty.name))
                .or_default()
                .push(def);
        }

        for def in definitions.iter().filter(|d| d.category == Category::Types) {
            if self_references(def, def, &metadata.defs_with_type, &mut HashSet::new()) {
                metadata.recursing_defs.insert(def.id);
            }
        }

        metadata
    }

    /// Whether a flags parameter has no conditional parameter depending
    /// on it (it still occupies four bytes on the wire).
    pub fn is_unused_flag(&self, def: &Definition, flags_param: &Parameter) -> bool {
        self.unused_flags
            .get(&def.id)
            .map(|params| params.iter().any(|p| *p == flags_param))
            .unwrap_or(false)
    }

    /// Whether the definition eventually contains its own type, which
    /// forces indirection in the generated enum.
    pub fn is_recursive_def(&self, def: &Definition) -> bool {
        self.recursing_defs.contains(&def.id)
    }

    /// Every type-constructor definition producing the given type.
    pub fn defs_with_type(&self, ty: &'a Ty) -> &Vec<&Definition> {
        &self.defs_with_type[&ty_key(&ty.namespace, &ty.name)]
    }
}

fn self_references(
    root: &Definition,
    check: &Definition,
    defs_with_type: &HashMap<TyKey<'_>, Vec<&Definition>>,
    visited: &mut HashSet<u32>,
) -> bool {
    visited.insert(check.id);
    for param in check.params.iter() {
        let ParameterType::Normal { ty, .. } = &param.ty else {
            continue;
        };
        if ty.namespace == root.ty.namespace && ty.name == root.ty.name {
            return true;
        }
        if let Some(defs) = defs_with_type.get(&ty_key(&ty.namespace, &ty.name)) {
            for def in defs {
                if !visited.contains(&def.id)
                    && self_references(root, def, defs_with_type, visited)
                {
                    return true;
                }
            }
        }
    }
    false
}
