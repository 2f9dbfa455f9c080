// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::str::FromStr;

use crate::errors::{ParamParseError, ParseError};
use crate::tl::{Category, Flag, Parameter, ParameterType, Ty};
use crate::utils::infer_id;

/// A single parsed definition: a constructor or a function.
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    /// The namespace components of the definition, empty for the global
    /// namespace.
    pub namespace: Vec<String>,

    /// The name of the definition ("predicate" or "method").
    pub name: String,

    /// The 32-bit constructor identifier, either explicit (`#hex`) or
    /// inferred from the definition itself.
    pub id: u32,

    /// The parameters of the definition, in declaration order.
    pub params: Vec<Parameter>,

    /// The type this definition produces.
    pub ty: Ty,

    /// Whether this is a type constructor or a function.
    pub category: Category,
}

impl Definition {
    /// The namespace and name joined back into a single dotted string.
    pub fn full_name(&self) -> String {
        let mut result = String::new();
        for ns in self.namespace.iter() {
            result.push_str(ns);
            result.push('.');
        }
        result.push_str(&self.name);
        result
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:x}", self.full_name(), self.id)?;

        // Generic definitions must be re-introduced before use.
        let mut generics = vec![];
        for param in self.params.iter() {
            if let ParameterType::Normal { ty, .. } = &param.ty {
                ty.find_generic_refs(&mut generics);
            }
        }
        generics.sort_unstable();
        generics.dedup();
        for generic in generics {
            write!(f, " {{{generic}:Type}}")?;
        }

        for param in self.params.iter() {
            write!(f, " {param}")?;
        }
        write!(f, " = {}", self.ty)
    }
}

impl FromStr for Definition {
    type Err = ParseError;

    /// Parses a definition such as
    /// `nearestDc#8e1a1775 country:string this_dc:int nearest_dc:int = NearestDc`.
    fn from_str(definition: &str) -> Result<Self, Self::Err> {
        if definition.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let (left, ty) = definition
            .split_once('=')
            .ok_or(ParseError::MissingType)?;
        let (left, ty) = (left.trim(), ty.trim());

        let mut ty = Ty::from_str(ty).map_err(|_| ParseError::MissingType)?;

        let (name, middle) = match left.find(char::is_whitespace) {
            Some(pos) => (&left[..pos], left[pos..].trim()),
            None => (left, ""),
        };

        let (name, id) = match name.split_once('#') {
            Some((name, id)) => (name, Some(id)),
            None => (name, None),
        };

        let mut namespace = name.split('.').map(String::from).collect::<Vec<_>>();
        if namespace.iter().any(|part| part.is_empty()) {
            return Err(ParseError::MissingName);
        }
        // `split` yields at least one element.
        let name = namespace.pop().unwrap();

        let id = match id {
            Some(id) => u32::from_str_radix(id.trim(), 16).map_err(ParseError::InvalidId)?,
            None => infer_id(definition),
        };

        let mut generic_defs = vec![];
        let mut flag_defs = vec![];
        let mut params = Vec::new();

        for param in middle.split_whitespace() {
            match Parameter::from_str(param) {
                // Generic type definitions are not parameters; remember the
                // name so later `!X` references can be validated.
                Err(ParamParseError::TypeDef { name }) => generic_defs.push(name),
                Err(ParamParseError::NotImplemented) => return Err(ParseError::NotImplemented),
                Err(e) => return Err(ParseError::InvalidParam(e)),
                Ok(param) => {
                    match &param.ty {
                        ParameterType::Flags => flag_defs.push(param.name.clone()),
                        ParameterType::Normal { ty, flag } => {
                            if ty.generic_ref && !generic_defs.contains(&ty.name) {
                                return Err(ParseError::InvalidParam(
                                    ParamParseError::MissingDef,
                                ));
                            }
                            if let Some(Flag { name, .. }) = flag {
                                if !flag_defs.contains(name) {
                                    return Err(ParseError::InvalidParam(
                                        ParamParseError::MissingDef,
                                    ));
                                }
                            }
                        }
                    }
                    params.push(param);
                }
            }
        }

        // The produced type never spells `!`, so it is generic whenever a
        // generic definition introduced its name.
        if generic_defs.contains(&ty.name) {
            ty.generic_ref = true;
        }

        Ok(Self {
            namespace,
            name,
            id,
            params,
            ty,
            category: Category::Types,
        })
    }
}
