// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::str::FromStr;

use crate::errors::ParamParseError;
use crate::tl::ParameterType;

/// A single `name:type` parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Parameter {
    /// The name of the parameter.
    pub name: String,

    /// The type of the parameter.
    pub ty: ParameterType,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.ty)
    }
}

impl FromStr for Parameter {
    type Err = ParamParseError;

    /// Parses a single parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrogram_tl_parser::tl::Parameter;
    ///
    /// assert!("port:flags.3?int".parse::<Parameter>().is_ok());
    /// ```
    fn from_str(param: &str) -> Result<Self, Self::Err> {
        // `{X:Type}` defines a generic type rather than a parameter.
        if param.starts_with('{') {
            return Err(if param.ends_with(":Type}") {
                ParamParseError::TypeDef {
                    // The suffix check above guarantees a colon is present.
                    name: param[1..param.find(':').unwrap()].to_string(),
                }
            } else {
                ParamParseError::MissingDef
            });
        }

        let (name, ty) = param
            .split_once(':')
            .ok_or(ParamParseError::NotImplemented)?;
        if name.is_empty() || ty.is_empty() {
            return Err(ParamParseError::Empty);
        }

        Ok(Self {
            name: name.to_string(),
            ty: ty.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tl::{Flag, Ty};

    #[test]
    fn parse_empty_param() {
        assert_eq!(":nothing".parse::<Parameter>(), Err(ParamParseError::Empty));
        assert_eq!("nothing:".parse::<Parameter>(), Err(ParamParseError::Empty));
    }

    #[test]
    fn parse_colonless_param() {
        assert_eq!(
            "nocolon".parse::<Parameter>(),
            Err(ParamParseError::NotImplemented)
        );
    }

    #[test]
    fn parse_type_def_param() {
        assert_eq!(
            "{X:Type}".parse::<Parameter>(),
            Err(ParamParseError::TypeDef { name: "X".into() })
        );
        assert_eq!(
            "{X:Foo}".parse::<Parameter>(),
            Err(ParamParseError::MissingDef)
        );
    }

    #[test]
    fn parse_valid_param() {
        assert_eq!(
            "flags:#".parse::<Parameter>(),
            Ok(Parameter {
                name: "flags".into(),
                ty: ParameterType::Flags,
            })
        );
        assert_eq!(
            "port:flags.3?int".parse::<Parameter>(),
            Ok(Parameter {
                name: "port".into(),
                ty: ParameterType::Normal {
                    ty: Ty {
                        namespace: vec![],
                        name: "int".into(),
                        bare: true,
                        generic_ref: false,
                        generic_arg: None,
                    },
                    flag: Some(Flag {
                        name: "flags".into(),
                        index: 3,
                    }),
                },
            })
        );
    }
}
