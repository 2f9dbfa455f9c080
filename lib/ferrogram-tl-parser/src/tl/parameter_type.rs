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
use crate::tl::{Flag, Ty};

/// The type of a parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// The parameter is a flag-bits accumulator (`flags:#`).
    Flags,

    /// Any other parameter, possibly conditional on a flag bit.
    Normal {
        /// The actual type of the parameter.
        ty: Ty,

        /// If present, the flag bit that gates this parameter.
        flag: Option<Flag>,
    },
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flags => write!(f, "#"),
            Self::Normal { ty, flag } => {
                if let Some(flag) = flag {
                    write!(f, "{flag}?")?;
                }
                write!(f, "{ty}")
            }
        }
    }
}

impl FromStr for ParameterType {
    type Err = ParamParseError;

    /// Parses a parameter type such as `#`, `int` or `flags.0?true`.
    fn from_str(ty: &str) -> Result<Self, Self::Err> {
        if ty.is_empty() {
            return Err(ParamParseError::Empty);
        }
        if ty == "#" {
            return Ok(Self::Flags);
        }

        let (flag, ty) = match ty.split_once('?') {
            Some((flag, rest)) => (Some(flag.parse()?), rest),
            None => (None, ty),
        };

        Ok(Self::Normal {
            ty: ty.parse()?,
            flag,
        })
    }
}
