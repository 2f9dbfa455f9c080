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

/// A type appearing on either side of a definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ty {
    /// The namespace components of the type, empty for the global one.
    pub namespace: Vec<String>,

    /// The name of the type itself.
    pub name: String,

    /// Whether the type is written bare on the wire (no leading tag).
    ///
    /// A type is bare if its name starts with a lowercase letter, or if the
    /// reference was explicitly forced bare with a `%` prefix.
    pub bare: bool,

    /// Whether the name refers to a generic definition (`!X`).
    pub generic_ref: bool,

    /// The generic argument, if the type has one (`Vector<long>`).
    pub generic_arg: Option<Box<Ty>>,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ns in self.namespace.iter() {
            write!(f, "{ns}.")?;
        }
        if self.generic_ref {
            write!(f, "!")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(arg) = &self.generic_arg {
            write!(f, "<{arg}>")?;
        }
        Ok(())
    }
}

impl FromStr for Ty {
    type Err = ParamParseError;

    /// Parses a type reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrogram_tl_parser::tl::Ty;
    ///
    /// assert!("%Vector<int>".parse::<Ty>().is_ok());
    /// ```
    fn from_str(ty: &str) -> Result<Self, Self::Err> {
        // `!X` marks a reference to a generic definition.
        let (ty, generic_ref) = match ty.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (ty, false),
        };

        // `%T` forces the bare version of an otherwise boxed type.
        let (ty, forced_bare) = match ty.strip_prefix('%') {
            Some(rest) => (rest, true),
            None => (ty, false),
        };

        // `T<A>` carries a generic argument.
        let (ty, generic_arg) = match ty.find('<') {
            Some(pos) => {
                let arg = ty
                    .strip_suffix('>')
                    .ok_or(ParamParseError::InvalidGeneric)?;
                (&ty[..pos], Some(Box::new(Ty::from_str(&arg[pos + 1..])?)))
            }
            None => (ty, None),
        };

        let mut namespace = ty.split('.').map(String::from).collect::<Vec<_>>();
        if namespace.iter().any(|part| part.is_empty()) {
            return Err(ParamParseError::Empty);
        }

        // `split` yields at least one element, so `pop` cannot fail.
        let name = namespace.pop().unwrap();
        let bare = forced_bare || name.chars().next().unwrap().is_ascii_lowercase();

        Ok(Self {
            namespace,
            name,
            bare,
            generic_ref,
            generic_arg,
        })
    }
}

impl Ty {
    /// Appends every generic reference nested in this type to `output`.
    pub(crate) fn find_generic_refs<'a>(&'a self, output: &mut Vec<&'a str>) {
        if self.generic_ref {
            output.push(&self.name);
        }
        if let Some(arg) = &self.generic_arg {
            arg.find_generic_refs(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(ty: &str) -> Ty {
        ty.parse().unwrap()
    }

    #[test]
    fn check_empty() {
        assert_eq!(Ty::from_str(""), Err(ParamParseError::Empty));
        assert_eq!(Ty::from_str("."), Err(ParamParseError::Empty));
        assert_eq!(Ty::from_str("foo."), Err(ParamParseError::Empty));
        assert_eq!(Ty::from_str(".foo"), Err(ParamParseError::Empty));
    }

    #[test]
    fn check_bare() {
        assert!(parse("foo").bare);
        assert!(!parse("Foo").bare);
        assert!(parse("ns.foo").bare);
        assert!(!parse("ns.Foo").bare);
        assert!(parse("%Foo").bare);
        assert!(parse("%foo").bare);
    }

    #[test]
    fn check_namespace() {
        let ty = parse("storage.fileType");
        assert_eq!(ty.namespace, vec!["storage".to_string()]);
        assert_eq!(ty.name, "fileType");
    }

    #[test]
    fn check_generic_ref() {
        assert!(parse("!X").generic_ref);
        assert!(!parse("X").generic_ref);
    }

    #[test]
    fn check_generic_arg() {
        assert_eq!(parse("Vector<long>").generic_arg, Some(Box::new(parse("long"))));
        assert_eq!(
            parse("%Vector<ns.Foo>").generic_arg,
            Some(Box::new(parse("ns.Foo")))
        );
        assert_eq!(
            Ty::from_str("Vector<long"),
            Err(ParamParseError::InvalidGeneric)
        );
    }

    #[test]
    fn check_display() {
        for ty in ["foo", "ns.Foo", "!X", "Vector<ns.foo>"] {
            assert_eq!(parse(ty).to_string(), ty);
        }
    }
}
