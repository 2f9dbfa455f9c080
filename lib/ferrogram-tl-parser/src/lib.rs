// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! This library provides a parser for [Type Language] schema files, the
//! interface definition language used by Telegram's MTProto protocol.
//!
//! The entry point is [`parse_tl_file`], which yields one parsed
//! [`Definition`] per `;`-terminated declaration. Definitions found after a
//! `---functions---` separator are flagged as functions rather than types.
//!
//! [Type Language]: https://core.telegram.org/mtproto/TL

pub mod errors;
pub mod tl;
mod utils;

use std::str::FromStr;

use errors::ParseError;
use tl::{Category, Definition};

/// Parses the contents of a schema file.
///
/// # Examples
///
/// ```
/// use ferrogram_tl_parser::parse_tl_file;
///
/// let schema = "
///     nearestDc#8e1a1775 country:string this_dc:int nearest_dc:int = NearestDc;
///     ---functions---
///     help.getNearestDc#1fb33026 = NearestDc;
/// ";
///
/// let definitions = parse_tl_file(schema)
///     .collect::<Result<Vec<_>, _>>()
///     .unwrap();
///
/// assert_eq!(definitions.len(), 2);
/// ```
pub fn parse_tl_file(contents: &str) -> impl Iterator<Item = Result<Definition, ParseError>> {
    let declarations = utils::remove_tl_comments(contents)
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .map(String::from)
        .collect::<Vec<_>>();

    let mut category = Category::Types;
    declarations.into_iter().filter_map(move |decl| {
        // A separator such as `---functions---` is not `;`-terminated, so it
        // ends up glued to the front of the following declaration.
        let decl = match split_separator(&decl) {
            Ok((new_category, rest)) => {
                if let Some(new_category) = new_category {
                    category = new_category;
                }
                rest.to_string()
            }
            Err(e) => return Some(Err(e)),
        };
        if decl.is_empty() {
            return None;
        }

        Some(Definition::from_str(&decl).map(|mut definition| {
            definition.category = category;
            definition
        }))
    })
}

/// If `decl` begins with a `---name---` separator, determine the category it
/// switches to and return it along with the remainder of the declaration.
fn split_separator(decl: &str) -> Result<(Option<Category>, &str), ParseError> {
    let Some(after_dashes) = decl.strip_prefix("---") else {
        return Ok((None, decl));
    };

    let Some(end) = after_dashes.find("---") else {
        return Err(ParseError::UnknownSeparator);
    };

    let category = match after_dashes[..end].trim() {
        "functions" => Category::Functions,
        "types" => Category::Types,
        _ => return Err(ParseError::UnknownSeparator),
    };

    Ok((Some(category), after_dashes[end + 3..].trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bad_separator() {
        let mut definitions = parse_tl_file("---apocalypse--- foo = Bar;");
        assert_eq!(
            definitions.next().unwrap(),
            Err(ParseError::UnknownSeparator)
        );
    }

    #[test]
    fn parse_file() {
        let definitions = parse_tl_file(
            "
            // this line is ignored
            first#1 x:int = t; // this one too
            second#2 = t;
            ---functions---
            third#3 = t;
            ---types---
            fourth#4 = t;
            ",
        )
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

        assert_eq!(definitions.len(), 4);
        assert_eq!(definitions[0].id, 1);
        assert_eq!(definitions[0].category, Category::Types);
        assert_eq!(definitions[1].category, Category::Types);
        assert_eq!(definitions[2].category, Category::Functions);
        assert_eq!(definitions[3].category, Category::Types);
    }

    #[test]
    fn parse_spaced_separator() {
        let definitions = parse_tl_file(
            "
            nearestDc#8e1a1775 country:string this_dc:int nearest_dc:int = NearestDc;
            --- functions ---
            help.getNearestDc#1fb33026 = NearestDc;
            ",
        )
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

        assert_eq!(definitions[0].category, Category::Types);
        assert_eq!(definitions[1].category, Category::Functions);
        assert_eq!(definitions[1].namespace, vec!["help".to_string()]);
    }
}
