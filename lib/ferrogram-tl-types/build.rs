// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use ferrogram_tl_gen::{generate_rust_code, Config};
use ferrogram_tl_parser::parse_tl_file;
use ferrogram_tl_parser::tl::Definition;
use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

/// Loads the definitions from a schema file.
///
/// Declarations the parser cannot handle (the builtin `int ? = Int;` kind)
/// are reported to `stderr` and skipped.
fn load_tl(path: &str) -> io::Result<Vec<Definition>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_tl_file(&contents)
        .filter_map(|parsed| match parsed {
            Ok(definition) => Some(definition),
            Err(e) => {
                eprintln!("{path}: parse error: {e:?}");
                None
            }
        })
        .collect())
}

/// Finds the `// LAYER #` marker comment and returns its value.
fn find_layer(path: &str) -> io::Result<Option<i32>> {
    const LAYER_MARK: &str = "// LAYER ";

    let contents = std::fs::read_to_string(path)?;
    Ok(contents.lines().find_map(|line| {
        line.strip_prefix(LAYER_MARK)
            .and_then(|value| value.trim().parse().ok())
    }))
}

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=tl/api.tl");
    println!("cargo:rerun-if-changed=tl/mtproto.tl");

    let mut layer = 0;
    let mut definitions = Vec::new();
    if env::var("CARGO_FEATURE_TL_API").is_ok() {
        layer = match find_layer("tl/api.tl")? {
            Some(layer) => layer,
            None => panic!("no layer information found in api.tl"),
        };
        definitions.extend(load_tl("tl/api.tl")?);
    }
    if env::var("CARGO_FEATURE_TL_MTPROTO").is_ok() {
        definitions.extend(load_tl("tl/mtproto.tl")?);
    }

    let config = Config {
        gen_name_for_id: true,
        gen_object_enum: true,
        deserializable_functions: env::var("CARGO_FEATURE_DESERIALIZABLE_FUNCTIONS").is_ok(),
        impl_debug: env::var("CARGO_FEATURE_IMPL_DEBUG").is_ok(),
    };

    let out_dir = env::var("OUT_DIR").unwrap();
    let mut file = BufWriter::new(File::create(
        Path::new(&out_dir).join("generated.rs"),
    )?);

    generate_rust_code(&mut file, &definitions, layer, &config)?;

    Ok(())
}
