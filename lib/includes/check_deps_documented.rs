// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Included by the test suite of every crate in the workspace to make sure
// `DEPS.md` stays in sync with `Cargo.toml`.

#[test]
fn check_deps_documented() {
    let mut listed = {
        let manifest = std::fs::read_to_string("Cargo.toml").expect("Cargo.toml must be readable");
        let mut deps = std::collections::HashSet::new();

        match manifest.parse::<toml::Value>() {
            Ok(toml::Value::Table(mut table)) => {
                for key in ["dependencies", "build-dependencies", "dev-dependencies"] {
                    if let Some(toml::Value::Table(section)) = table.remove(key) {
                        for (dep, _) in section {
                            deps.insert(dep);
                        }
                    }
                }
            }
            _ => unreachable!("Cargo.toml should not be malformed"),
        }

        deps.into_iter().collect::<Vec<_>>()
    };
    listed.sort();

    let mut documented = std::fs::read_to_string("DEPS.md")
        .expect("DEPS.md must exist")
        .lines()
        .filter_map(|line| line.strip_prefix("## ").map(String::from))
        .collect::<Vec<_>>();
    documented.sort();

    assert_eq!(
        listed, documented,
        "Cargo.toml dependencies and DEPS.md sections differ"
    );
}
