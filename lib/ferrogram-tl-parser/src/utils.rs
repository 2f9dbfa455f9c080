// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Free-standing helpers used by the parser.

/// Strips `//`-style comments, keeping line structure intact.
pub(crate) fn remove_tl_comments(contents: &str) -> String {
    let mut result = String::with_capacity(contents.len());
    for (i, line) in contents.lines().enumerate() {
        if i != 0 {
            result.push('\n');
        }
        match line.find("//") {
            Some(pos) => result.push_str(&line[..pos]),
            None => result.push_str(line),
        }
    }
    result
}

/// Infers the constructor identifier of a definition that does not carry
/// an explicit `#id`.
///
/// The identifier is the CRC32 of the definition after normalizing it:
/// `bytes` is spelled `string`, angle brackets and braces are dropped,
/// and `?true` parameters do not participate at all.
pub(crate) fn infer_id(definition: &str) -> u32 {
    let mut repr = definition
        .trim()
        .replace(":bytes", ":string")
        .replace("?bytes", "?string")
        .replace('<', " ")
        .replace('>', "")
        .replace(['{', '}'], "");

    while let Some(pos) = repr.find("?true") {
        let start = repr[..pos].rfind(' ').unwrap_or(0);
        repr.replace_range(start..pos + "?true".len(), "");
    }

    crc32fast::hash(repr.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_comments_noop() {
        let contents = "hello\nworld";
        assert_eq!(remove_tl_comments(contents), contents);
    }

    #[test]
    fn remove_comments_whole_line() {
        assert_eq!(remove_tl_comments("// gone\nkept"), "\nkept");
    }

    #[test]
    fn remove_comments_trailing() {
        assert_eq!(remove_tl_comments("kept // gone\nkept"), "kept \nkept");
    }

    #[test]
    fn check_infer_id() {
        // A field *named* bytes, which must not be rewritten.
        let def = "rpc_answer_dropped msg_id:long seq_no:int bytes:int = RpcDropAnswer";
        assert_eq!(infer_id(def), 0xa43ad8b7);

        // Angle brackets.
        let def = "msgs_ack msg_ids:Vector<long> = MsgsAck";
        assert_eq!(infer_id(def), 0x62d6b459);

        // Curly brackets.
        let def = "invokeAfterMsg {X:Type} msg_id:long query:!X = X";
        assert_eq!(infer_id(def), 0xcb9f372d);

        // `true` flags do not participate.
        let def = "inputMessagesFilterPhoneCalls flags:# missed:flags.0?true = MessagesFilter";
        assert_eq!(infer_id(def), 0x80c99768);
    }
}
