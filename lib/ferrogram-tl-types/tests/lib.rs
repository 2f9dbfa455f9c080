// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Wire-level checks of the generated code: exact byte layouts, the
//! boxed/bare distinction, conditional fields, and the object factory.

use ferrogram_tl_types::{
    deserialize, enums, functions, name_for_id, types, Deserializable, Identifiable, Object,
    RawVec, RemoteCall, Serializable, LAYER,
};

include!("../../includes/check_deps_documented.rs");

#[test]
fn nearest_dc_boxed_encoding() {
    let dc = enums::NearestDc::Dc(types::NearestDc {
        country: "US".to_string(),
        this_dc: 2,
        nearest_dc: 2,
    });

    assert_eq!(
        dc.to_bytes(),
        [
            0x75, 0x17, 0x1a, 0x8e, // nearestDc#8e1a1775
            0x02, b'U', b'S', 0x00, // "US", padded
            0x02, 0x00, 0x00, 0x00, // this_dc
            0x02, 0x00, 0x00, 0x00, // nearest_dc
        ]
    );
}

#[test]
fn boxed_roundtrip_through_enum() {
    let dc = enums::NearestDc::Dc(types::NearestDc {
        country: "US".to_string(),
        this_dc: 2,
        nearest_dc: 2,
    });
    assert_eq!(enums::NearestDc::from_bytes(&dc.to_bytes()).unwrap(), dc);
}

#[test]
fn bare_roundtrip_through_struct() {
    let dc = types::NearestDc {
        country: "ES".to_string(),
        this_dc: 4,
        nearest_dc: 4,
    };
    assert_eq!(types::NearestDc::from_bytes(&dc.to_bytes()).unwrap(), dc);
}

#[test]
fn string_padding_is_a_multiple_of_four() {
    for len in 0..300 {
        let value = "x".repeat(len).to_bytes();
        assert_eq!(value.len() % 4, 0, "padding broken for length {len}");
    }
}

#[test]
fn boxed_vector_starts_with_the_vector_tag() {
    let bytes = vec![1i32, 2, 3].to_bytes();
    assert_eq!(&bytes[..4], &[0x15, 0xc4, 0xb5, 0x1c]);
    assert_eq!(&bytes[4..8], &[0x03, 0x00, 0x00, 0x00]);
    assert_eq!(
        bytes[8..],
        [1u8, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]
    );
}

#[test]
fn bare_vector_starts_with_the_count() {
    let bytes = RawVec(vec![1i32, 2, 3]).to_bytes();
    assert_eq!(&bytes[..4], &[0x03, 0x00, 0x00, 0x00]);
}

#[test]
fn vector_field_encoding() {
    let ack = enums::MsgsAck::Ack(types::MsgsAck { msg_ids: vec![1] });
    assert_eq!(
        ack.to_bytes(),
        [
            0x59, 0xb4, 0xd6, 0x62, // msgs_ack#62d6b459
            0x15, 0xc4, 0xb5, 0x1c, // Vector
            0x01, 0x00, 0x00, 0x00, // count
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 1 as long
        ]
    );
    assert_eq!(enums::MsgsAck::from_bytes(&ack.to_bytes()).unwrap(), ack);
}

#[test]
fn conditional_fields_present_iff_bit_set() {
    let with_url = types::messages::BotCallbackAnswer {
        alert: false,
        has_url: true,
        message: None,
        url: Some("https://e.co".to_string()),
        cache_time: 10,
    };
    let bytes = with_url.to_bytes();

    // flags = has_url (bit 3) | url present (bit 2)
    assert_eq!(&bytes[..4], &[0x0c, 0x00, 0x00, 0x00]);
    // message writes nothing; url follows the flags directly.
    assert_eq!(bytes[4], 12); // its length byte
    assert_eq!(
        types::messages::BotCallbackAnswer::from_bytes(&bytes).unwrap(),
        with_url
    );

    let without_url = types::messages::BotCallbackAnswer {
        alert: true,
        has_url: false,
        message: None,
        url: None,
        cache_time: 10,
    };
    let bytes = without_url.to_bytes();

    // flags = alert (bit 1); both optional values write zero bytes.
    assert_eq!(&bytes[..4], &[0x02, 0x00, 0x00, 0x00]);
    assert_eq!(bytes.len(), 4 + 4);
    assert_eq!(
        types::messages::BotCallbackAnswer::from_bytes(&bytes).unwrap(),
        without_url
    );
}

#[test]
fn presence_bits_never_consume_wire_space() {
    let dc = types::DcOption {
        ipv6: true,
        media_only: false,
        tcpo_only: true,
        id: 2,
        ip_address: "1.1.1.1".to_string(),
        port: 443,
    };
    let bytes = dc.to_bytes();

    // flags (bits 0 and 2), id, "1.1.1.1" (8 bytes framed), port.
    assert_eq!(&bytes[..4], &[0x05, 0x00, 0x00, 0x00]);
    assert_eq!(bytes.len(), 4 + 4 + 8 + 4);
    assert_eq!(types::DcOption::from_bytes(&bytes).unwrap(), dc);
}

#[test]
fn multi_constructor_types_dispatch_on_the_tag() {
    let ok = enums::ServerDhParams::Ok(types::ServerDhParamsOk {
        nonce: [1; 16],
        server_nonce: [2; 16],
        encrypted_answer: vec![0; 16],
    });
    let fail = enums::ServerDhParams::Fail(types::ServerDhParamsFail {
        nonce: [1; 16],
        server_nonce: [2; 16],
        new_nonce_hash: [3; 16],
    });

    // Both variants satisfy the one supertype and survive the roundtrip.
    for value in [ok, fail] {
        let bytes = value.to_bytes();
        assert_eq!(enums::ServerDhParams::from_bytes(&bytes).unwrap(), value);
    }

    // A tag belonging to no constructor of the type is rejected.
    let bytes = 0xdeadbeefu32.to_bytes();
    assert_eq!(
        enums::ServerDhParams::from_bytes(&bytes),
        Err(deserialize::Error::UnexpectedConstructor { id: 0xdeadbeef })
    );
}

#[test]
fn structs_convert_into_their_enum() {
    let dc: enums::NearestDc = types::NearestDc {
        country: "US".to_string(),
        this_dc: 2,
        nearest_dc: 2,
    }
    .into();
    assert!(matches!(dc, enums::NearestDc::Dc(_)));
}

#[test]
fn functions_always_serialize_boxed() {
    assert_eq!(
        functions::help::GetNearestDc {}.to_bytes(),
        [0x26, 0x30, 0xb3, 0x1f]
    );
    assert_eq!(
        functions::Ping { ping_id: 0x1122 }.to_bytes()[..4],
        [0xec, 0x77, 0xbe, 0x7a]
    );
}

#[test]
fn object_factory_reads_known_tags() {
    let pong = types::Pong {
        msg_id: 1,
        ping_id: 2,
    };
    let bytes = Object::Pong(pong.clone()).to_bytes();
    assert_eq!(&bytes[..4], &[0xc5, 0x73, 0x47, 0x34]);

    let object = Object::from_bytes(&bytes).unwrap();
    assert_eq!(object, Object::Pong(pong));
    assert_eq!(object.constructor_id(), 0x347773c5);
    assert_eq!(object.name(), "pong");
}

#[test]
fn object_factory_rejects_unknown_tags() {
    let bytes = 0xdeadbeefu32.to_bytes();
    assert_eq!(
        Object::from_bytes(&bytes),
        Err(deserialize::Error::UnexpectedConstructor { id: 0xdeadbeef })
    );
}

#[test]
fn object_factory_demands_eof() {
    let mut bytes = Object::Pong(types::Pong {
        msg_id: 1,
        ping_id: 2,
    })
    .to_bytes();
    bytes.extend([0; 3]);

    assert_eq!(
        Object::from_bytes(&bytes),
        Err(deserialize::Error::TrailingBytes { remaining: 3 })
    );
}

#[test]
fn rpc_results_keep_their_body_unparsed() {
    let result = types::RpcResult {
        req_msg_id: 7,
        result: vec![1, 2, 3, 4].into(),
    };
    let bytes = result.to_bytes();
    // The blob is written raw: no length prefix, no padding.
    assert_eq!(&bytes[8..], &[1, 2, 3, 4]);
    assert_eq!(types::RpcResult::from_bytes(&bytes).unwrap(), result);
}

#[test]
fn constructor_ids_match_the_schema() {
    assert_eq!(types::ResPq::CONSTRUCTOR_ID, 0x05162463);
    assert_eq!(types::NearestDc::CONSTRUCTOR_ID, 0x8e1a1775);
    assert_eq!(functions::ReqPqMulti::CONSTRUCTOR_ID, 0xbe7e8ef1);
    assert_eq!(functions::InvokeWithLayer::CONSTRUCTOR_ID, 0xda9b0d0d);
}

#[test]
fn name_registry_knows_the_schema() {
    assert_eq!(name_for_id(0x1cb5c415), "vector");
    assert_eq!(name_for_id(0x8e1a1775), "nearestDc");
    assert_eq!(name_for_id(0x1fb33026), "help.getNearestDc");
    assert_eq!(name_for_id(0x36585ea4), "messages.botCallbackAnswer");
    assert_eq!(name_for_id(0xdeadbeef), "(unknown)");
}

#[test]
fn layer_is_exposed() {
    assert_eq!(LAYER, 71);
}

// The reply types of functions are part of the generated contract.
fn _nearest_dc_reply(reply: <functions::help::GetNearestDc as RemoteCall>::Return) -> enums::NearestDc {
    reply
}
fn _ping_reply(reply: <functions::Ping as RemoteCall>::Return) -> enums::Pong {
    reply
}
