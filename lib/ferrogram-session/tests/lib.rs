// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Session tests over a channel-backed transport, including one that
//! plays the server's side of the whole handshake.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use num_bigint::BigUint;
use tokio::sync::mpsc;

use ferrogram_crypto::{
    aes, decrypt_data_v1, encrypt_data_v1, generate_key_data_from_nonce, hex, rsa, sha1, AuthKey,
    Side,
};
use ferrogram_mtproto::errors::FrameError;
use ferrogram_session::{
    Event, Handled, Pseudo, Session, SessionError, SessionOptions, Transport, TransportRx,
    TransportTx,
};
use ferrogram_tl_types::{self as tl, Blob, Object, Serializable};

include!("../../includes/check_deps_documented.rs");

// A transport made of two channels: what the session sends can be
// observed, and frames can be injected for it to receive.

struct MockTransport {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

struct MockTx {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

struct MockRx {
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Transport for MockTransport {
    type Tx = MockTx;
    type Rx = MockRx;

    fn split(self) -> (MockTx, MockRx) {
        (
            MockTx {
                outbound: self.outbound,
            },
            MockRx {
                inbound: self.inbound,
            },
        )
    }
}

impl TransportTx for MockTx {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.outbound
            .send(data.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
    }

    async fn close(&mut self) {}
}

impl TransportRx for MockRx {
    async fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.inbound.recv().await)
    }
}

fn mock_transport() -> (
    MockTransport,
    mpsc::UnboundedSender<Vec<u8>>,
    mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    (
        MockTransport {
            outbound: outbound_tx,
            inbound: inbound_rx,
        },
        inbound_tx,
        outbound_rx,
    )
}

fn test_key() -> rsa::Key {
    rsa::Key::new(
        "25342889448840415564971689590713473206898847759084779052582026594546022463853940585885215951168491965708222649399180603818074200620463776135424884632162512403163793083921641631564740959529419359595852941166848940585952337613333022396096584117954892216031229237302943701877588456738335398602461675225081791820393153757504952636234951323237820036543581047826906120927972487366805292115792231423684261262330394324750785450942589751755390156647751460719351439969059949569615302809050721500330239005077889855323917509948255722081644689442127297605422579707142646660768825302832201908302295573257427896031830742328565032949",
        "65537",
    )
    .unwrap()
}

fn options(pub_key: rsa::Key) -> SessionOptions {
    SessionOptions {
        pub_key,
        api_id: 1234,
        api_hash: String::new(),
        verbose: 0,
    }
}

/// Extracts the payload of an unencrypted frame.
fn plain_payload(frame: &[u8]) -> &[u8] {
    assert_eq!(&frame[..8], &[0u8; 8], "expected an unencrypted frame");
    let len = i32::from_le_bytes(frame[16..20].try_into().unwrap()) as usize;
    &frame[20..20 + len]
}

/// Wraps a payload into an unencrypted frame, server style.
fn plain_frame(obj: &Object) -> Vec<u8> {
    let payload = obj.to_bytes();
    let mut frame = Vec::with_capacity(20 + payload.len());
    0i64.serialize(&mut frame);
    1i64.serialize(&mut frame); // msg_id, unvalidated
    (payload.len() as i32).serialize(&mut frame);
    frame.extend(&payload);
    frame
}

fn peek_id(payload: &[u8]) -> u32 {
    u32::from_le_bytes(payload[..4].try_into().unwrap())
}

#[tokio::test]
async fn handler_chain_first_match_wins() {
    let (transport, inbound, mut outbound) = mock_transport();
    let (mut session, handle) = Session::new(transport, options(test_key()));

    let first_ran = Arc::new(AtomicBool::new(false));
    let third_ran = Arc::new(AtomicBool::new(false));

    let flag = first_ran.clone();
    session.add_handler(move |event| {
        if matches!(event, Event::Object(_)) {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(Handled::NotHandled)
    });

    session.add_handler(|event| match event {
        Event::Object(Object::Pong(_)) => Ok(Handled::Replies(vec![
            Object::Ping(tl::functions::Ping { ping_id: 1 }),
            Object::MsgsAck(tl::types::MsgsAck { msg_ids: vec![99] }),
        ])),
        _ => Ok(Handled::NotHandled),
    });

    let flag = third_ran.clone();
    session.add_handler(move |event| {
        if matches!(event, Event::Object(_)) {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(Handled::NotHandled)
    });

    let run = tokio::spawn(session.run());

    // The session always opens with the key exchange.
    let frame = outbound.recv().await.unwrap();
    assert_eq!(peek_id(plain_payload(&frame)), 0xbe7e8ef1);

    // A pong is of no interest to the built-ins, so the user chain runs:
    // the first handler passes, the second replies with two messages,
    // and the third must never be reached.
    let pong = Object::Pong(tl::types::Pong {
        msg_id: 1,
        ping_id: 2,
    });
    inbound.send(plain_frame(&pong)).unwrap();

    let m1 = outbound.recv().await.unwrap();
    let m2 = outbound.recv().await.unwrap();
    assert_eq!(
        plain_payload(&m1),
        Object::Ping(tl::functions::Ping { ping_id: 1 }).to_bytes()
    );
    assert_eq!(
        plain_payload(&m2),
        Object::MsgsAck(tl::types::MsgsAck { msg_ids: vec![99] }).to_bytes()
    );

    assert!(first_ran.load(Ordering::SeqCst));
    assert!(!third_ran.load(Ordering::SeqCst));

    assert!(handle.close().await);
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn unknown_and_unhandled_objects_are_dropped() {
    let (transport, inbound, mut outbound) = mock_transport();
    let (session, handle) = Session::new(transport, options(test_key()));
    let run = tokio::spawn(session.run());

    let _req_pq = outbound.recv().await.unwrap();

    // A tag no factory knows.
    let mut unknown = Vec::new();
    0i64.serialize(&mut unknown);
    1i64.serialize(&mut unknown);
    4i32.serialize(&mut unknown);
    unknown.extend(&[0xde, 0xad, 0xbe, 0xef]);
    inbound.send(unknown).unwrap();

    // A known object nobody handles.
    inbound
        .send(plain_frame(&Object::Pong(tl::types::Pong {
            msg_id: 1,
            ping_id: 2,
        })))
        .unwrap();

    // Neither is fatal: the session still reacts to events.
    assert!(handle.notify(Pseudo::HandshakeDone).await);
    let frame = outbound.recv().await.unwrap();
    assert_eq!(peek_id(plain_payload(&frame)), 0xda9b0d0d);

    handle.close().await;
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn handshake_done_bootstraps_the_connection() {
    let (transport, _inbound, mut outbound) = mock_transport();
    let (session, handle) = Session::new(transport, options(test_key()));
    let run = tokio::spawn(session.run());

    let _req_pq = outbound.recv().await.unwrap();

    handle.notify(Pseudo::HandshakeDone).await;
    let frame = outbound.recv().await.unwrap();
    let payload = plain_payload(&frame).to_vec();

    // invokeWithLayer(initConnection(help.getNearestDc))
    assert_eq!(peek_id(&payload), 0xda9b0d0d);
    let init_id = 0x69796de9u32.to_le_bytes();
    assert!(payload.windows(4).any(|w| w == init_id));
    let nearest_id = 0x1fb33026u32.to_le_bytes();
    assert!(payload.windows(4).any(|w| w == nearest_id));

    handle.close().await;
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn bad_frames_are_fatal() {
    let (transport, inbound, mut outbound) = mock_transport();
    let (session, _handle) = Session::new(transport, options(test_key()));
    let run = tokio::spawn(session.run());

    let _req_pq = outbound.recv().await.unwrap();

    // A plain frame whose length field is zero.
    inbound.send(vec![0u8; 25]).unwrap();

    match run.await.unwrap() {
        Err(SessionError::Frame(FrameError::BadMessageLength { got: 0 })) => {}
        other => panic!("expected a frame error, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_error_codes_are_fatal() {
    let (transport, inbound, mut outbound) = mock_transport();
    let (session, _handle) = Session::new(transport, options(test_key()));
    let run = tokio::spawn(session.run());

    let _req_pq = outbound.recv().await.unwrap();
    inbound.send((-404i32).to_le_bytes().to_vec()).unwrap();

    match run.await.unwrap() {
        Err(SessionError::Frame(FrameError::TransportCode { code: -404 })) => {}
        other => panic!("expected a transport code error, got {other:?}"),
    }
}

#[tokio::test]
async fn closing_the_transport_ends_the_session_cleanly() {
    let (transport, inbound, mut outbound) = mock_transport();
    let (session, _handle) = Session::new(transport, options(test_key()));
    let run = tokio::spawn(session.run());

    let _req_pq = outbound.recv().await.unwrap();
    drop(inbound);

    run.await.unwrap().unwrap();
}

// The full story: handshake, bootstrap, and an unwrapped RPC result
// reaching a user handler, with this test playing the server.

/// The well-known 2048-bit Diffie-Hellman prime used with `g = 3`.
const DH_PRIME_HEX: &str = "\
    c71caeb9c6b1c9048e6c522f70f13f73980d40238e3e21c14934d037563d930f\
    48198a0aa7c14058229493d22530f4dbfa336f6e0ac925139543aed44cce7c37\
    20fd51f69458705ac68cd4fe6b6b13abdc9746512969328454f18faf8c595f64\
    2477fe96bb2a941d5bcd1d4ac8cc49880708fa9b378e3c4f3a9060bee67cf9a4\
    a4a695811051907e162753b56b0f6b410dba74d8a84b2a14b3144e0ef1284754\
    fd17ed950d5965b4b9dd46582db1178d169c6bc465b0d6ff9ca3928fef5b9ae4\
    e418fc15e83ebea0f87fa9ff5eed70050ded2849f47bf959d956850ce929851f\
    0d8115f635b105ee2e4e15d04b2454bf6f4fadf034b10403119cd8e3b92fcc5b";

#[tokio::test]
async fn session_completes_handshake_and_unwraps_rpc_results() {
    // A throwaway RSA key pair so this test can decrypt what the
    // handshake sends.
    let p = glass_pumpkin::prime::new(1024).unwrap();
    let q = glass_pumpkin::prime::new(1024).unwrap();
    let n = &p * &q;
    let e = BigUint::from(65537u32);
    let d = e.modinv(&((&p - 1u32) * (&q - 1u32))).unwrap();
    let pub_key = rsa::Key::from_bytes(&n.to_bytes_be(), &e.to_bytes_be());

    let dh_prime = BigUint::from_bytes_be(&hex::from_hex(DH_PRIME_HEX));
    let g = BigUint::from(3u32);
    let a = BigUint::from_bytes_be(&[0x0b; 256]);
    let server_nonce = [7u8; 16];

    let (transport, inbound, mut outbound) = mock_transport();
    let (mut session, handle) = Session::new(transport, options(pub_key));

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    session.add_handler(move |event| match event {
        Event::Object(Object::NearestDc(dc)) => {
            seen_tx.send(dc.clone()).unwrap();
            Ok(Handled::Replies(Vec::new()))
        }
        _ => Ok(Handled::NotHandled),
    });

    let run = tokio::spawn(session.run());

    // Round 1: req_pq_multi -> resPQ.
    let frame = outbound.recv().await.unwrap();
    let Object::ReqPqMulti(req_pq) = Object::from_bytes(plain_payload(&frame)).unwrap() else {
        panic!("expected req_pq_multi")
    };
    inbound
        .send(plain_frame(&Object::ResPq(tl::types::ResPq {
            nonce: req_pq.nonce,
            server_nonce,
            pq: 0x17ED48941A08F981u64.to_be_bytes().to_vec(),
            server_public_key_fingerprints: vec![test_fingerprint(&n, &e)],
        })))
        .unwrap();

    // Round 2: req_DH_params -> server_DH_params_ok.
    let frame = outbound.recv().await.unwrap();
    let Object::ReqDhParams(req_dh) = Object::from_bytes(plain_payload(&frame)).unwrap() else {
        panic!("expected req_DH_params")
    };
    let new_nonce = {
        let number = BigUint::from_bytes_be(&req_dh.encrypted_data).modpow(&d, &n);
        let mut block = number.to_bytes_be();
        while block.len() < 255 {
            block.insert(0, 0);
        }
        let mut cursor = tl::Cursor::from_slice(&block[20..]);
        use ferrogram_tl_types::Deserializable;
        let tl::enums::PQInnerData::Data(inner) =
            tl::enums::PQInnerData::deserialize(&mut cursor).unwrap();
        inner.new_nonce
    };
    let (tmp_key, tmp_iv) = generate_key_data_from_nonce(&server_nonce, &new_nonce);
    let answer = tl::enums::ServerDhInnerData::Data(tl::types::ServerDhInnerData {
        nonce: req_pq.nonce,
        server_nonce,
        g: 3,
        dh_prime: dh_prime.to_bytes_be(),
        g_a: g.modpow(&a, &dh_prime).to_bytes_be(),
        server_time: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i32,
    })
    .to_bytes();
    let hashed_answer = {
        let mut buffer = Vec::new();
        buffer.extend(sha1!(&answer));
        buffer.extend(&answer);
        while buffer.len() % 16 != 0 {
            buffer.push(0);
        }
        buffer
    };
    inbound
        .send(plain_frame(&Object::ServerDhParamsOk(
            tl::types::ServerDhParamsOk {
                nonce: req_pq.nonce,
                server_nonce,
                encrypted_answer: aes::ige_encrypt(&hashed_answer, &tmp_key, &tmp_iv),
            },
        )))
        .unwrap();

    // Round 3: set_client_DH_params -> dh_gen_ok.
    let frame = outbound.recv().await.unwrap();
    let Object::SetClientDhParams(set_dh) = Object::from_bytes(plain_payload(&frame)).unwrap()
    else {
        panic!("expected set_client_DH_params")
    };
    let auth_key = {
        let plain = aes::ige_decrypt(&set_dh.encrypted_data, &tmp_key, &tmp_iv);
        let mut cursor = tl::Cursor::from_slice(&plain[20..]);
        use ferrogram_tl_types::Deserializable;
        let tl::enums::ClientDhInnerData::Data(inner) =
            tl::enums::ClientDhInnerData::deserialize(&mut cursor).unwrap();
        let gab = BigUint::from_bytes_be(&inner.g_b).modpow(&a, &dh_prime);
        let mut buffer = [0; 256];
        let bytes = gab.to_bytes_be();
        buffer[256 - bytes.len()..].copy_from_slice(&bytes);
        AuthKey::from_bytes(buffer)
    };
    inbound
        .send(plain_frame(&Object::DhGenOk(tl::types::DhGenOk {
            nonce: req_pq.nonce,
            server_nonce,
            new_nonce_hash1: auth_key.calc_new_nonce_hash(&new_nonce, 1),
        })))
        .unwrap();

    // The bootstrap arrives encrypted under the fresh key.
    let frame = outbound.recv().await.unwrap();
    let (plaintext, _) = decrypt_data_v1(&frame, &auth_key, Side::Client).unwrap();
    let session_id: [u8; 8] = plaintext[8..16].try_into().unwrap();
    assert_ne!(session_id, [0; 8]);
    let msg_id = i64::from_le_bytes(plaintext[16..24].try_into().unwrap());
    let len = i32::from_le_bytes(plaintext[28..32].try_into().unwrap()) as usize;

    let Object::InvokeWithLayer(invoke) = Object::from_bytes(&plaintext[32..32 + len]).unwrap()
    else {
        panic!("expected invokeWithLayer")
    };
    assert_eq!(invoke.layer, tl::LAYER);
    let Object::InitConnection(init) = Object::from_bytes(&invoke.query.0).unwrap() else {
        panic!("expected initConnection")
    };
    assert_eq!(init.api_id, 1234);
    let Object::HelpGetNearestDc(_) = Object::from_bytes(&init.query.0).unwrap() else {
        panic!("expected help.getNearestDc")
    };

    // Answer with rpc_result(nearestDc); the session must unwrap it and
    // re-dispatch the inner object to the user handler.
    let reply = Object::RpcResult(tl::types::RpcResult {
        req_msg_id: msg_id,
        result: Blob(
            Object::NearestDc(tl::types::NearestDc {
                country: "US".to_string(),
                this_dc: 2,
                nearest_dc: 2,
            })
            .to_bytes(),
        ),
    });
    let envelope = {
        let mut buffer = Vec::new();
        0i64.serialize(&mut buffer); // salt, unvalidated
        buffer.extend(&session_id);
        (msg_id + 1).serialize(&mut buffer);
        3i32.serialize(&mut buffer);
        let payload = reply.to_bytes();
        (payload.len() as i32).serialize(&mut buffer);
        buffer.extend(&payload);
        buffer
    };
    inbound
        .send(encrypt_data_v1(&envelope, &auth_key, Side::Server))
        .unwrap();

    let dc = seen_rx.recv().await.unwrap();
    assert_eq!(dc.country, "US");
    assert_eq!(dc.this_dc, 2);
    assert_eq!(dc.nearest_dc, 2);

    handle.close().await;
    run.await.unwrap().unwrap();
}

/// Computes the fingerprint of `(n, e)` the way the advertised list
/// would carry it.
fn test_fingerprint(n: &BigUint, e: &BigUint) -> i64 {
    rsa::Key::from_bytes(&n.to_bytes_be(), &e.to_bytes_be()).fingerprint()
}
