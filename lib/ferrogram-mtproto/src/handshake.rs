// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The three-round handshake that produces an authorization key.
//!
//! The exchange is a state machine driven by received objects:
//!
//! 1. [`KeyExchange::start`] emits `req_pq_multi`.
//! 2. `resPQ` is answered with `req_DH_params` (factorization plus the
//!    RSA-protected `p_q_inner_data`).
//! 3. `server_DH_params_ok` is answered with `set_client_DH_params`
//!    (completing the Diffie-Hellman exchange).
//! 4. `dh_gen_ok` finishes the handshake; `dh_gen_retry` repeats round 3
//!    with a fresh secret, and `dh_gen_fail` is fatal.
//!
//! Objects that play no part in the handshake are reported as
//! [`Step::NotMine`] so a caller can offer them elsewhere.

use std::fmt;
use std::mem;
use std::time::{SystemTime, UNIX_EPOCH};

use getrandom::getrandom;
use num_bigint::BigUint;

use ferrogram_crypto::factorize::factorize;
use ferrogram_crypto::{aes, generate_key_data_from_nonce, rsa, sha1, AuthKey};
use ferrogram_tl_types::{self as tl, Cursor, Deserializable, Object, Serializable};

/// What the handshake produced: everything an encrypted session needs.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthResult {
    /// The negotiated 256-byte authorization key.
    pub auth_key: AuthKey,

    /// The first server salt, derived from the nonces.
    pub server_salt: i64,

    /// The session identifier. The handshake leaves it zeroed; the
    /// session fills it with random bytes before first use.
    pub session_id: [u8; 8],

    /// Seconds to add to the local clock to agree with the server.
    pub time_offset: i32,
}

/// The outcome of feeding one object to the state machine.
#[derive(Debug, PartialEq)]
pub enum Step {
    /// The handshake advanced and wants this object sent to the server.
    Reply(Object),

    /// The handshake is complete.
    Done(AuthResult),

    /// The object is not a handshake object; it belongs to someone else.
    NotMine,
}

/// An error that ends the handshake. All of these are fatal.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The server echoed a different nonce than the one we sent.
    InvalidNonce {
        got: [u8; 16],
        expected: [u8; 16],
    },

    /// The server changed its own nonce mid-exchange.
    InvalidServerNonce {
        got: [u8; 16],
        expected: [u8; 16],
    },

    /// The `pq` value was not the expected 8 bytes.
    InvalidPqSize { size: usize },

    /// Our public key's fingerprint was not in the server's list.
    UnknownFingerprints { fingerprints: Vec<i64> },

    /// The server reported failure to produce Diffie-Hellman parameters.
    DhParamsFail,

    /// The server's encrypted answer was not block aligned.
    EncryptedResponseNotPadded { len: usize },

    /// The decrypted Diffie-Hellman answer did not parse.
    InvalidDhInnerData { error: tl::deserialize::Error },

    /// The hash prefixing the Diffie-Hellman answer did not match it.
    InvalidAnswerHash {
        got: [u8; 20],
        expected: [u8; 20],
    },

    /// One of `g`, `g_a` or `g_b` was outside its safe range.
    GParameterOutOfRange {
        value: BigUint,
        low: BigUint,
        high: BigUint,
    },

    /// The server rejected the generated key for good.
    DhGenFail,

    /// The hash over the new key and nonce did not match.
    InvalidNewNonceHash {
        got: [u8; 16],
        expected: [u8; 16],
    },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNonce { got, expected } => {
                write!(f, "invalid nonce: got {got:02x?}, expected {expected:02x?}")
            }
            Self::InvalidServerNonce { got, expected } => write!(
                f,
                "invalid server nonce: got {got:02x?}, expected {expected:02x?}"
            ),
            Self::InvalidPqSize { size } => write!(f, "invalid pq size {size}"),
            Self::UnknownFingerprints { fingerprints } => {
                write!(f, "all server fingerprints are unknown: {fingerprints:?}")
            }
            Self::DhParamsFail => write!(f, "the server failed to provide DH parameters"),
            Self::EncryptedResponseNotPadded { len } => write!(
                f,
                "the encrypted server response was {len} bytes long, which is not padded"
            ),
            Self::InvalidDhInnerData { error } => {
                write!(f, "could not deserialize DH inner data: {error}")
            }
            Self::InvalidAnswerHash { got, expected } => write!(
                f,
                "invalid answer hash: got {got:02x?}, expected {expected:02x?}"
            ),
            Self::GParameterOutOfRange { value, low, high } => write!(
                f,
                "the parameter g = {value} was not in the range {low}..{high}"
            ),
            Self::DhGenFail => write!(f, "the generation of DH parameters failed"),
            Self::InvalidNewNonceHash { got, expected } => write!(
                f,
                "invalid new nonce hash: got {got:02x?}, expected {expected:02x?}"
            ),
        }
    }
}

/// Data kept between sending `set_client_DH_params` and the server's
/// verdict; a retry re-runs the client side of round 3 from here.
struct PendingGen {
    nonce: [u8; 16],
    server_nonce: [u8; 16],
    new_nonce: [u8; 32],
    g: BigUint,
    dh_prime: BigUint,
    g_a: BigUint,
    tmp_key: [u8; 32],
    tmp_iv: [u8; 32],
    gab: BigUint,
    time_offset: i32,
}

enum State {
    Idle,
    WaitingPq {
        nonce: [u8; 16],
    },
    WaitingDhParams {
        nonce: [u8; 16],
        server_nonce: [u8; 16],
        new_nonce: [u8; 32],
    },
    WaitingDhGen(Box<PendingGen>),
    Finished,
}

/// The handshake state machine.
pub struct KeyExchange {
    pub_key: rsa::Key,
    state: State,
}

impl KeyExchange {
    pub fn new(pub_key: rsa::Key) -> Self {
        Self {
            pub_key,
            state: State::Idle,
        }
    }

    /// Whether the exchange has produced its [`AuthResult`].
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished)
    }

    /// Begins (or restarts) the exchange, returning the `req_pq_multi`
    /// to send.
    pub fn start(&mut self) -> Object {
        let nonce = random_bytes::<16>();
        self.state = State::WaitingPq { nonce };
        log::debug!("key exchange started");
        Object::ReqPqMulti(tl::functions::ReqPqMulti { nonce })
    }

    /// Feeds one received object to the state machine.
    ///
    /// Errors are fatal: the exchange stays unusable until restarted
    /// with [`KeyExchange::start`].
    pub fn handle(&mut self, obj: &Object) -> Result<Step, Error> {
        match (mem::replace(&mut self.state, State::Idle), obj) {
            (State::WaitingPq { nonce }, Object::ResPq(res_pq)) => self.round2(nonce, res_pq),
            (
                State::WaitingDhParams {
                    nonce,
                    server_nonce,
                    new_nonce,
                },
                Object::ServerDhParamsOk(ok),
            ) => self.round3(nonce, server_nonce, new_nonce, ok),
            (
                State::WaitingDhParams {
                    nonce,
                    server_nonce,
                    new_nonce,
                },
                Object::ServerDhParamsFail(fail),
            ) => {
                check_nonce(&fail.nonce, &nonce)?;
                check_server_nonce(&fail.server_nonce, &server_nonce)?;

                let mut expected = [0; 16];
                expected.copy_from_slice(&sha1!(new_nonce)[4..20]);
                check_new_nonce_hash(&fail.new_nonce_hash, &expected)?;

                Err(Error::DhParamsFail)
            }
            (State::WaitingDhGen(pending), Object::DhGenOk(ok)) => {
                check_nonce(&ok.nonce, &pending.nonce)?;
                check_server_nonce(&ok.server_nonce, &pending.server_nonce)?;

                let auth_key = auth_key_from_gab(&pending.gab);
                let expected = auth_key.calc_new_nonce_hash(&pending.new_nonce, 1);
                check_new_nonce_hash(&ok.new_nonce_hash1, &expected)?;

                let server_salt = {
                    let mut salt = [0; 8];
                    salt.iter_mut()
                        .zip(&pending.new_nonce[..8])
                        .zip(&pending.server_nonce[..8])
                        .for_each(|((s, a), b)| *s = a ^ b);
                    i64::from_le_bytes(salt)
                };

                self.state = State::Finished;
                log::debug!("key exchange finished");
                Ok(Step::Done(AuthResult {
                    auth_key,
                    server_salt,
                    session_id: [0; 8],
                    time_offset: pending.time_offset,
                }))
            }
            (State::WaitingDhGen(mut pending), Object::DhGenRetry(retry)) => {
                check_nonce(&retry.nonce, &pending.nonce)?;
                check_server_nonce(&retry.server_nonce, &pending.server_nonce)?;

                let auth_key = auth_key_from_gab(&pending.gab);
                let expected = auth_key.calc_new_nonce_hash(&pending.new_nonce, 2);
                check_new_nonce_hash(&retry.new_nonce_hash2, &expected)?;

                log::debug!("server asked to retry DH generation");
                let (reply, gab) = client_dh_reply(&pending)?;
                pending.gab = gab;
                self.state = State::WaitingDhGen(pending);
                Ok(Step::Reply(reply))
            }
            (State::WaitingDhGen(pending), Object::DhGenFail(fail)) => {
                check_nonce(&fail.nonce, &pending.nonce)?;
                check_server_nonce(&fail.server_nonce, &pending.server_nonce)?;

                let auth_key = auth_key_from_gab(&pending.gab);
                let expected = auth_key.calc_new_nonce_hash(&pending.new_nonce, 3);
                check_new_nonce_hash(&fail.new_nonce_hash3, &expected)?;

                Err(Error::DhGenFail)
            }
            // Not a handshake object (or not one we expect right now);
            // leave the state untouched.
            (state, _) => {
                self.state = state;
                Ok(Step::NotMine)
            }
        }
    }

    fn round2(&mut self, nonce: [u8; 16], res_pq: &tl::types::ResPq) -> Result<Step, Error> {
        check_nonce(&res_pq.nonce, &nonce)?;

        if res_pq.pq.len() != 8 {
            return Err(Error::InvalidPqSize {
                size: res_pq.pq.len(),
            });
        }
        let pq = u64::from_be_bytes(res_pq.pq[..].try_into().unwrap());
        let (p, q) = factorize(pq);
        log::debug!("factorized {pq:#x} into {p:#x} * {q:#x}");

        let fingerprint = self.pub_key.fingerprint();
        if !res_pq.server_public_key_fingerprints.contains(&fingerprint) {
            return Err(Error::UnknownFingerprints {
                fingerprints: res_pq.server_public_key_fingerprints.clone(),
            });
        }

        let new_nonce = random_bytes::<32>();
        let p = trim_leading_zeros(&p.to_be_bytes());
        let q = trim_leading_zeros(&q.to_be_bytes());

        let pq_inner_data = tl::enums::PQInnerData::Data(tl::types::PQInnerData {
            pq: res_pq.pq.clone(),
            p: p.clone(),
            q: q.clone(),
            nonce,
            server_nonce: res_pq.server_nonce,
            new_nonce,
        })
        .to_bytes();

        let random = random_bytes::<256>();
        let encrypted_data = rsa::encrypt_hashed(&pq_inner_data, &self.pub_key, &random);

        self.state = State::WaitingDhParams {
            nonce,
            server_nonce: res_pq.server_nonce,
            new_nonce,
        };
        Ok(Step::Reply(Object::ReqDhParams(tl::functions::ReqDhParams {
            nonce,
            server_nonce: res_pq.server_nonce,
            p,
            q,
            public_key_fingerprint: fingerprint,
            encrypted_data,
        })))
    }

    fn round3(
        &mut self,
        nonce: [u8; 16],
        server_nonce: [u8; 16],
        new_nonce: [u8; 32],
        ok: &tl::types::ServerDhParamsOk,
    ) -> Result<Step, Error> {
        check_nonce(&ok.nonce, &nonce)?;
        check_server_nonce(&ok.server_nonce, &server_nonce)?;

        if ok.encrypted_answer.is_empty() || ok.encrypted_answer.len() % 16 != 0 {
            return Err(Error::EncryptedResponseNotPadded {
                len: ok.encrypted_answer.len(),
            });
        }

        let (tmp_key, tmp_iv) = generate_key_data_from_nonce(&server_nonce, &new_nonce);
        let answer = aes::ige_decrypt(&ok.encrypted_answer, &tmp_key, &tmp_iv);
        if answer.len() < 20 {
            return Err(Error::EncryptedResponseNotPadded { len: answer.len() });
        }

        // sha1 prefix + inner data + random padding
        let mut cursor = Cursor::from_slice(&answer[20..]);
        let inner = match tl::enums::ServerDhInnerData::deserialize(&mut cursor) {
            Ok(tl::enums::ServerDhInnerData::Data(inner)) => inner,
            Err(error) => return Err(Error::InvalidDhInnerData { error }),
        };

        let got_hash = {
            let mut hash = [0; 20];
            hash.copy_from_slice(&answer[..20]);
            hash
        };
        let expected_hash = sha1!(&answer[20..20 + cursor.pos()]);
        if got_hash != expected_hash {
            return Err(Error::InvalidAnswerHash {
                got: got_hash,
                expected: expected_hash,
            });
        }

        check_nonce(&inner.nonce, &nonce)?;
        check_server_nonce(&inner.server_nonce, &server_nonce)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time is before epoch")
            .as_secs() as i32;
        let time_offset = inner.server_time - now;

        let one = BigUint::from(1u8);
        let dh_prime = BigUint::from_bytes_be(&inner.dh_prime);
        let g_a = BigUint::from_bytes_be(&inner.g_a);
        let g = BigUint::from(u32::try_from(inner.g).map_err(|_| Error::GParameterOutOfRange {
            value: BigUint::from(0u8),
            low: one.clone(),
            high: &dh_prime - &one,
        })?);

        let mut pending = Box::new(PendingGen {
            nonce,
            server_nonce,
            new_nonce,
            g,
            dh_prime,
            g_a,
            tmp_key,
            tmp_iv,
            gab: BigUint::from(0u8),
            time_offset,
        });

        let (reply, gab) = client_dh_reply(&pending)?;
        pending.gab = gab;
        self.state = State::WaitingDhGen(pending);
        Ok(Step::Reply(reply))
    }
}

/// The client half of round 3: picks a fresh secret `b`, checks every
/// parameter range, and builds the encrypted `set_client_DH_params`.
fn client_dh_reply(pending: &PendingGen) -> Result<(Object, BigUint), Error> {
    let PendingGen {
        nonce,
        server_nonce,
        g,
        dh_prime,
        g_a,
        tmp_key,
        tmp_iv,
        ..
    } = pending;

    let b = BigUint::from_bytes_be(&random_bytes::<256>());
    let g_b = g.modpow(&b, dh_prime);
    let gab = g_a.modpow(&b, dh_prime);

    // Both sides must check that g, g_a and g_b lie strictly between 1
    // and dh_prime - 1, and that g_a and g_b keep a 2^{2048-64} distance
    // from the borders.
    let one = BigUint::from(1u8);
    check_g_in_range(g, &one, &(dh_prime - &one))?;
    check_g_in_range(g_a, &one, &(dh_prime - &one))?;
    check_g_in_range(&g_b, &one, &(dh_prime - &one))?;

    let safety_range = &one << (2048 - 64);
    check_g_in_range(g_a, &safety_range, &(dh_prime - &safety_range))?;
    check_g_in_range(&g_b, &safety_range, &(dh_prime - &safety_range))?;

    let client_dh_inner = tl::enums::ClientDhInnerData::Data(tl::types::ClientDhInnerData {
        nonce: *nonce,
        server_nonce: *server_nonce,
        retry_id: 0,
        g_b: g_b.to_bytes_be(),
    })
    .to_bytes();

    let hashed = {
        let mut buffer = Vec::with_capacity(20 + client_dh_inner.len() + 15);
        buffer.extend(sha1!(&client_dh_inner));
        buffer.extend(&client_dh_inner);
        // Pad here rather than letting the cipher do it, so the padding
        // is part of what both sides hash.
        let padding = (16 - buffer.len() % 16) % 16;
        buffer.extend(&random_bytes::<16>()[..padding]);
        buffer
    };
    let encrypted_data = aes::ige_encrypt(&hashed, tmp_key, tmp_iv);

    Ok((
        Object::SetClientDhParams(tl::functions::SetClientDhParams {
            nonce: *nonce,
            server_nonce: *server_nonce,
            encrypted_data,
        }),
        gab,
    ))
}

fn auth_key_from_gab(gab: &BigUint) -> AuthKey {
    let mut buffer = [0; 256];
    let bytes = gab.to_bytes_be();
    // The number may need fewer than 256 bytes.
    buffer[256 - bytes.len()..].copy_from_slice(&bytes);
    AuthKey::from_bytes(buffer)
}

fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    match bytes.iter().position(|&b| b != 0) {
        Some(pos) => bytes[pos..].to_vec(),
        None => vec![0],
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buffer = [0; N];
    getrandom(&mut buffer).expect("failed to generate secure random data");
    buffer
}

fn check_nonce(got: &[u8; 16], expected: &[u8; 16]) -> Result<(), Error> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::InvalidNonce {
            got: *got,
            expected: *expected,
        })
    }
}

fn check_server_nonce(got: &[u8; 16], expected: &[u8; 16]) -> Result<(), Error> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::InvalidServerNonce {
            got: *got,
            expected: *expected,
        })
    }
}

fn check_new_nonce_hash(got: &[u8; 16], expected: &[u8; 16]) -> Result<(), Error> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::InvalidNewNonceHash {
            got: *got,
            expected: *expected,
        })
    }
}

fn check_g_in_range(value: &BigUint, low: &BigUint, high: &BigUint) -> Result<(), Error> {
    if low < value && value < high {
        Ok(())
    } else {
        Err(Error::GParameterOutOfRange {
            value: value.clone(),
            low: low.clone(),
            high: high.clone(),
        })
    }
}
