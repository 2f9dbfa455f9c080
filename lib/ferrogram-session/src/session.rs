// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::VecDeque;

use getrandom::getrandom;
use tokio::sync::mpsc;

use ferrogram_crypto::{hex, rsa};
use ferrogram_mtproto::handshake::Step;
use ferrogram_mtproto::manual_tl::GzipPacked;
use ferrogram_mtproto::{Framer, KeyExchange, Msg, MsgKind};
use ferrogram_tl_types::{self as tl, name_for_id, Blob, Object, Serializable};

use crate::errors::SessionError;
use crate::transport::{Transport, TransportRx, TransportTx};

/// Configuration for a [`Session`].
pub struct SessionOptions {
    /// The server's RSA public key, used during the handshake.
    pub pub_key: rsa::Key,

    /// The application identifier sent in `initConnection`.
    pub api_id: i32,

    /// The application hash paired with `api_id`. The core itself does
    /// not consume it, but everything layered on top does.
    pub api_hash: String,

    /// How chatty the session is: `0` is quiet, `1` logs message flow,
    /// `2` additionally logs payload bytes.
    pub verbose: u8,
}

/// Synthetic events delivered to the handler chain without a payload,
/// used to drive state transitions from within the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pseudo {
    /// Kicks off the key exchange.
    KeyExStart,

    /// The key exchange finished and the auth key is installed.
    HandshakeDone,
}

/// What the handler chain is invoked with: a received object, or a
/// pseudo-event.
#[derive(Clone, Copy, Debug)]
pub enum Event<'a> {
    Object(&'a Object),
    Pseudo(Pseudo),
}

/// A handler's verdict on an event.
pub enum Handled {
    /// Not interested; try the next handler.
    NotHandled,

    /// Handled; send these replies (possibly none).
    Replies(Vec<Object>),
}

pub type HandlerResult = Result<Handled, SessionError>;

type Handler = Box<dyn FnMut(Event<'_>) -> HandlerResult + Send>;

enum Command {
    Send(Object),
    Notify(Pseudo),
    Close,
}

/// A cloneable handle to a running [`Session`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Submits an object for sending. Returns `false` if the session is
    /// gone.
    pub async fn send(&self, obj: Object) -> bool {
        self.commands.send(Command::Send(obj)).await.is_ok()
    }

    /// Injects a pseudo-event into the handler chain.
    pub async fn notify(&self, pseudo: Pseudo) -> bool {
        self.commands.send(Command::Notify(pseudo)).await.is_ok()
    }

    /// Asks the session to close its transport and stop.
    pub async fn close(&self) -> bool {
        self.commands.send(Command::Close).await.is_ok()
    }
}

/// A single connection to the server: one transport, one framer, one
/// key exchange, and a chain of handlers.
///
/// All state lives on the session's own loop; handlers need no locking.
pub struct Session<T: Transport> {
    options: SessionOptions,
    tx: T::Tx,
    rx: Option<T::Rx>,
    framer: Framer,
    keyex: KeyExchange,
    handlers: Vec<Handler>,
    commands: Option<mpsc::Receiver<Command>>,
    pending: VecDeque<Pseudo>,
    err: Option<SessionError>,
}

impl<T: Transport> Session<T> {
    /// Creates a session over a connected transport, along with the
    /// handle used to talk to it while it runs.
    pub fn new(transport: T, options: SessionOptions) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(1);
        let (tx, rx) = transport.split();
        let keyex = KeyExchange::new(options.pub_key.clone());

        (
            Self {
                options,
                tx,
                rx: Some(rx),
                framer: Framer::new(),
                keyex,
                handlers: Vec::new(),
                commands: Some(command_rx),
                pending: VecDeque::new(),
                err: None,
            },
            SessionHandle {
                commands: command_tx,
            },
        )
    }

    /// Appends a handler to the chain. Handlers run in registration
    /// order, after the built-in ones.
    pub fn add_handler(
        &mut self,
        handler: impl FnMut(Event<'_>) -> HandlerResult + Send + 'static,
    ) {
        self.handlers.push(Box::new(handler));
    }

    /// Runs the session until the transport closes, [`SessionHandle::close`]
    /// is called, or the first error. The error, if any, is returned once
    /// everything has been torn down.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let (inbound_tx, mut inbound_rx) = mpsc::channel::<Vec<u8>>(1);
        let (fail_tx, mut fail_rx) = mpsc::channel::<std::io::Error>(1);

        // The reader task blocks on the transport and publishes inbound
        // frames; dropping its sender closes the inbound channel.
        let mut rx = self.rx.take().expect("run must only be called once");
        let reader = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(Some(frame)) => {
                        if inbound_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = fail_tx.send(e).await;
                        break;
                    }
                }
            }
        });

        let mut commands = self.commands.take().expect("run must only be called once");

        if self.options.verbose >= 2 {
            log::debug!("session running");
        }
        self.pending.push_back(Pseudo::KeyExStart);

        while self.err.is_none() {
            // Internally raised pseudo-events first, so a handshake that
            // just finished bootstraps before anything else is read.
            if let Some(pseudo) = self.pending.pop_front() {
                self.broadcast(pseudo).await;
                continue;
            }

            tokio::select! {
                frame = inbound_rx.recv() => match frame {
                    Some(raw) => self.handle_frame(raw).await,
                    None => break,
                },
                Some(error) = fail_rx.recv() => self.fail(SessionError::Transport(error)),
                command = commands.recv() => match command {
                    Some(Command::Send(obj)) => self.send_object(&obj).await,
                    Some(Command::Notify(pseudo)) => self.broadcast(pseudo).await,
                    Some(Command::Close) | None => break,
                },
            }
        }

        if self.options.verbose >= 2 {
            log::debug!("session quitting: {:?}", self.err);
        }

        reader.abort();
        self.tx.close().await;

        match self.err {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Records the first error; later ones are only logged.
    fn fail(&mut self, error: SessionError) {
        if self.err.is_none() {
            log::error!("session failed: {error}");
            self.err = Some(error);
        } else {
            log::debug!("session error after failure: {error}");
        }
    }

    /// Frames and sends one object. Nothing is sent once the session has
    /// failed.
    async fn send_object(&mut self, obj: &Object) {
        if self.err.is_some() {
            return;
        }

        // Everything before the handshake completes travels unencrypted
        // with the non-content numbering.
        let kind = if self.keyex.is_finished() {
            MsgKind::Content
        } else {
            MsgKind::KeyEx
        };
        let msg = Msg {
            payload: obj.to_bytes(),
            kind,
        };

        if self.options.verbose >= 2 {
            log::debug!(
                "sending {} ({} bytes, {:?}): {}",
                obj.name(),
                msg.payload.len(),
                msg.kind,
                hex::to_hex(&msg.payload)
            );
        } else if self.options.verbose >= 1 {
            log::debug!(
                "sending {} ({} bytes, {:?})",
                obj.name(),
                msg.payload.len(),
                msg.kind
            );
        }

        let raw = self.framer.format(&msg);
        if let Err(e) = self.tx.send(&raw).await {
            self.fail(SessionError::Transport(e));
        }
    }

    /// Parses one inbound frame and dispatches the object inside it.
    async fn handle_frame(&mut self, raw: Vec<u8>) {
        let msg = match self.framer.parse(&raw) {
            Ok(msg) => msg,
            Err(e) => {
                log::debug!("failed to parse {} inbound bytes: {e}", raw.len());
                self.fail(SessionError::Frame(e));
                return;
            }
        };

        let payload = match unpack_if_gzipped(msg.payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        let obj = match Object::from_bytes(&payload) {
            Ok(obj) => obj,
            Err(tl::deserialize::Error::UnexpectedConstructor { id })
                if Some(id) == peek_id(&payload) =>
            {
                // No factory for this tag; drop it at the boundary.
                log::info!("dropping unknown object {:08x} ({})", id, name_for_id(id));
                return;
            }
            Err(e) => {
                self.fail(SessionError::Codec(e));
                return;
            }
        };

        if self.options.verbose >= 2 {
            log::debug!(
                "received {} ({} bytes, {:?}): {}",
                obj.name(),
                payload.len(),
                msg.kind,
                hex::to_hex(&payload)
            );
        } else if self.options.verbose >= 1 {
            log::debug!("received {} ({} bytes, {:?})", obj.name(), payload.len(), msg.kind);
        }

        match self.dispatch_chain(Event::Object(&obj)) {
            Ok(Handled::NotHandled) => {
                log::info!("dropping unhandled message {}", obj.name());
            }
            Ok(Handled::Replies(replies)) => {
                for reply in replies {
                    self.send_object(&reply).await;
                }
            }
            Err(e) => self.fail(e),
        }
    }

    /// Delivers a pseudo-event to the whole chain. Unlike objects, every
    /// handler gets to see it; the replies of all of them are sent.
    async fn broadcast(&mut self, pseudo: Pseudo) {
        if self.options.verbose >= 1 {
            log::debug!("broadcasting {pseudo:?}");
        }

        match self.broadcast_chain(Event::Pseudo(pseudo)) {
            Ok(replies) => {
                for reply in replies {
                    self.send_object(&reply).await;
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn broadcast_chain(&mut self, event: Event<'_>) -> Result<Vec<Object>, SessionError> {
        let mut replies = Vec::new();

        if let Handled::Replies(batch) = self.builtin_key_exchange(event)? {
            replies.extend(batch);
        }
        if let Handled::Replies(batch) = self.builtin_bootstrap(event) {
            replies.extend(batch);
        }
        for handler in self.handlers.iter_mut() {
            if let Handled::Replies(batch) = handler(event)? {
                replies.extend(batch);
            }
        }

        Ok(replies)
    }

    /// Walks the chain (built-ins first, then user handlers) until one
    /// claims the event.
    fn dispatch_chain(&mut self, event: Event<'_>) -> HandlerResult {
        match self.builtin_key_exchange(event)? {
            Handled::NotHandled => {}
            handled => return Ok(handled),
        }
        match self.builtin_bootstrap(event) {
            Handled::NotHandled => {}
            handled => return Ok(handled),
        }
        match self.builtin_rpc_result(event)? {
            Handled::NotHandled => {}
            handled => return Ok(handled),
        }

        for handler in self.handlers.iter_mut() {
            match handler(event)? {
                Handled::NotHandled => continue,
                handled => return Ok(handled),
            }
        }

        Ok(Handled::NotHandled)
    }

    /// Built-in: drives the key exchange while it is unfinished.
    fn builtin_key_exchange(&mut self, event: Event<'_>) -> HandlerResult {
        if self.keyex.is_finished() {
            return Ok(Handled::NotHandled);
        }

        match event {
            Event::Pseudo(Pseudo::KeyExStart) => {
                let reply = self.keyex.start();
                Ok(Handled::Replies(vec![reply]))
            }
            Event::Object(obj) => match self.keyex.handle(obj)? {
                Step::Reply(reply) => Ok(Handled::Replies(vec![reply])),
                Step::Done(auth) => {
                    self.apply_auth(auth);
                    Ok(Handled::Replies(Vec::new()))
                }
                Step::NotMine => Ok(Handled::NotHandled),
            },
            Event::Pseudo(_) => Ok(Handled::NotHandled),
        }
    }

    /// Built-in: once the handshake is done, announce ourselves and ask
    /// for the nearest datacenter.
    fn builtin_bootstrap(&mut self, event: Event<'_>) -> Handled {
        if !matches!(event, Event::Pseudo(Pseudo::HandshakeDone)) {
            return Handled::NotHandled;
        }

        let query = tl::functions::help::GetNearestDc {}.to_bytes();
        let init = tl::functions::InitConnection {
            api_id: self.options.api_id,
            device_model: "Desktop".to_string(),
            system_version: std::env::consts::OS.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            lang_code: "en".to_string(),
            query: Blob(query),
        };
        let invoke = tl::functions::InvokeWithLayer {
            layer: tl::LAYER,
            query: Blob(init.to_bytes()),
        };

        Handled::Replies(vec![Object::InvokeWithLayer(invoke)])
    }

    /// Built-in: unwraps `rpc_result` and runs the inner object through
    /// the chain again.
    fn builtin_rpc_result(&mut self, event: Event<'_>) -> HandlerResult {
        let Event::Object(Object::RpcResult(result)) = event else {
            return Ok(Handled::NotHandled);
        };

        let body = match unpack_if_gzipped(result.result.0.clone()) {
            Ok(body) => body,
            Err(e) => return Err(e),
        };

        match Object::from_bytes(&body) {
            Ok(inner) => self.dispatch_chain(Event::Object(&inner)),
            Err(tl::deserialize::Error::UnexpectedConstructor { id })
                if Some(id) == peek_id(&body) =>
            {
                log::info!(
                    "dropping rpc result with unknown object {:08x} ({})",
                    id,
                    name_for_id(id)
                );
                Ok(Handled::Replies(Vec::new()))
            }
            Err(e) => Err(SessionError::Codec(e)),
        }
    }

    /// Installs the handshake product: fills in a session identifier if
    /// none was assigned, hands the key to the framer, and schedules the
    /// `HandshakeDone` pseudo-event.
    fn apply_auth(&mut self, mut auth: ferrogram_mtproto::AuthResult) {
        if auth.session_id == [0; 8] {
            getrandom(&mut auth.session_id).expect("failed to generate a session id");
        }

        self.framer.install_auth(&auth);
        self.pending.push_back(Pseudo::HandshakeDone);
    }
}

/// Transparently unwraps a `gzip_packed` body.
fn unpack_if_gzipped(payload: Vec<u8>) -> Result<Vec<u8>, SessionError> {
    if !GzipPacked::is_gzipped(&payload) {
        return Ok(payload);
    }
    let packed = GzipPacked::from_bytes(&payload).map_err(SessionError::Codec)?;
    packed.decompress().map_err(SessionError::Transport)
}

fn peek_id(payload: &[u8]) -> Option<u32> {
    payload
        .get(..4)
        .map(|bytes| u32::from_le_bytes(bytes.try_into().unwrap()))
}
