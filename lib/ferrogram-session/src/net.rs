// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A TCP transport speaking the "intermediate" envelope: every frame is
//! prefixed by its little-endian 4-byte length, and a new connection
//! announces the envelope with `0xeeeeeeee`.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::transport::{Transport, TransportRx, TransportTx};

const PROTOCOL_TAG: [u8; 4] = [0xee, 0xee, 0xee, 0xee];

/// A freshly connected TCP transport.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connects and announces the envelope.
    pub async fn connect(addr: SocketAddr) -> io::Result<Self> {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(&PROTOCOL_TAG).await?;
        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    type Tx = TcpTx;
    type Rx = TcpRx;

    fn split(self) -> (TcpTx, TcpRx) {
        let (reader, writer) = self.stream.into_split();
        (TcpTx { writer }, TcpRx { reader })
    }
}

pub struct TcpTx {
    writer: OwnedWriteHalf,
}

impl TransportTx for TcpTx {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(&(data.len() as u32).to_le_bytes()).await?;
        self.writer.write_all(data).await
    }

    async fn close(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}

pub struct TcpRx {
    reader: OwnedReadHalf,
}

impl TransportRx for TcpRx {
    async fn recv(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut len = [0; 4];
        match self.reader.read_exact(&mut len).await {
            Ok(_) => {}
            // End-of-stream on a frame boundary is a clean close.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        let mut frame = vec![0; u32::from_le_bytes(len) as usize];
        self.reader.read_exact(&mut frame).await?;
        Ok(Some(frame))
    }
}
