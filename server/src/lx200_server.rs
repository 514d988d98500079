// Serves the Meade LX200 protocol from a simulated mount.
//
// References for LX200 command set include:
//    https://www.astro.louisville.edu/software/xmtel/archive/xmtel-indi-6.0/xmtel-6.0l/support/lx200/CommandSet.html
//    https://interactiveastronomy.com/lx-200gps_telescope_protocol_2010-10.pdf
//    https://skymtn.com/mapug-astronomy/ragreiner/LX200Commands.html
//
// Copyright (c) 2025 Omair Kamil
// See LICENSE file in root directory for license terms.

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use canonical_error::{unavailable_error, CanonicalError};
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::command::{decode, Command};
use crate::frame_reader::{Frame, FrameReader};
use crate::mount::Mount;

#[async_trait]
pub trait Lx200Telescope {
    async fn serve_requests(&mut self) -> Result<(), CanonicalError>;
}

/// Accepts LX200 clients over TCP. Each connection gets its own session;
/// all sessions drive the same mount.
pub struct Lx200TcpTelescope {
    listener: TcpListener,
    mount: Arc<Mutex<Mount>>,
}

#[async_trait]
impl Lx200Telescope for Lx200TcpTelescope {
    async fn serve_requests(&mut self) -> Result<(), CanonicalError> {
        info!("Running LX200 server on: {}", self.local_addr()?);
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!("LX200 client connected: {}", peer);
                    let mut session = Lx200Session::new(self.mount.clone());
                    tokio::spawn(async move {
                        session.handle_connection(stream).await;
                        info!("LX200 client disconnected: {}", peer);
                    });
                }
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

impl Lx200TcpTelescope {
    pub async fn bind(
        addr: SocketAddr,
        mount: Arc<Mutex<Mount>>,
    ) -> Result<Self, CanonicalError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            unavailable_error(&format!(
                "Could not bind LX200 server to {}: {}", addr, e))
        })?;
        Ok(Lx200TcpTelescope { listener, mount })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, CanonicalError> {
        self.listener.local_addr().map_err(|e| {
            unavailable_error(&format!("LX200 listener has no address: {}", e))
        })
    }
}

pub async fn create_lx200_server(
    addr: SocketAddr,
    mount: Arc<Mutex<Mount>>,
) -> Result<Lx200TcpTelescope, CanonicalError> {
    Lx200TcpTelescope::bind(addr, mount).await
}

/// One client connection: frames the incoming bytes, decodes each command,
/// applies it to the mount and writes back the encoded replies.
pub struct Lx200Session {
    mount: Arc<Mutex<Mount>>,
    reader: FrameReader,
}

impl Lx200Session {
    pub fn new(mount: Arc<Mutex<Mount>>) -> Self {
        Lx200Session { mount, reader: FrameReader::new() }
    }

    pub async fn handle_connection<S>(&mut self, mut stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buffer = [0; 1024];

        debug!("Starting to read from LX200 connection");
        loop {
            match stream.read(&mut buffer).await {
                Ok(0) => {
                    debug!("Client closed connection");
                    break;
                }
                Ok(n) => {
                    let reply = self.process_input(&buffer[..n], SystemTime::now()).await;
                    if reply.is_empty() {
                        continue;
                    }
                    debug!("Writing to client: {:?}", String::from_utf8_lossy(&reply));
                    if let Err(e) = stream.write_all(&reply).await {
                        warn!("Failed to send data to client: {}", e);
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {
                    // Interruption is recoverable, try reading again
                    continue;
                }
                Err(e) => {
                    debug!("Error reading from stream: {}", e);
                    break;
                }
            }
        }
    }

    /// Returns the replies to every command completed by `input`, in order.
    /// The mount is locked once for the whole batch.
    pub async fn process_input(&mut self, input: &[u8], now: SystemTime) -> Vec<u8> {
        let frames: Vec<Frame> = self.reader.feed(input).collect();
        if frames.is_empty() {
            return Vec::new();
        }
        let mut reply = Vec::new();
        let mut mount = self.mount.lock().await;
        for frame in frames {
            let response = match decode(&frame) {
                Ok(command) => {
                    if let Command::Unknown(raw) = &command {
                        debug!("Unsupported command {:?}", String::from_utf8_lossy(raw));
                    } else {
                        debug!("Received {:?}", command);
                    }
                    mount.apply(&command, now)
                }
                Err(e) => {
                    warn!("Rejected LX200 command: {}", e);
                    e.negative_ack()
                }
            };
            reply.extend(response.encode());
        }
        reply
    }
}

/// Advances the mount every `period` so that slews complete and tracking
/// continues with no client connected.
pub async fn run_tick_loop(mount: Arc<Mutex<Mount>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        mount.lock().await.tick(SystemTime::now());
    }
}
