//! UDP client for the game's OSC input endpoint

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use crate::error::{FishingError, Result};

use super::message::{encode_int_message, USE_RIGHT_ADDRESS};

/// Default OSC receive host of the game.
pub const DEFAULT_OSC_HOST: &str = "127.0.0.1";
/// Default OSC receive port of the game.
pub const DEFAULT_OSC_PORT: u16 = 9000;

/// Something that can hold or release the in-game "use" button.
///
/// Implementations must not block beyond a single send and must not fail
/// loudly: a lost press or release is recovered by the next transition.
pub trait InputSink: Send + Sync {
    fn send_use_right(&self, active: bool);
}

/// Fire-and-forget OSC sender.
pub struct OscClient {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscClient {
    /// Create a client targeting `host:port`.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let target = (host, port)
            .to_socket_addrs()
            .and_then(|mut addrs| {
                addrs
                    .next()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address resolved"))
            })
            .map_err(|source| FishingError::InvalidTarget {
                target: format!("{}:{}", host, port),
                source,
            })?;

        let bind_addr: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).map_err(FishingError::SocketBind)?;

        tracing::debug!("[OSC] Sending input to {}", target);
        Ok(Self { socket, target })
    }

    /// Address datagrams are sent to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl InputSink for OscClient {
    fn send_use_right(&self, active: bool) {
        let message = encode_int_message(USE_RIGHT_ADDRESS, i32::from(active));
        if let Err(e) = self.socket.send_to(&message, self.target) {
            tracing::warn!("[OSC] Failed to send UseRight={} to {}: {}", active, self.target, e);
        }
    }
}
