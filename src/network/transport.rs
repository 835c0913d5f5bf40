// UDP transport. A dedicated reader thread feeds raw datagrams into an mpsc
// channel; the gossip handler consumes them on its own thread.

use crate::error::{NodeError, Result};
use log::{error, info};
use std::net::{SocketAddr, UdpSocket};
use std::sync::mpsc;
use std::thread;

/// Largest datagram the receiver accepts
const MAX_DATAGRAM: usize = 65_507;

#[derive(Debug, Clone)]
pub struct Datagram {
    pub from: SocketAddr,
    pub bytes: Vec<u8>,
}

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn bind(port: u16) -> Result<UdpTransport> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .map_err(|e| NodeError::Network(format!("Failed to bind UDP port {port}: {e}")))?;
        info!("Listening on UDP port {port}");
        Ok(UdpTransport { socket })
    }

    /// Spawn the reader thread. Returns the channel the gossip handler
    /// drains; the thread runs until the socket is closed.
    pub fn start_receiver(&self) -> Result<mpsc::Receiver<Datagram>> {
        let socket = self
            .socket
            .try_clone()
            .map_err(|e| NodeError::Network(format!("Failed to clone UDP socket: {e}")))?;
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            let mut buffer = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv_from(&mut buffer) {
                    Ok((length, from)) => {
                        let datagram = Datagram {
                            from,
                            bytes: buffer[..length].to_vec(),
                        };
                        if sender.send(datagram).is_err() {
                            // Handler is gone; stop reading
                            return;
                        }
                    }
                    Err(e) => {
                        error!("UDP receive failed: {e}");
                        return;
                    }
                }
            }
        });
        Ok(receiver)
    }

    pub fn send(&self, to: SocketAddr, bytes: &[u8]) -> Result<()> {
        self.socket
            .send_to(bytes, to)
            .map_err(|e| NodeError::Network(format!("Failed to send to {to}: {e}")))?;
        Ok(())
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| NodeError::Network(format!("No local address: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_datagram_flows_through_the_channel() {
        // Ephemeral ports so test runs never collide
        let receiver_side = UdpTransport::bind(0).unwrap();
        let sender_side = UdpTransport::bind(0).unwrap();
        let inbox = receiver_side.start_receiver().unwrap();

        let port = receiver_side.local_addr().unwrap().port();
        let to: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        sender_side.send(to, b"ping").unwrap();

        let datagram = inbox.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(datagram.bytes, b"ping");
    }
}
