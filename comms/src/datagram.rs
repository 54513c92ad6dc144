//! Raw JPEG-over-UDP transport: one encoded frame per datagram, no framing,
//! sequencing or loss recovery.

use std::{io, net::SocketAddr};

use log::debug;
use tokio::net::{ToSocketAddrs, UdpSocket};

use crate::{Frame, MAX_DATAGRAM_PAYLOAD, RECV_BUF_SIZE, decode_jpeg};

/// The sending end of a datagram frame stream.
pub struct DatagramSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl DatagramSender {
    /// Creates a new `DatagramSender` bound to `bind` that sends to `target`.
    ///
    /// # Arguments
    /// * `bind` - The local address to bind, usually `0.0.0.0:0`.
    /// * `target` - The remote receiver's address.
    ///
    /// # Returns
    /// A new sender or an `io::Error` if binding or resolving failed.
    pub async fn connect<A, B>(bind: A, target: B) -> io::Result<Self>
    where
        A: ToSocketAddrs,
        B: ToSocketAddrs,
    {
        let socket = UdpSocket::bind(bind).await?;
        let target = tokio::net::lookup_host(target)
            .await?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "unresolvable target"))?;

        Ok(Self { socket, target })
    }

    /// Returns the address datagrams are sent to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Sends a single encoded frame as one datagram.
    ///
    /// # Arguments
    /// * `jpeg` - The encoded frame.
    ///
    /// # Returns
    /// An `io::Error` of kind `InvalidInput` if the frame doesn't fit in a
    /// datagram, or whatever the socket returns on failure.
    pub async fn send(&self, jpeg: &[u8]) -> io::Result<()> {
        if jpeg.len() > MAX_DATAGRAM_PAYLOAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "encoded frame is {} bytes, a datagram holds at most {MAX_DATAGRAM_PAYLOAD}",
                    jpeg.len()
                ),
            ));
        }

        self.socket.send_to(jpeg, self.target).await?;
        Ok(())
    }
}

/// The receiving end of a datagram frame stream.
pub struct DatagramReceiver {
    socket: UdpSocket,
    buf: Box<[u8]>,
    dropped: u64,
}

impl DatagramReceiver {
    /// Binds a new `DatagramReceiver` to `addr`.
    ///
    /// # Arguments
    /// * `addr` - The local address to listen on.
    ///
    /// # Returns
    /// A new receiver or an `io::Error` if binding failed.
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;

        Ok(Self {
            socket,
            buf: vec![0; RECV_BUF_SIZE].into_boxed_slice(),
            dropped: 0,
        })
    }

    /// Returns the bound local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Returns how many datagrams were dropped because they didn't decode.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Waits for the next datagram that decodes into a frame.
    ///
    /// Datagrams that aren't valid JPEG images are dropped silently.
    ///
    /// # Returns
    /// The decoded frame or an `io::Error` if the socket failed.
    pub async fn recv(&mut self) -> io::Result<Frame> {
        loop {
            let (n, peer) = self.socket.recv_from(&mut self.buf).await?;

            match decode_jpeg(&self.buf[..n]) {
                Some(frame) => return Ok(frame),
                None => {
                    self.dropped += 1;
                    debug!(len = n; "dropping undecodable datagram from {peer}");
                }
            }
        }
    }
}
