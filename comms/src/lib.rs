mod codec;
mod datagram;
mod mjpeg;
mod slot;

pub use codec::{FrameEncoder, decode_jpeg};
pub use datagram::{DatagramReceiver, DatagramSender};
pub use mjpeg::{MJPEG_CONTENT_TYPE, encode_part, write_part};
pub use slot::LatestFrame;

/// A single decoded video frame, 8 bits per channel RGB.
pub type Frame = image::RgbImage;

/// The multipart boundary token used between MJPEG parts.
pub const BOUNDARY: &str = "frame";

/// The largest payload a single IPv4 UDP datagram can carry.
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

/// The receive buffer size for incoming datagrams.
const RECV_BUF_SIZE: usize = 65_536;

/// The JPEG quality used when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
