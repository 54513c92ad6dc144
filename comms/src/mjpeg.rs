//! Framing of JPEG images as parts of an HTTP `multipart/x-mixed-replace` stream.

use std::io::Write;

use crate::BOUNDARY;

/// The `Content-Type` of an MJPEG response, its boundary is `BOUNDARY`.
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Room for the part headers on top of the image itself.
const PART_OVERHEAD: usize = 96;

/// Frames a single JPEG image as the next part of an MJPEG stream.
///
/// # Arguments
/// * `jpeg` - An encoded JPEG image.
///
/// # Returns
/// The boundary line, the part headers, the image and its trailing CRLF.
pub fn encode_part(jpeg: &[u8]) -> Vec<u8> {
    let mut part = Vec::with_capacity(jpeg.len() + PART_OVERHEAD);
    write_part(&mut part, jpeg);
    part
}

/// Appends a single JPEG image to `buf` as the next part of an MJPEG stream.
pub fn write_part(buf: &mut Vec<u8>, jpeg: &[u8]) {
    // Writing into a `Vec` can't fail.
    let _ = write!(
        buf,
        "--{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    );
    buf.extend_from_slice(jpeg);
    buf.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_names_the_boundary() {
        let boundary = MJPEG_CONTENT_TYPE.rsplit_once("boundary=").unwrap().1;
        assert_eq!(boundary, BOUNDARY);
    }

    #[test]
    fn test_part_layout() {
        let part = encode_part(&[0xff, 0xd8, 0xff, 0xd9]);

        let head = b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 4\r\n\r\n";
        assert!(part.starts_with(head));
        assert_eq!(&part[head.len()..], &[0xff, 0xd8, 0xff, 0xd9, b'\r', b'\n']);
    }

    #[test]
    fn test_parts_append() {
        let mut buf = Vec::new();
        write_part(&mut buf, &[1, 2, 3]);
        write_part(&mut buf, &[4, 5]);

        let parts = buf.windows(7).filter(|w| *w == b"--frame").count();
        assert_eq!(parts, 2);
        assert!(buf.ends_with(&[4, 5, b'\r', b'\n']));
    }
}
