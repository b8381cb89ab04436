use crate::error::{Error, Result};

/// Direction of a carved TCP payload relative to the configured MySQL
/// port (`spec.md` §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client → server.
    Request,
    /// Server → client.
    Response,
}

/// One decoded Ethernet/IPv4/TCP frame, trimmed to what the pairing
/// engine needs: which flow it belongs to, which direction it travels,
/// and its TCP payload.
#[derive(Debug)]
pub struct Decoded<'a> {
    pub client_addr: String,
    pub client_ip: String,
    pub direction: Direction,
    pub payload: &'a [u8],
}

const ETH_HEADER_LEN: usize = 14;

/// Decodes one captured Ethernet frame assuming a fixed IPv4/TCP layout
/// (`spec.md` §4.1). Returns `Ok(None)` for an empty TCP payload (silent
/// discard) and `Err(UnexpectedPorts)` when neither side of the
/// connection matches `server_port`.
pub fn decode(frame: &[u8], server_port: u16) -> Result<Option<Decoded<'_>>> {
    if frame.len() < ETH_HEADER_LEN + 20 {
        return Ok(None);
    }

    let ip_header = &frame[ETH_HEADER_LEN..];
    let ip_header_len = usize::from(ip_header[0] & 0x0F) * 4;
    if ip_header.len() < ip_header_len + 20 {
        return Ok(None);
    }

    let src_ip = format_ipv4(&ip_header[12..16]);
    let dst_ip = format_ipv4(&ip_header[16..20]);

    let tcp = &ip_header[ip_header_len..];
    if tcp.len() < 20 {
        return Ok(None);
    }
    let src_port = u16::from_be_bytes([tcp[0], tcp[1]]);
    let dst_port = u16::from_be_bytes([tcp[2], tcp[3]]);
    let tcp_header_len = usize::from(tcp[12] >> 4) * 4;
    if tcp.len() < tcp_header_len {
        return Ok(None);
    }
    let payload = &tcp[tcp_header_len..];
    if payload.is_empty() {
        return Ok(None);
    }

    let (direction, client_ip, client_port) = if src_port == server_port {
        (Direction::Response, dst_ip, dst_port)
    } else if dst_port == server_port {
        (Direction::Request, src_ip, src_port)
    } else {
        return Err(Error::UnexpectedPorts { src_port, dst_port });
    };

    let client_addr = format!("{client_ip}:{client_port}");
    Ok(Some(Decoded {
        client_addr,
        client_ip,
        direction,
        payload,
    }))
}

fn format_ipv4(bytes: &[u8]) -> String {
    format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; ETH_HEADER_LEN];
        // IPv4 header, no options: version/IHL = 0x45 (20-byte header).
        let mut ip = vec![0u8; 20];
        ip[0] = 0x45;
        ip[12..16].copy_from_slice(&[10, 0, 0, 1]);
        ip[16..20].copy_from_slice(&[10, 0, 0, 2]);
        frame.extend_from_slice(&ip);

        let mut tcp = vec![0u8; 20];
        tcp[0..2].copy_from_slice(&src_port.to_be_bytes());
        tcp[2..4].copy_from_slice(&dst_port.to_be_bytes());
        tcp[12] = 0x50; // data offset = 5 words = 20 bytes, no options
        frame.extend_from_slice(&tcp);
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn request_direction_when_dst_matches_server_port() {
        let frame = build_frame(54321, 3306, b"hello");
        let decoded = decode(&frame, 3306).unwrap().unwrap();
        assert_eq!(decoded.direction, Direction::Request);
        assert_eq!(decoded.client_ip, "10.0.0.1");
        assert_eq!(decoded.client_addr, "10.0.0.1:54321");
        assert_eq!(decoded.payload, b"hello");
    }

    #[test]
    fn response_direction_when_src_matches_server_port() {
        let frame = build_frame(3306, 54321, b"world");
        let decoded = decode(&frame, 3306).unwrap().unwrap();
        assert_eq!(decoded.direction, Direction::Response);
        assert_eq!(decoded.client_ip, "10.0.0.2");
        assert_eq!(decoded.client_addr, "10.0.0.2:54321");
    }

    #[test]
    fn unexpected_ports_is_an_error() {
        let frame = build_frame(1234, 5678, b"x");
        let err = decode(&frame, 3306).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedPorts {
                src_port: 1234,
                dst_port: 5678
            }
        ));
    }

    #[test]
    fn empty_payload_is_silently_discarded() {
        let frame = build_frame(54321, 3306, b"");
        assert!(decode(&frame, 3306).unwrap().is_none());
    }

    #[test]
    fn truncated_frame_is_discarded() {
        let frame = vec![0u8; 10];
        assert!(decode(&frame, 3306).unwrap().is_none());
    }
}
