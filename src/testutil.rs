//! Byte-level packet builders shared by the unit tests.

/// Build a minimal IPv4 packet: 20-byte header followed by `l4` verbatim.
/// `protocol` is the IP protocol number (6 = TCP, 17 = UDP).
pub fn ipv4_packet(src: [u8; 4], dst: [u8; 4], protocol: u8, l4: &[u8]) -> Vec<u8> {
    let total_length = (20 + l4.len()) as u16;
    let mut pkt = vec![0u8; 20];

    // Byte 0: version (4) in the high nibble, IHL (5 = 20 bytes) in the low.
    pkt[0] = 0x45;
    // Bytes 2-3: total length in big-endian.
    pkt[2] = (total_length >> 8) as u8;
    pkt[3] = (total_length & 0xFF) as u8;
    // Byte 8: TTL.
    pkt[8] = 64;
    // Byte 9: protocol.
    pkt[9] = protocol;
    // Bytes 12-15 / 16-19: source and destination addresses.
    pkt[12..16].copy_from_slice(&src);
    pkt[16..20].copy_from_slice(&dst);

    pkt.extend_from_slice(l4);
    pkt
}

/// Build an IPv4/TCP packet with a 20-byte TCP header and the given payload.
pub fn tcp_packet(
    src: [u8; 4],
    dst: [u8; 4],
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut tcp = vec![0u8; 20];
    tcp[0..2].copy_from_slice(&src_port.to_be_bytes());
    tcp[2..4].copy_from_slice(&dst_port.to_be_bytes());
    // Byte 12: data offset (5 words = 20 bytes) in the high nibble.
    tcp[12] = 5 << 4;
    // Bytes 14-15: a non-zero receive window.
    tcp[14..16].copy_from_slice(&1024u16.to_be_bytes());
    tcp.extend_from_slice(payload);

    ipv4_packet(src, dst, 6, &tcp)
}

/// Build an IPv4/UDP packet with the given payload.
pub fn udp_packet(
    src: [u8; 4],
    dst: [u8; 4],
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut udp = vec![0u8; 8];
    udp[0..2].copy_from_slice(&src_port.to_be_bytes());
    udp[2..4].copy_from_slice(&dst_port.to_be_bytes());
    // Bytes 4-5: length of header + payload.
    udp[4..6].copy_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    udp.extend_from_slice(payload);

    ipv4_packet(src, dst, 17, &udp)
}
