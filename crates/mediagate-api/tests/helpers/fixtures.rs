//! Test fixtures: minimal media blobs that sniff as the intended type.

#![allow(dead_code)]

/// Start of an MP4 file: an `ftyp` box followed by an empty `mdat`.
pub fn create_minimal_mp4() -> Vec<u8> {
    let mut mp4 = Vec::new();
    mp4.extend_from_slice(&[0x00, 0x00, 0x00, 0x20]);
    mp4.extend_from_slice(b"ftypisom");
    mp4.extend_from_slice(&[0x00, 0x00, 0x02, 0x00]);
    mp4.extend_from_slice(b"isomiso2mp41");
    mp4.extend_from_slice(&[0x00, 0x00, 0x00, 0x08]);
    mp4.extend_from_slice(b"mdat");
    mp4
}

/// MP3 with an ID3v2 header and a zeroed body.
pub fn create_minimal_mp3() -> Vec<u8> {
    let mut mp3 = b"ID3".to_vec();
    mp3.extend_from_slice(&[0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0A]);
    mp3.extend_from_slice(&[0u8; 128]);
    mp3
}

/// Bytes no media signature matches.
pub fn create_plain_text() -> Vec<u8> {
    b"these are not the bytes you are looking for".to_vec()
}
