use s_gzip::{compress, decompress, GzipError, GzipReader};
use std::io::{ErrorKind, Read};

fn sample_stream() -> Vec<u8> {
    let data: Vec<u8> = (0..4000u32).flat_map(|i| (i % 251).to_le_bytes()).collect();
    compress(&data, 6).unwrap()
}

#[test]
fn truncation_at_every_offset_is_unexpected_eof() {
    let stream = sample_stream();
    for cut in 1..stream.len() {
        match decompress(&stream[..cut]) {
            Err(GzipError::UnexpectedEof { member, .. }) => assert_eq!(member, 0),
            other => panic!("cut at {} gave {:?}", cut, other.map(|d| d.len())),
        }
    }
}

#[test]
fn truncated_second_member_reports_its_index() {
    let mut stream = compress(b"complete member", 6).unwrap();
    let second = compress(b"cut short", 6).unwrap();
    stream.extend_from_slice(&second[..second.len() - 3]);

    match decompress(&stream) {
        Err(GzipError::UnexpectedEof {
            member,
            decompressed,
            ..
        }) => {
            assert_eq!(member, 1);
            assert!(decompressed >= b"complete member".len() as u64);
        }
        other => panic!("unexpected result: {:?}", other.map(|d| d.len())),
    }
}

#[test]
fn flipped_trailer_crc_is_corrupt() {
    let mut stream = sample_stream();
    let crc_at = stream.len() - 8;
    stream[crc_at] ^= 0xff;
    let err = decompress(&stream).unwrap_err();
    assert!(err.is_corrupt(), "got {:?}", err);
    assert!(matches!(err, GzipError::CorruptMember { member: 0, .. }));
}

#[test]
fn flipped_trailer_size_is_corrupt() {
    let mut stream = sample_stream();
    let size_at = stream.len() - 1;
    stream[size_at] ^= 0x01;
    match decompress(&stream) {
        Err(GzipError::CorruptMember { reason, .. }) => {
            assert!(reason.contains("length"), "reason: {}", reason)
        }
        other => panic!("unexpected result: {:?}", other.map(|d| d.len())),
    }
}

#[test]
fn invalid_deflate_block_is_corrupt() {
    let mut stream = compress(b"x", 6).unwrap();
    // BTYPE=11 is reserved in every deflate block header
    stream[10] = 0x07;
    let err = decompress(&stream).unwrap_err();
    assert!(err.is_corrupt(), "got {:?}", err);
}

#[test]
fn bad_magic_is_bad_header() {
    match decompress(b"PK\x03\x04 not gzip") {
        Err(GzipError::BadHeader { offset, .. }) => assert_eq!(offset, 0),
        other => panic!("unexpected result: {:?}", other.map(|d| d.len())),
    }
}

#[test]
fn io_error_kinds() {
    let stream = sample_stream();
    let mut out = Vec::new();
    let err = GzipReader::new(&stream[..stream.len() / 2])
        .read_to_end(&mut out)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

    let mut corrupt = stream.clone();
    let crc_at = corrupt.len() - 8;
    corrupt[crc_at] ^= 0x55;
    let err = GzipReader::new(&corrupt[..])
        .read_to_end(&mut out)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
    // The typed error survives the trip through io::Error
    assert!(matches!(
        GzipError::from(err),
        GzipError::CorruptMember { .. }
    ));
}
