//! Utility functions and structures.

use crate::{Result, StoreError};

use std::fs::{self, File};
use std::path::Path;
use std::io::{BufRead, BufReader, Read, Write};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

//-----------------------------------------------------------------------------

// Utilities for working with files.

const SIZE_UNITS: [(f64, &str); 6] = [
    (1.0, "B"),
    (1024.0, "KiB"),
    (1024.0 * 1024.0, "MiB"),
    (1024.0 * 1024.0 * 1024.0, "GiB"),
    (1024.0 * 1024.0 * 1024.0 * 1024.0, "TiB"),
    (1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0, "PiB"),
];

/// Returns a human-readable representation of the given number of bytes.
pub fn human_readable_size(bytes: usize) -> String {
    let mut unit = 0;
    let value = bytes as f64;
    while unit + 1 < SIZE_UNITS.len() && value >= SIZE_UNITS[unit + 1].0 {
        unit += 1;
    }
    format!("{:.3} {}", value / SIZE_UNITS[unit].0, SIZE_UNITS[unit].1)
}

/// Returns a human-readable size of the file.
pub fn file_size<P: AsRef<Path>>(filename: P) -> Option<String> {
    let metadata = fs::metadata(filename).ok()?;
    Some(human_readable_size(metadata.len() as usize))
}

/// Returns `true` if the file exists.
pub fn file_exists<P: AsRef<Path>>(filename: P) -> bool {
    fs::metadata(filename).is_ok()
}

/// Returns `true` if the file appears to be gzip-compressed.
pub fn is_gzipped<P: AsRef<Path>>(filename: P) -> bool {
    let Ok(file) = File::open(filename) else {
        return false;
    };
    let mut reader = BufReader::new(file);
    let mut magic = [0; 2];
    let len = reader.read(&mut magic).ok();
    len == Some(2) && magic == [0x1F, 0x8B]
}

/// Returns a buffered reader for the file, which may be gzip-compressed.
pub fn open_file<P: AsRef<Path>>(filename: P) -> Result<Box<dyn BufRead>> {
    let file = File::open(&filename)?;
    let inner = BufReader::new(file);
    if is_gzipped(&filename) {
        let inner = MultiGzDecoder::new(inner);
        Ok(Box::new(BufReader::new(inner)))
    } else {
        Ok(Box::new(inner))
    }
}

//-----------------------------------------------------------------------------

// Base-85 encoding with the RFC 1924 alphabet.

const BASE85_ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

/// Encodes the bytes as base-85 text using the RFC 1924 alphabet.
///
/// Each 4-byte big-endian word becomes five characters.
/// A partial final word is padded with zero bytes and the output is truncated by the number of padding bytes.
/// The result is identical to Python's `base64.b85encode`.
pub fn base85_encode(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len().div_ceil(4) * 5);
    for chunk in bytes.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(word);
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = BASE85_ALPHABET[(value % 85) as usize];
            value /= 85;
        }
        for digit in digits.iter().take(chunk.len() + 1) {
            result.push(*digit as char);
        }
    }
    result
}

//-----------------------------------------------------------------------------

// Compressed sequence payloads.

/// The first byte of a compressed sequence payload.
pub const PAYLOAD_MARKER: u8 = b'Z';

/// Compresses the text into a payload: [`PAYLOAD_MARKER`] followed by a gzip stream of the UTF-8 bytes.
pub fn compress_payload(text: &str) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(vec![PAYLOAD_MARKER], Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Returns an error if the payload does not start with [`PAYLOAD_MARKER`].
pub fn check_payload(payload: &[u8]) -> Result<()> {
    match payload.first() {
        Some(&PAYLOAD_MARKER) => Ok(()),
        Some(byte) => Err(StoreError::MalformedPayload(format!("Unexpected marker byte 0x{:02X}", byte))),
        None => Err(StoreError::MalformedPayload(String::from("Empty payload"))),
    }
}

/// Decompresses a payload created with [`compress_payload`].
///
/// Returns [`StoreError::MalformedPayload`] if the marker is missing, the stream is corrupted, or the text is not valid UTF-8.
pub fn decompress_payload(payload: &[u8]) -> Result<String> {
    check_payload(payload)?;
    let mut decoder = MultiGzDecoder::new(&payload[1..]);
    let mut text = String::new();
    decoder.read_to_string(&mut text).map_err(|x| StoreError::MalformedPayload(x.to_string()))?;
    Ok(text)
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base85_reference_values() {
        let cases: [(&[u8], &str); 5] = [
            (b"", ""),
            (b"\x00\x00\x00\x00", "00000"),
            (b"\xFF\xFF\xFF\xFF", "|NsC0"),
            (b"hello", "Xk~0{Zv"),
            (b"abc", "VPaz"),
        ];
        for (bytes, truth) in cases.iter() {
            assert_eq!(base85_encode(bytes), *truth, "Wrong encoding for {:?}", bytes);
        }
    }

    #[test]
    fn payload_round_trip() {
        let sequences = ["", "GATTACA", "ACGTNNNNNacgt", "MKVLAAGIVALLLAAGCSSS"];
        for sequence in sequences.iter() {
            let payload = compress_payload(sequence);
            assert!(payload.is_ok(), "Failed to compress {}: {}", sequence, payload.unwrap_err());
            let payload = payload.unwrap();
            assert_eq!(payload[0], PAYLOAD_MARKER, "Missing marker for {}", sequence);
            let decompressed = decompress_payload(&payload);
            assert!(decompressed.is_ok(), "Failed to decompress {}: {}", sequence, decompressed.unwrap_err());
            assert_eq!(decompressed.unwrap(), *sequence, "Wrong round trip");
        }
    }

    #[test]
    fn payload_without_marker() {
        let payload = compress_payload("GATTACA").unwrap();
        let result = decompress_payload(&payload[1..]);
        assert!(matches!(result, Err(StoreError::MalformedPayload(_))), "Accepted a payload without a marker");
        let result = decompress_payload(&[]);
        assert!(matches!(result, Err(StoreError::MalformedPayload(_))), "Accepted an empty payload");
    }

    #[test]
    fn corrupted_payload() {
        let payload = [PAYLOAD_MARKER, 1, 2, 3, 4];
        let result = decompress_payload(&payload);
        assert!(matches!(result, Err(StoreError::MalformedPayload(_))), "Accepted a corrupted payload");
    }

    #[test]
    fn human_readable_sizes() {
        assert_eq!(human_readable_size(512), "512.000 B");
        assert_eq!(human_readable_size(2048), "2.000 KiB");
    }
}

//-----------------------------------------------------------------------------
