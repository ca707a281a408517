/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Object-file encoding: raw 16-bit words, no header, with a selectable
//! byte order. Big-endian (high byte first) is the default; little-endian
//! is available as a CLI flag on both the assembler and disassembler.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::errors::ObjectFileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

impl Default for Endianness {
    fn default() -> Self {
        Endianness::Big
    }
}

/// Packs a sequence of 16-bit words into raw bytes according to `endianness`.
pub fn write_words(words: &[u16], endianness: Endianness) -> Vec<u8> {
    let mut out = vec![0u8; words.len() * 2];
    match endianness {
        Endianness::Big => BigEndian::write_u16_into(words, &mut out),
        Endianness::Little => LittleEndian::write_u16_into(words, &mut out),
    }
    out
}

/// Unpacks raw bytes into 16-bit words according to `endianness`. The byte
/// count must be even and the resulting word count must fit the machine's
/// 65,536-word address space.
pub fn read_words(bytes: &[u8], endianness: Endianness) -> Result<Vec<u16>, ObjectFileError> {
    if bytes.len() % 2 != 0 {
        return Err(ObjectFileError::OddLength(bytes.len()));
    }
    let word_count = bytes.len() / 2;
    if word_count > u16::MAX as usize + 1 {
        return Err(ObjectFileError::TooLarge(word_count));
    }

    let mut words = vec![0u16; word_count];
    match endianness {
        Endianness::Big => BigEndian::read_u16_into(bytes, &mut words),
        Endianness::Little => LittleEndian::read_u16_into(bytes, &mut words),
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_big_endian() {
        let words = [0x1234, 0xABCD, 0x0000, 0xFFFF];
        let bytes = write_words(&words, Endianness::Big);
        assert_eq!(bytes, vec![0x12, 0x34, 0xAB, 0xCD, 0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(read_words(&bytes, Endianness::Big).unwrap(), words);
    }

    #[test]
    fn round_trips_little_endian() {
        let words = [0x1234, 0xABCD];
        let bytes = write_words(&words, Endianness::Little);
        assert_eq!(bytes, vec![0x34, 0x12, 0xCD, 0xAB]);
        assert_eq!(read_words(&bytes, Endianness::Little).unwrap(), words);
    }

    #[test]
    fn rejects_odd_length() {
        let err = read_words(&[0x00], Endianness::Big).unwrap_err();
        assert_eq!(err, ObjectFileError::OddLength(1));
    }
}
