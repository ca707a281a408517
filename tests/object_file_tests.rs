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

use cortex16::file_reader::{FileReader, MockFileReader};
use cortex16::objfile::{read_words, write_words, Endianness};
use cortex16::{assemble, disassemble};
use std::path::Path;

#[test]
fn assembled_program_round_trips_through_a_written_object_file() {
    let out = assemble("SET A, 0x1234\nSET B, -1\nHCF A\n", "t.asm");
    assert!(!out.log.has_errors(), "unexpected errors: {:?}", out.log.errors());

    let reader = MockFileReader::default();
    let bytes = write_words(&out.words, Endianness::Big);
    reader.write_binary(Path::new("out.bin"), &bytes).unwrap();

    let read_back = reader.read_binary(Path::new("out.bin")).unwrap();
    let words = read_words(&read_back, Endianness::Big).unwrap();
    assert_eq!(words, out.words);

    let (instructions, err) = disassemble(&words, cortex16::decode::Radix::Hex);
    assert!(err.is_none());
    assert_eq!(instructions.len(), 3);
}

#[test]
fn little_endian_round_trip_is_distinct_from_big_endian_bytes() {
    let words = vec![0x1234u16, 0xbeef];
    let big = write_words(&words, Endianness::Big);
    let little = write_words(&words, Endianness::Little);
    assert_ne!(big, little);
    assert_eq!(read_words(&big, Endianness::Big).unwrap(), words);
    assert_eq!(read_words(&little, Endianness::Little).unwrap(), words);
}

#[test]
fn odd_length_object_file_is_rejected() {
    let reader = MockFileReader::default();
    reader.add_binary_file("bad.bin", &[0x00, 0x01, 0x02]);
    let bytes = reader.read_binary(Path::new("bad.bin")).unwrap();
    assert!(read_words(&bytes, Endianness::Big).is_err());
}
