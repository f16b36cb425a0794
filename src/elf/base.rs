//! Fixed-width value types used throughout the ELF64 little-endian object
//! format, plus the `FromReader`/`ToWriter` trait pair used to move them to
//! and from a byte stream.
//!
//! Only the ELF64/little-endian encoding is modeled: class and
//! data-encoding are not generalized over, because every input this tool
//! accepts is required to be an ELF64 relocatable object for x86-64 (see
//! `DESIGN.md`).

use crate::elf::error::Error;
use std::io::{Read, Write};
use std::mem::size_of;

/// Decode an owned instance of a type from a little-endian byte stream.
pub trait FromReader: Sized {
    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, Error>;
}

/// Encode an instance of a type to a little-endian byte stream.
pub trait ToWriter {
    fn to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error>;
}

/// A type whose encoded size is known without reading or writing it.
pub trait HasWrittenSize {
    const SIZE: usize;
}

macro_rules! elf_int_wrapper {
    ($name:ident, $raw:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[doc = concat!("A little-endian `", stringify!($raw), "` field in an ELF64 structure")]
        pub struct $name(pub $raw);

        impl FromReader for $name {
            fn from_reader<R: Read>(reader: &mut R) -> Result<Self, Error> {
                let mut buf = [0u8; size_of::<$raw>()];
                reader.read_exact(&mut buf).map_err(Error::from)?;
                Ok($name(<$raw>::from_le_bytes(buf)))
            }
        }

        impl ToWriter for $name {
            fn to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
                writer.write_all(&self.0.to_le_bytes()).map_err(Error::from)
            }
        }

        impl HasWrittenSize for $name {
            const SIZE: usize = size_of::<$raw>();
        }

        impl From<$name> for $raw {
            fn from(val: $name) -> Self {
                val.0
            }
        }

        impl From<$raw> for $name {
            fn from(val: $raw) -> Self {
                $name(val)
            }
        }
    };
}

/// A single byte. Endianness is irrelevant at this width, but the type
/// keeps the wrapper uniform with the other widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ElfByte(pub u8);

impl FromReader for ElfByte {
    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf).map_err(Error::from)?;
        Ok(ElfByte(buf[0]))
    }
}

impl ToWriter for ElfByte {
    fn to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_all(&[self.0]).map_err(Error::from)
    }
}

impl HasWrittenSize for ElfByte {
    const SIZE: usize = 1;
}

elf_int_wrapper!(ElfHalfWord, u16);
elf_int_wrapper!(ElfWord, u32);
elf_int_wrapper!(ElfXWord, u64);
/// An address in the ELF64 address space (`Elf64_Addr`).
pub type ElfAddr = ElfXWord;
/// A file offset (`Elf64_Off`).
pub type ElfOff = ElfXWord;
/// A section index escape/word-sized index (`Elf64_Word` used for e.g.
/// `sh_link`, `sh_info`).
pub type ElfSection = ElfWord;

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn half_word_round_trips() {
        let mut buf = Vec::new();
        ElfHalfWord(0xBEEF).to_writer(&mut buf).unwrap();
        assert_eq!(buf, vec![0xEF, 0xBE]);
        let read = ElfHalfWord::from_reader(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read, ElfHalfWord(0xBEEF));
    }

    #[test]
    fn xword_round_trips() {
        let mut buf = Vec::new();
        ElfXWord(0x0102030405060708).to_writer(&mut buf).unwrap();
        let read = ElfXWord::from_reader(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read, ElfXWord(0x0102030405060708));
    }
}
