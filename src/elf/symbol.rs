//! Symbol table entries (`Elf64_Sym`).

use crate::elf::base::{ElfAddr, ElfByte, ElfHalfWord, ElfWord, ElfXWord, FromReader, HasWrittenSize, ToWriter};
use crate::elf::error::Error;
use std::io::{Read, Write};

/// An ELF64 symbol table entry.
///
/// `info` is kept packed exactly as libelf/gelf present it (`ELF64_ST_BIND`
/// in the high nibble, `ELF64_ST_TYPE` in the low nibble of the byte), since
/// the rewriter only ever reads this field to confirm a probe stub is
/// `STT_NOTYPE`/`STB_GLOBAL`, never mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub name_offset: u32,
    pub info: u8,
    pub other: u8,
    pub section_index: u16,
    pub value: u64,
    pub size: u64,
}

pub const ELF64_SYM_SIZE: usize = 24;

impl Symbol {
    /// `ELF64_ST_TYPE`: the low nibble of `info`.
    pub fn symbol_type(&self) -> u8 {
        self.info & 0xf
    }

    /// `ELF64_ST_BIND`: the high nibble of `info`.
    pub fn binding(&self) -> u8 {
        self.info >> 4
    }
}

impl FromReader for Symbol {
    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let name_offset = ElfWord::from_reader(reader)?.0;
        let info = ElfByte::from_reader(reader)?.0;
        let other = ElfByte::from_reader(reader)?.0;
        let section_index = ElfHalfWord::from_reader(reader)?.0;
        let value = ElfAddr::from_reader(reader)?.0;
        let size = ElfXWord::from_reader(reader)?.0;

        Ok(Self {
            name_offset,
            info,
            other,
            section_index,
            value,
            size,
        })
    }
}

impl ToWriter for Symbol {
    fn to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        ElfWord(self.name_offset).to_writer(writer)?;
        ElfByte(self.info).to_writer(writer)?;
        ElfByte(self.other).to_writer(writer)?;
        ElfHalfWord(self.section_index).to_writer(writer)?;
        ElfAddr(self.value).to_writer(writer)?;
        ElfXWord(self.size).to_writer(writer)?;
        Ok(())
    }
}

impl HasWrittenSize for Symbol {
    const SIZE: usize = ELF64_SYM_SIZE;
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn symbol_round_trips() {
        let sym = Symbol {
            name_offset: 7,
            info: (1 << 4) | 0, // STB_GLOBAL, STT_NOTYPE
            other: 0,
            section_index: 1,
            value: 0,
            size: 0,
        };
        let mut buf = Vec::new();
        sym.to_writer(&mut buf).unwrap();
        assert_eq!(buf.len(), ELF64_SYM_SIZE);
        let read = Symbol::from_reader(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read, sym);
        assert_eq!(read.symbol_type(), 0);
        assert_eq!(read.binding(), 1);
    }
}
