//! Section headers (`Elf64_Shdr`) and the raw byte buffers they describe.
//!
//! Field layout and the `sh_link`/`sh_info` semantics per section type
//! follow the standard ELF64 section header, as documented in `elf(5)`.

use crate::elf::base::{ElfAddr, ElfOff, ElfWord, ElfXWord, FromReader, HasWrittenSize, ToWriter};
use crate::elf::error::Error;
use std::io::{Read, Write};

/// `sh_type`. Only the variants this tool reads or creates are named;
/// everything else is preserved byte-for-byte via `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionType {
    Null,
    ProgBits,
    SymTab,
    StrTab,
    Rela,
    Hash,
    Dynamic,
    Note,
    NoBits,
    Rel,
    ShLib,
    DynSym,
    Other(u32),
}

impl SectionType {
    fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Null,
            1 => Self::ProgBits,
            2 => Self::SymTab,
            3 => Self::StrTab,
            4 => Self::Rela,
            5 => Self::Hash,
            6 => Self::Dynamic,
            7 => Self::Note,
            8 => Self::NoBits,
            9 => Self::Rel,
            10 => Self::ShLib,
            11 => Self::DynSym,
            other => Self::Other(other),
        }
    }

    fn to_u32(self) -> u32 {
        match self {
            Self::Null => 0,
            Self::ProgBits => 1,
            Self::SymTab => 2,
            Self::StrTab => 3,
            Self::Rela => 4,
            Self::Hash => 5,
            Self::Dynamic => 6,
            Self::Note => 7,
            Self::NoBits => 8,
            Self::Rel => 9,
            Self::ShLib => 10,
            Self::DynSym => 11,
            Self::Other(v) => v,
        }
    }
}

bitflags::bitflags! {
    /// `sh_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u64 {
        const WRITE = 0x1;
        const ALLOC = 0x2;
        const EXEC_INSTR = 0x4;
        const MERGE = 0x10;
        const STRINGS = 0x20;
        const INFO_LINK = 0x40;
        const LINK_ORDER = 0x80;
        const OS_NONCONFORMING = 0x100;
        const GROUP = 0x200;
        const TLS = 0x400;
        const COMPRESSED = 0x800;
    }
}

/// An ELF64 section header (`Elf64_Shdr`).
///
/// `link`/`info` are carried as plain `u32`s rather than typed indices:
/// their meaning is overloaded per `type` (symbol-table index for a
/// `SHT_REL`/`SHT_RELA`'s associated symtab, or symbol index of the "last
/// local" symbol for `SHT_SYMTAB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub name_offset: u32,
    pub r#type: SectionType,
    pub flags: SectionFlags,
    pub address: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub address_align: u64,
    pub entry_size: u64,
}

pub const ELF64_SHDR_SIZE: usize = 64;

impl FromReader for SectionHeader {
    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let name_offset = ElfWord::from_reader(reader)?.0;
        let r#type = SectionType::from_u32(ElfWord::from_reader(reader)?.0);
        let flags = SectionFlags::from_bits_truncate(ElfXWord::from_reader(reader)?.0);
        let address = ElfAddr::from_reader(reader)?.0;
        let offset = ElfOff::from_reader(reader)?.0;
        let size = ElfXWord::from_reader(reader)?.0;
        let link = ElfWord::from_reader(reader)?.0;
        let info = ElfWord::from_reader(reader)?.0;
        let address_align = ElfXWord::from_reader(reader)?.0;
        let entry_size = ElfXWord::from_reader(reader)?.0;

        Ok(Self {
            name_offset,
            r#type,
            flags,
            address,
            offset,
            size,
            link,
            info,
            address_align,
            entry_size,
        })
    }
}

impl ToWriter for SectionHeader {
    fn to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        ElfWord(self.name_offset).to_writer(writer)?;
        ElfWord(self.r#type.to_u32()).to_writer(writer)?;
        ElfXWord(self.flags.bits()).to_writer(writer)?;
        ElfAddr(self.address).to_writer(writer)?;
        ElfOff(self.offset).to_writer(writer)?;
        ElfXWord(self.size).to_writer(writer)?;
        ElfWord(self.link).to_writer(writer)?;
        ElfWord(self.info).to_writer(writer)?;
        ElfXWord(self.address_align).to_writer(writer)?;
        ElfXWord(self.entry_size).to_writer(writer)?;
        Ok(())
    }
}

impl HasWrittenSize for SectionHeader {
    const SIZE: usize = ELF64_SHDR_SIZE;
}

/// A section: its header plus the raw bytes it currently holds.
///
/// Mirrors libelf's separation of `Elf_Scn` (header + dirty flag) from its
/// `Elf_Data` buffers; this crate only ever needs a single contiguous data
/// buffer per section; `dirty` tracks whether `data` has been replaced
/// since the section was read, so `flush` knows which sections to rewrite.
#[derive(Debug, Clone)]
pub struct Section {
    pub header: SectionHeader,
    pub data: Vec<u8>,
    pub dirty: bool,
}

impl Section {
    pub fn new(header: SectionHeader, data: Vec<u8>) -> Self {
        Self {
            header,
            data,
            dirty: false,
        }
    }

    /// Replace this section's data, marking it dirty so `flush` rewrites it.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.header.size = data.len() as u64;
        self.data = data;
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn section_header_round_trips() {
        let hdr = SectionHeader {
            name_offset: 1,
            r#type: SectionType::ProgBits,
            flags: SectionFlags::ALLOC,
            address: 0,
            offset: 0x40,
            size: 16,
            link: 0,
            info: 0,
            address_align: 8,
            entry_size: 0,
        };
        let mut buf = Vec::new();
        hdr.to_writer(&mut buf).unwrap();
        assert_eq!(buf.len(), ELF64_SHDR_SIZE);
        let read = SectionHeader::from_reader(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read, hdr);
    }
}
