//! Relocation entries (`Elf64_Rel`/`Elf64_Rela`).
//!
//! `r_info` packs a symbol table index into the high 32 bits and a
//! relocation type into the low 32 bits (`ELF64_R_SYM`/`ELF64_R_TYPE`).
//! This is modeled as an explicit split rather than an opaque `u64` so that
//! rewriting only the type half can never accidentally leave stray bits of
//! the previous type behind.

use crate::elf::base::{ElfAddr, ElfXWord, FromReader, HasWrittenSize, ToWriter};
use crate::elf::error::Error;
use std::io::{Read, Write};

/// `R_X86_64_NONE`: a relocation that does nothing. Used to neutralize a
/// rewritten call site's relocation.
pub const R_X86_64_NONE: u32 = 0;
/// `R_X86_64_64`: an absolute 64-bit relocation. Used for the companion
/// relocation emitted against `set_sdt_instance_set`.
pub const R_X86_64_64: u32 = 1;

/// The packed `r_info` word, split into its symbol index and type halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationInfo(u64);

impl RelocationInfo {
    pub fn new(symbol: u32, r#type: u32) -> Self {
        Self(((symbol as u64) << 32) | (r#type as u64))
    }

    pub fn symbol(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn r#type(&self) -> u32 {
        (self.0 & 0xffff_ffff) as u32
    }

    /// Overwrite only the symbol index, leaving the type untouched.
    pub fn set_symbol(&mut self, symbol: u32) {
        self.0 = ((symbol as u64) << 32) | (self.0 & 0xffff_ffff);
    }

    /// Overwrite only the type, leaving the symbol index untouched.
    ///
    /// Clears the entire low 32-bit type field before OR-ing in `new_type`,
    /// rather than only the bits `new_type` itself sets: a partial clear
    /// would let bits of a previous wider type survive a narrower one.
    pub fn set_type(&mut self, new_type: u32) {
        self.0 = (self.0 & !0xffff_ffffu64) | (new_type as u64);
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RelocationInfo {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RelocationInfo> for u64 {
    fn from(value: RelocationInfo) -> Self {
        value.0
    }
}

/// An implicit-addend relocation (`Elf64_Rel`), as found in `SHT_REL`
/// sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub offset: u64,
    pub info: RelocationInfo,
}

pub const ELF64_REL_SIZE: usize = 16;

impl FromReader for Relocation {
    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let offset = ElfAddr::from_reader(reader)?.0;
        let info = RelocationInfo::from(ElfXWord::from_reader(reader)?.0);
        Ok(Self { offset, info })
    }
}

impl ToWriter for Relocation {
    fn to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        ElfAddr(self.offset).to_writer(writer)?;
        ElfXWord(self.info.raw()).to_writer(writer)?;
        Ok(())
    }
}

impl HasWrittenSize for Relocation {
    const SIZE: usize = ELF64_REL_SIZE;
}

/// An explicit-addend relocation (`Elf64_Rela`), as found in `SHT_RELA`
/// sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationAddend {
    pub offset: u64,
    pub info: RelocationInfo,
    pub addend: i64,
}

pub const ELF64_RELA_SIZE: usize = 24;

impl FromReader for RelocationAddend {
    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let offset = ElfAddr::from_reader(reader)?.0;
        let info = RelocationInfo::from(ElfXWord::from_reader(reader)?.0);
        let addend = ElfXWord::from_reader(reader)?.0 as i64;
        Ok(Self { offset, info, addend })
    }
}

impl ToWriter for RelocationAddend {
    fn to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        ElfAddr(self.offset).to_writer(writer)?;
        ElfXWord(self.info.raw()).to_writer(writer)?;
        ElfXWord(self.addend as u64).to_writer(writer)?;
        Ok(())
    }
}

impl HasWrittenSize for RelocationAddend {
    const SIZE: usize = ELF64_RELA_SIZE;
}
