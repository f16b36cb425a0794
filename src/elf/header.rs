//! The ELF header (`Elf64_Ehdr`), including the `e_ident` prefix.
//!
//! Layout and field meanings follow the standard `Elf64_Ehdr`, narrowed to
//! the single ELF64/little-endian encoding this tool accepts.

use crate::elf::base::{ElfAddr, ElfHalfWord, ElfOff, ElfWord, FromReader, HasWrittenSize, ToWriter};
use crate::elf::error::Error;
use std::io::{Read, Write};

/// The four-byte ELF magic number, `0x7F 'E' 'L' 'F'`.
pub const ELF_MAGIC: [u8; 4] = [0x7f, 0x45, 0x4c, 0x46];

const ELF_CLASS_64: u8 = 2;
const ELF_DATA_2LSB: u8 = 1;

/// The fixed 16-byte `e_ident` prefix of the ELF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfIdentifier {
    pub os_abi: u8,
    pub abi_version: u8,
}

impl FromReader for ElfIdentifier {
    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut ident = [0u8; 16];
        reader.read_exact(&mut ident)?;

        if ident[0..4] != ELF_MAGIC {
            return Err(Error::BadMagic([ident[0], ident[1], ident[2], ident[3]]));
        }
        if ident[4] != ELF_CLASS_64 {
            return Err(Error::UnsupportedClass(ident[4]));
        }
        if ident[5] != ELF_DATA_2LSB {
            return Err(Error::UnsupportedEncoding(ident[5]));
        }

        Ok(ElfIdentifier {
            os_abi: ident[7],
            abi_version: ident[8],
        })
    }
}

impl ToWriter for ElfIdentifier {
    fn to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let mut ident = [0u8; 16];
        ident[0..4].copy_from_slice(&ELF_MAGIC);
        ident[4] = ELF_CLASS_64;
        ident[5] = ELF_DATA_2LSB;
        ident[6] = 1; // EI_VERSION = EV_CURRENT
        ident[7] = self.os_abi;
        ident[8] = self.abi_version;
        writer.write_all(&ident).map_err(Error::from)
    }
}

impl HasWrittenSize for ElfIdentifier {
    const SIZE: usize = 16;
}

/// `e_type`: the object file's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ElfType {
    None,
    Relocatable,
    Executable,
    Dynamic,
    Core,
    Other(u16),
}

impl ElfType {
    fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Relocatable,
            2 => Self::Executable,
            3 => Self::Dynamic,
            4 => Self::Core,
            other => Self::Other(other),
        }
    }

    fn to_u16(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Relocatable => 1,
            Self::Executable => 2,
            Self::Dynamic => 3,
            Self::Core => 4,
            Self::Other(v) => v,
        }
    }

    pub fn is_relocatable(self) -> bool {
        matches!(self, Self::Relocatable)
    }
}

/// `e_machine`: the required architecture. Only a handful of values are
/// named explicitly; anything else round-trips through `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ElfMachine {
    None,
    I386,
    X86_64,
    Arm,
    Aarch64,
    Riscv,
    Other(u16),
}

impl ElfMachine {
    fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::None,
            3 => Self::I386,
            40 => Self::Arm,
            62 => Self::X86_64,
            183 => Self::Aarch64,
            243 => Self::Riscv,
            other => Self::Other(other),
        }
    }

    fn to_u16(self) -> u16 {
        match self {
            Self::None => 0,
            Self::I386 => 3,
            Self::Arm => 40,
            Self::X86_64 => 62,
            Self::Aarch64 => 183,
            Self::Riscv => 243,
            Self::Other(v) => v,
        }
    }
}

/// The ELF64 file header (`Elf64_Ehdr`), minus the program-header fields
/// this tool never touches (relocatable objects have none).
#[derive(Debug, Clone)]
pub struct ElfHeader {
    pub identifier: ElfIdentifier,
    pub r#type: ElfType,
    pub machine: ElfMachine,
    pub version: u32,
    pub entry: u64,
    pub program_header_offset: u64,
    pub section_header_offset: u64,
    pub flags: u32,
    pub header_size: u16,
    pub program_header_entry_size: u16,
    pub program_header_entry_count: u16,
    pub section_header_entry_size: u16,
    pub section_header_entry_count: u16,
    pub section_name_string_table_index: u16,
}

/// Size of the ELF64 header on disk, `e_ident` included.
pub const ELF64_EHDR_SIZE: usize = 64;

impl FromReader for ElfHeader {
    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let identifier = ElfIdentifier::from_reader(reader)?;
        let r#type = ElfType::from_u16(ElfHalfWord::from_reader(reader)?.0);
        let machine = ElfMachine::from_u16(ElfHalfWord::from_reader(reader)?.0);
        let version = ElfWord::from_reader(reader)?.0;
        let entry = ElfAddr::from_reader(reader)?.0;
        let program_header_offset = ElfOff::from_reader(reader)?.0;
        let section_header_offset = ElfOff::from_reader(reader)?.0;
        let flags = ElfWord::from_reader(reader)?.0;
        let header_size = ElfHalfWord::from_reader(reader)?.0;
        let program_header_entry_size = ElfHalfWord::from_reader(reader)?.0;
        let program_header_entry_count = ElfHalfWord::from_reader(reader)?.0;
        let section_header_entry_size = ElfHalfWord::from_reader(reader)?.0;
        let section_header_entry_count = ElfHalfWord::from_reader(reader)?.0;
        let section_name_string_table_index = ElfHalfWord::from_reader(reader)?.0;

        Ok(Self {
            identifier,
            r#type,
            machine,
            version,
            entry,
            program_header_offset,
            section_header_offset,
            flags,
            header_size,
            program_header_entry_size,
            program_header_entry_count,
            section_header_entry_size,
            section_header_entry_count,
            section_name_string_table_index,
        })
    }
}

impl ToWriter for ElfHeader {
    fn to_writer<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        self.identifier.to_writer(writer)?;
        ElfHalfWord(self.r#type.to_u16()).to_writer(writer)?;
        ElfHalfWord(self.machine.to_u16()).to_writer(writer)?;
        ElfWord(self.version).to_writer(writer)?;
        ElfAddr(self.entry).to_writer(writer)?;
        ElfOff(self.program_header_offset).to_writer(writer)?;
        ElfOff(self.section_header_offset).to_writer(writer)?;
        ElfWord(self.flags).to_writer(writer)?;
        ElfHalfWord(self.header_size).to_writer(writer)?;
        ElfHalfWord(self.program_header_entry_size).to_writer(writer)?;
        ElfHalfWord(self.program_header_entry_count).to_writer(writer)?;
        ElfHalfWord(self.section_header_entry_size).to_writer(writer)?;
        ElfHalfWord(self.section_header_entry_count).to_writer(writer)?;
        ElfHalfWord(self.section_name_string_table_index).to_writer(writer)?;
        Ok(())
    }
}
