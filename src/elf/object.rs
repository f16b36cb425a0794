//! A mutable, in-memory handle over an ELF64 relocatable object.
//!
//! Shaped after libelf's `Elf`/`Elf_Scn`/`Elf_Data` handle API (`elf_begin`,
//! `elf_getscn`, `elf32_getshdr`, `elf_newdata`, `elf_newscn`, `elf_flagdata`,
//! `elf_update`) as used throughout `sdtconvert.c`, but implemented without
//! any FFI: sections are read fully into memory up front and written back
//! out on `flush`.

use crate::elf::base::{FromReader, HasWrittenSize, ToWriter};
use crate::elf::error::Error;
use crate::elf::header::{ElfHeader, ElfType, ELF64_EHDR_SIZE};
use crate::elf::section::{Section, SectionHeader, SectionType, ELF64_SHDR_SIZE};
use crate::elf::symbol::{Symbol, ELF64_SYM_SIZE};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

/// An open ELF64 object: its header and the full section table, sections
/// indexed in file order (index 0 is always the null section).
pub struct ElfObject {
    pub header: ElfHeader,
    sections: Vec<Section>,
}

impl ElfObject {
    /// Parse an ELF64 relocatable object from `reader`.
    ///
    /// Fails if the object is not `ET_REL`: every caller of this function
    /// owns `Self` by value on success, so there is no handle left to leak
    /// on the error path (`self` and any partially-read state are simply
    /// dropped).
    pub fn open_rw<R: Read + Seek>(reader: &mut R) -> Result<Self, Error> {
        reader.seek(SeekFrom::Start(0))?;
        let header = ElfHeader::from_reader(reader)?;

        if !header.r#type.is_relocatable() {
            return Err(Error::NotRelocatable);
        }

        let mut sections = Vec::with_capacity(header.section_header_entry_count as usize);
        for i in 0..header.section_header_entry_count {
            let shoff = header.section_header_offset + (i as u64) * (header.section_header_entry_size as u64);
            reader.seek(SeekFrom::Start(shoff))?;
            let shdr = SectionHeader::from_reader(reader)?;

            let data = if shdr.r#type == SectionType::NoBits || shdr.size == 0 {
                Vec::new()
            } else {
                reader.seek(SeekFrom::Start(shdr.offset))?;
                let mut buf = vec![0u8; shdr.size as usize];
                reader.read_exact(&mut buf)?;
                buf
            };

            sections.push(Section::new(shdr, data));
        }

        Ok(Self { header, sections })
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn section_by_index(&self, index: u32) -> Result<&Section, Error> {
        self.sections
            .get(index as usize)
            .ok_or(Error::NoSuchSection(index))
    }

    pub fn section_by_index_mut(&mut self, index: u32) -> Result<&mut Section, Error> {
        self.sections
            .get_mut(index as usize)
            .ok_or(Error::NoSuchSection(index))
    }

    /// Resolve a section's name through the section header string table
    /// (`e_shstrndx`).
    pub fn section_name(&self, section: &Section) -> Result<String, Error> {
        self.string(
            self.header.section_name_string_table_index as u32,
            section.header.name_offset,
        )
    }

    /// Find a section by name, linearly scanning the section table (mirrors
    /// `elf_getscn` + a name comparison loop; relocatable objects have at
    /// most a few dozen sections, so this is never a bottleneck).
    pub fn section_by_name(&self, name: &str) -> Result<(u32, &Section), Error> {
        for (index, section) in self.sections.iter().enumerate() {
            if self.section_name(section)? == name {
                return Ok((index as u32, section));
            }
        }
        Err(Error::NoSuchSectionName(name.to_string()))
    }

    /// Read a NUL-terminated string at `offset` in the string table section
    /// `strtab_index`.
    pub fn string(&self, strtab_index: u32, offset: u32) -> Result<String, Error> {
        let section = self
            .sections
            .get(strtab_index as usize)
            .ok_or(Error::NoSuchStringTable(strtab_index))?;
        let data = &section.data;
        let start = offset as usize;
        if start > data.len() {
            return Err(Error::StringOffsetOutOfRange {
                section: strtab_index,
                offset,
            });
        }
        let end = data[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|n| start + n)
            .unwrap_or(data.len());
        Ok(String::from_utf8_lossy(&data[start..end]).into_owned())
    }

    /// Append `name` to string table section `strtab_index`, returning the
    /// offset of the new entry. Marks the string table dirty.
    pub fn add_string(&mut self, strtab_index: u32, name: &str) -> Result<u32, Error> {
        let section = self
            .sections
            .get_mut(strtab_index as usize)
            .ok_or(Error::NoSuchStringTable(strtab_index))?;
        let offset = section.data.len() as u32;
        section.data.extend_from_slice(name.as_bytes());
        section.data.push(0);
        section.mark_dirty();
        Ok(offset)
    }

    /// Read symbol `index` out of symbol table section `symtab_index`,
    /// bounds-checked against the section's actual entry count.
    pub fn symbol(&self, symtab_index: u32, index: u32) -> Result<Symbol, Error> {
        let section = self
            .sections
            .get(symtab_index as usize)
            .ok_or(Error::NoSuchSection(symtab_index))?;
        let count = section.data.len() / ELF64_SYM_SIZE;
        if index as usize >= count {
            return Err(Error::SymbolOutOfBounds {
                index: symtab_index,
                count,
            });
        }
        let start = index as usize * ELF64_SYM_SIZE;
        let mut cursor = Cursor::new(&section.data[start..start + ELF64_SYM_SIZE]);
        Symbol::from_reader(&mut cursor)
    }

    /// Replace a section's data buffer in place (`elf_newdata` +
    /// `elf_flagdata(ELF_F_DIRTY)` rolled into one call).
    pub fn new_data(&mut self, section_index: u32, data: Vec<u8>) -> Result<(), Error> {
        self.section_by_index_mut(section_index)?.set_data(data);
        Ok(())
    }

    pub fn mark_dirty(&mut self, section_index: u32) -> Result<(), Error> {
        self.section_by_index_mut(section_index)?.mark_dirty();
        Ok(())
    }

    /// Create a new section named `name`, appending its name to the section
    /// header string table and the section itself to the table. Returns the
    /// new section's index.
    ///
    /// The string table extension and the new section are always performed
    /// together: a `Section` whose name isn't resolvable through `e_shstrndx`
    /// is an invariant violation this API cannot produce.
    pub fn add_section(&mut self, name: &str, mut header: SectionHeader, data: Vec<u8>) -> Result<u32, Error> {
        let shstrndx = self.header.section_name_string_table_index as u32;
        header.name_offset = self.add_string(shstrndx, name)?;
        header.size = data.len() as u64;
        let index = self.sections.len() as u32;
        let mut section = Section::new(header, data);
        section.mark_dirty();
        self.sections.push(section);
        self.header.section_header_entry_count += 1;
        Ok(index)
    }

    /// Recompute section file offsets and write the whole object back out,
    /// header, every section's data, and a fresh section header table.
    pub fn flush<W: Write>(&mut self, writer: &mut W) -> Result<(), Error> {
        let mut offset = ELF64_EHDR_SIZE as u64;
        let mut layout = Vec::with_capacity(self.sections.len());

        for section in &self.sections {
            if section.header.r#type == SectionType::Null || section.header.r#type == SectionType::NoBits {
                layout.push(section.header.offset);
                continue;
            }
            let align = section.header.address_align.max(1);
            if offset % align != 0 {
                offset += align - (offset % align);
            }
            layout.push(offset);
            offset += section.data.len() as u64;
        }

        let shoff = {
            let align = 8u64;
            if offset % align != 0 {
                offset + (align - offset % align)
            } else {
                offset
            }
        };

        self.header.section_header_offset = shoff;
        self.header.section_header_entry_count = self.sections.len() as u16;
        self.header.section_header_entry_size = ELF64_SHDR_SIZE as u16;
        self.header.header_size = ELF64_EHDR_SIZE as u16;

        for (section, new_offset) in self.sections.iter_mut().zip(layout.iter()) {
            if section.header.r#type != SectionType::NoBits {
                section.header.offset = *new_offset;
            }
        }

        self.header.to_writer(writer)?;

        let mut written = ELF64_EHDR_SIZE as u64;
        for section in &self.sections {
            if section.header.r#type == SectionType::Null || section.header.r#type == SectionType::NoBits {
                continue;
            }
            pad_to(writer, &mut written, section.header.offset)?;
            writer.write_all(&section.data)?;
            written += section.data.len() as u64;
        }

        pad_to(writer, &mut written, shoff)?;
        for section in &self.sections {
            section.header.to_writer(writer)?;
        }

        Ok(())
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }
}


fn pad_to<W: Write>(writer: &mut W, written: &mut u64, target: u64) -> Result<(), Error> {
    if target > *written {
        let padding = vec![0u8; (target - *written) as usize];
        writer.write_all(&padding)?;
        *written = target;
    }
    Ok(())
}
