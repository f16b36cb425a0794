//! The relocation section scanner.
//!
//! Grounded in `process_reloc_scn`: walk every relocation section, skip any
//! not targeting `.text`, and dispatch each entry in index order to the
//! rewriter, writing back and dirty-flagging only what actually changed.

use crate::arch::ProbeArch;
use crate::elf::base::FromReader;
use crate::elf::object::ElfObject;
use crate::elf::relocation::{Relocation, RelocationAddend, RelocationInfo, ELF64_REL_SIZE, ELF64_RELA_SIZE};
use crate::elf::section::SectionType;
use crate::error::Error;
use crate::logging::Logger;
use crate::probe::ProbeInstanceList;
use crate::rewriter::rewrite_call_site;
use std::io::Cursor;

/// Scan every relocation section in `object`, rewriting probe call sites
/// found in relocations targeting `.text` and recording them in `instances`.
pub fn scan_relocations(
    object: &mut ElfObject,
    arch: &dyn ProbeArch,
    instances: &mut ProbeInstanceList,
    logger: &dyn Logger,
) -> Result<(), Error> {
    let section_count = object.section_count() as u32;

    for index in 0..section_count {
        let header = object.section_by_index(index)?.header;
        if header.r#type != SectionType::Rel && header.r#type != SectionType::Rela {
            continue;
        }

        let target_index = header.info;
        let target_name = object.section_name(object.section_by_index(target_index)?)?;
        if target_name != ".text" {
            logger.info(&format!("skipping relocation section for {target_name}"));
            continue;
        }

        let symtab_index = header.link;
        let is_rela = header.r#type == SectionType::Rela;
        let entry_size = if is_rela { ELF64_RELA_SIZE } else { ELF64_REL_SIZE } as u64;
        let entry_size = if header.entry_size != 0 { header.entry_size } else { entry_size };

        let data = object.section_by_index(index)?.data.clone();
        if data.len() as u64 % entry_size != 0 {
            return Err(crate::elf::Error::MisalignedSectionData {
                size: data.len() as u64,
                entsize: entry_size,
            }
            .into());
        }
        let count = (data.len() as u64 / entry_size) as usize;
        let mut updated = data.clone();
        let mut any_dirty = false;

        for i in 0..count {
            let start = i * entry_size as usize;
            let slice = &data[start..start + entry_size as usize];

            let (offset, mut info, addend) = if is_rela {
                let rela = RelocationAddend::from_reader(&mut Cursor::new(slice))?;
                (rela.offset, rela.info, Some(rela.addend))
            } else {
                let rel = Relocation::from_reader(&mut Cursor::new(slice))?;
                (rel.offset, rel.info, None)
            };

            let rewritten = rewrite_call_site(
                object,
                arch,
                symtab_index,
                target_index,
                offset,
                &mut info,
                instances,
                logger,
            )?;

            if rewritten {
                write_entry(&mut updated[start..start + entry_size as usize], offset, info, addend)?;
                any_dirty = true;
            }
        }

        if any_dirty {
            object.new_data(index, updated)?;
            object.mark_dirty(target_index)?;
        }
    }

    Ok(())
}

fn write_entry(out: &mut [u8], offset: u64, info: RelocationInfo, addend: Option<i64>) -> Result<(), Error> {
    use crate::elf::base::ToWriter;
    let mut buf = Vec::with_capacity(out.len());
    match addend {
        Some(addend) => RelocationAddend { offset, info, addend }.to_writer(&mut buf)?,
        None => Relocation { offset, info }.to_writer(&mut buf)?,
    }
    out.copy_from_slice(&buf);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arch::x86_64::X86_64;
    use crate::elf::base::ToWriter;
    use crate::elf::header::{ElfHeader, ElfIdentifier, ElfMachine, ElfType, ELF64_EHDR_SIZE};
    use crate::elf::relocation::RelocationInfo;
    use crate::elf::section::{Section, SectionFlags, SectionHeader, ELF64_SHDR_SIZE};
    use crate::elf::symbol::Symbol;
    use crate::logging::RecordingLogger;

    fn object_with_one_probe_call() -> ElfObject {
        let mut strtab_data = vec![0u8];
        let name_offset = strtab_data.len() as u32;
        strtab_data.extend_from_slice(b"__dtrace_probe_foo\0");

        let sym = Symbol {
            name_offset,
            info: (1 << 4) | 0, // STB_GLOBAL, STT_NOTYPE
            other: 0,
            section_index: 0,
            value: 0,
            size: 0,
        };
        let mut symtab_data = vec![0u8; 24];
        sym.to_writer(&mut symtab_data).unwrap();

        // CALL at text offset 0x10: opcode at 0x0f, displacement at 0x10..0x14.
        let mut text_data = vec![0u8; 0x20];
        text_data[0x0f] = 0xe8;

        let rela = crate::elf::relocation::RelocationAddend {
            offset: 0x10,
            info: RelocationInfo::new(1, 4),
            addend: 0,
        };
        let mut rela_data = Vec::new();
        rela.to_writer(&mut rela_data).unwrap();

        let header = ElfHeader {
            identifier: ElfIdentifier { os_abi: 0, abi_version: 0 },
            r#type: ElfType::Relocatable,
            machine: ElfMachine::X86_64,
            version: 1,
            entry: 0,
            program_header_offset: 0,
            section_header_offset: 0,
            flags: 0,
            header_size: ELF64_EHDR_SIZE as u16,
            program_header_entry_size: 0,
            program_header_entry_count: 0,
            section_header_entry_size: ELF64_SHDR_SIZE as u16,
            section_header_entry_count: 5,
            section_name_string_table_index: 4,
        };

        let sections = vec![
            Section::new(
                SectionHeader {
                    name_offset: 0,
                    r#type: SectionType::Null,
                    flags: SectionFlags::empty(),
                    address: 0,
                    offset: 0,
                    size: 0,
                    link: 0,
                    info: 0,
                    address_align: 0,
                    entry_size: 0,
                },
                Vec::new(),
            ),
            Section::new(
                SectionHeader {
                    name_offset: 0,
                    r#type: SectionType::ProgBits,
                    flags: SectionFlags::ALLOC | SectionFlags::EXEC_INSTR,
                    address: 0,
                    offset: 0,
                    size: text_data.len() as u64,
                    link: 0,
                    info: 0,
                    address_align: 16,
                    entry_size: 0,
                },
                text_data,
            ),
            Section::new(
                SectionHeader {
                    name_offset: 0,
                    r#type: SectionType::SymTab,
                    flags: SectionFlags::empty(),
                    address: 0,
                    offset: 0,
                    size: symtab_data.len() as u64,
                    link: 4,
                    info: 0,
                    address_align: 8,
                    entry_size: 24,
                },
                symtab_data,
            ),
            Section::new(
                SectionHeader {
                    name_offset: 0,
                    r#type: SectionType::Rela,
                    flags: SectionFlags::empty(),
                    address: 0,
                    offset: 0,
                    size: rela_data.len() as u64,
                    link: 2,
                    info: 1,
                    address_align: 8,
                    entry_size: ELF64_RELA_SIZE as u64,
                },
                rela_data,
            ),
            Section::new(
                SectionHeader {
                    name_offset: 0,
                    r#type: SectionType::StrTab,
                    flags: SectionFlags::empty(),
                    address: 0,
                    offset: 0,
                    size: strtab_data.len() as u64,
                    link: 0,
                    info: 0,
                    address_align: 1,
                    entry_size: 0,
                },
                strtab_data,
            ),
        ];

        crate::elf::object::test_support::from_sections(header, sections)
    }

    #[test]
    fn scans_and_rewrites_single_call_site() {
        let mut object = object_with_one_probe_call();
        let mut instances = ProbeInstanceList::new();
        let logger = RecordingLogger::new();

        scan_relocations(&mut object, &X86_64, &mut instances, &logger).unwrap();

        assert_eq!(instances.len(), 1);
        let inst = instances.iter().next().unwrap();
        assert_eq!(inst.offset, 0x10);
        assert_eq!(inst.symbol_name, "__dtrace_probe_foo");

        let text = object.section_by_index(1).unwrap();
        assert_eq!(&text.data[0x0f..0x14], &[0x90, 0x90, 0x90, 0x90, 0x90]);

        let rela = object.section_by_index(3).unwrap();
        let parsed = crate::elf::relocation::RelocationAddend::from_reader(&mut Cursor::new(&rela.data)).unwrap();
        assert_eq!(parsed.info.r#type(), 0);
    }
}
