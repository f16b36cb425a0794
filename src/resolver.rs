//! The probe-set resolver.
//!
//! Grounded in the probe-lookup half of `record_instance`: find
//! `set_sdt_probes_set`, find the unique relocation section whose `sh_info`
//! indexes it, and scan its relocations for the one whose referenced
//! symbol's `sdt_`-stripped suffix matches the instance's stub-symbol
//! suffix.

use crate::elf::object::ElfObject;
use crate::elf::section::SectionType;
use crate::error::Error;
use crate::probe::{ProbeInstance, DESCRIPTOR_PREFIX};

/// The resolved identity of a probe instance's descriptor: the symbol index
/// (within the probe-set's symbol table) of its `sdt_<name>` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedProbe {
    pub symbol_index: u32,
    pub symtab_index: u32,
}

/// Find the probe descriptor matching `instance` in `set_sdt_probes_set`.
pub fn resolve(object: &ElfObject, instance: &ProbeInstance) -> Result<ResolvedProbe, Error> {
    let missing = || Error::MissingProbeDescriptor {
        probe: instance.symbol_name.clone(),
    };

    let (probe_set_index, _) = object
        .section_by_name("set_sdt_probes_set")
        .map_err(|_| missing())?;

    let mut found_reloc_section = None;
    for index in 0..object.section_count() as u32 {
        let header = object.section_by_index(index)?.header;
        if (header.r#type == SectionType::Rel || header.r#type == SectionType::Rela)
            && header.info == probe_set_index
        {
            found_reloc_section = Some((index, header));
            break;
        }
    }

    let (reloc_index, reloc_header) = found_reloc_section.ok_or_else(missing)?;
    let symtab_index = reloc_header.link;
    let entries = decode_entries(object, reloc_index, reloc_header)?;

    for (symbol_index, _offset) in entries {
        let symbol = object.symbol(symtab_index, symbol_index)?;
        let strtab_index = object.section_by_index(symtab_index)?.header.link;
        let name = object.string(strtab_index, symbol.name_offset)?;

        if name.len() < DESCRIPTOR_PREFIX.len() {
            continue;
        }
        if name[DESCRIPTOR_PREFIX.len()..] == *instance.probe_name() {
            return Ok(ResolvedProbe {
                symbol_index,
                symtab_index,
            });
        }
    }

    Err(Error::MissingProbeDescriptor {
        probe: instance.symbol_name.clone(),
    })
}

fn decode_entries(
    object: &ElfObject,
    index: u32,
    header: crate::elf::section::SectionHeader,
) -> Result<Vec<(u32, u64)>, Error> {
    use crate::elf::base::FromReader;
    use crate::elf::relocation::{Relocation, RelocationAddend, ELF64_REL_SIZE, ELF64_RELA_SIZE};
    use std::io::Cursor;

    let is_rela = header.r#type == SectionType::Rela;
    let entry_size = if header.entry_size != 0 {
        header.entry_size
    } else if is_rela {
        ELF64_RELA_SIZE as u64
    } else {
        ELF64_REL_SIZE as u64
    };

    let section = object.section_by_index(index)?;
    if section.data.len() as u64 % entry_size != 0 {
        return Err(crate::elf::Error::MisalignedSectionData {
            size: section.data.len() as u64,
            entsize: entry_size,
        }
        .into());
    }
    let mut entries = Vec::new();
    let count = (section.data.len() as u64 / entry_size) as usize;
    for i in 0..count {
        let start = i * entry_size as usize;
        let slice = &section.data[start..start + entry_size as usize];
        let (symbol_index, offset) = if is_rela {
            let rela = RelocationAddend::from_reader(&mut Cursor::new(slice))?;
            (rela.info.symbol(), rela.offset)
        } else {
            let rel = Relocation::from_reader(&mut Cursor::new(slice))?;
            (rel.info.symbol(), rel.offset)
        };
        entries.push((symbol_index, offset));
    }
    Ok(entries)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::elf::base::ToWriter;
    use crate::elf::header::{ElfHeader, ElfIdentifier, ElfMachine, ElfType, ELF64_EHDR_SIZE};
    use crate::elf::relocation::RelocationInfo;
    use crate::elf::section::{Section, SectionFlags, SectionHeader, ELF64_SHDR_SIZE};
    use crate::elf::symbol::Symbol;

    fn object_with_probe_set() -> ElfObject {
        let mut strtab_data = vec![0u8];
        let name_offset = strtab_data.len() as u32;
        strtab_data.extend_from_slice(b"sdt_foo\0");

        let sym = Symbol {
            name_offset,
            info: (1 << 4) | 1,
            other: 0,
            section_index: 0,
            value: 0,
            size: 0,
        };
        let mut symtab_data = vec![0u8; 24];
        sym.to_writer(&mut symtab_data).unwrap();

        let probe_set_data = vec![0u8; 8];

        let rela = crate::elf::relocation::RelocationAddend {
            offset: 0,
            info: RelocationInfo::new(1, 1),
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
                    name_offset: 1, // pretend name resolves via shstrtab below
                    r#type: SectionType::ProgBits,
                    flags: SectionFlags::ALLOC,
                    address: 0,
                    offset: 0,
                    size: probe_set_data.len() as u64,
                    link: 0,
                    info: 0,
                    address_align: 8,
                    entry_size: 0,
                },
                probe_set_data,
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
                    info: 1, // sh_info indexes the probe-set section
                    address_align: 8,
                    entry_size: crate::elf::relocation::ELF64_RELA_SIZE as u64,
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
                    size: {
                        let mut d = vec![0u8];
                        d.extend_from_slice(b"set_sdt_probes_set\0");
                        d.len() as u64
                    },
                    link: 0,
                    info: 0,
                    address_align: 1,
                    entry_size: 0,
                },
                {
                    let mut d = vec![0u8];
                    d.extend_from_slice(b"set_sdt_probes_set\0");
                    d
                },
            ),
        ];

        crate::elf::object::test_support::from_sections(header, sections)
    }

    #[test]
    fn resolves_matching_descriptor() {
        let object = object_with_probe_set();
        let instance = ProbeInstance::new("__dtrace_probe_foo", 0x10);
        let resolved = resolve(&object, &instance).unwrap();
        assert_eq!(resolved.symbol_index, 1);
        assert_eq!(resolved.symtab_index, 2);
    }

    #[test]
    fn fails_when_no_descriptor_matches() {
        let object = object_with_probe_set();
        let instance = ProbeInstance::new("__dtrace_probe_bar", 0x10);
        let err = resolve(&object, &instance).unwrap_err();
        assert!(matches!(err, Error::MissingProbeDescriptor { .. }));
    }
}
