//! The instance emitter.
//!
//! Grounded in `record_instance` and the section-creation calls in
//! `process_obj`, with the companion-relocation defect from the source
//! (`probe` is left zero, unresolved) fixed per design: every emitted
//! record gets a matching `R_X86_64_64` relocation pointing its `probe`
//! field at the resolved `sdt_<name>` symbol.

use crate::arch::ProbeArch;
use crate::elf::base::ToWriter;
use crate::elf::object::ElfObject;
use crate::elf::relocation::RelocationAddend;
use crate::elf::section::{SectionFlags, SectionHeader, SectionType};
use crate::error::Error;
use crate::logging::Logger;
use crate::probe::ProbeInstance;
use crate::resolver::ResolvedProbe;

/// Size in bytes of one `set_sdt_instance_set` record: an 8-byte `probe`
/// pointer placeholder plus an 8-byte call-site offset.
pub const INSTANCE_RECORD_SIZE: u64 = 16;

/// The two new sections created to hold recorded probe instances.
pub struct InstanceSections {
    pub instance_section: u32,
    pub rela_section: u32,
}

/// Create the (empty) `set_sdt_instance_set` and `.relaset_sdt_instance_set`
/// sections. Called once per object, only when at least one instance was
/// recorded.
pub fn create_instance_sections(object: &mut ElfObject, symtab_index: u32) -> Result<InstanceSections, Error> {
    let instance_section = object.add_section(
        "set_sdt_instance_set",
        SectionHeader {
            name_offset: 0,
            r#type: SectionType::ProgBits,
            flags: SectionFlags::ALLOC,
            address: 0,
            offset: 0,
            size: 0,
            link: 0,
            info: 0,
            address_align: 8,
            entry_size: 0,
        },
        Vec::new(),
    )?;

    let rela_section = object.add_section(
        ".relaset_sdt_instance_set",
        SectionHeader {
            name_offset: 0,
            r#type: SectionType::Rela,
            flags: SectionFlags::empty(),
            address: 0,
            offset: 0,
            size: 0,
            link: symtab_index,
            info: instance_section,
            address_align: 8,
            entry_size: crate::elf::relocation::ELF64_RELA_SIZE as u64,
        },
        Vec::new(),
    )?;

    Ok(InstanceSections {
        instance_section,
        rela_section,
    })
}

/// Append one record for `instance` (resolved to `probe`) to the instance
/// sections created by `create_instance_sections`.
pub fn emit_instance(
    object: &mut ElfObject,
    arch: &dyn ProbeArch,
    sections: &InstanceSections,
    instance: &ProbeInstance,
    probe: &ResolvedProbe,
    logger: &dyn Logger,
) -> Result<(), Error> {
    let instance_section = object.section_by_index(sections.instance_section)?;
    let record_index = instance_section.data.len() as u64 / INSTANCE_RECORD_SIZE;

    let mut record = Vec::with_capacity(INSTANCE_RECORD_SIZE as usize);
    record.extend_from_slice(&0u64.to_le_bytes()); // probe: filled in by the linker via the relocation below
    record.extend_from_slice(&instance.offset.to_le_bytes());

    let mut instance_data = object.section_by_index(sections.instance_section)?.data.clone();
    instance_data.extend_from_slice(&record);
    object.new_data(sections.instance_section, instance_data)?;

    let rela = RelocationAddend {
        offset: record_index * INSTANCE_RECORD_SIZE,
        info: crate::elf::relocation::RelocationInfo::new(probe.symbol_index, arch.absolute_reloc_type()),
        addend: 0,
    };
    let mut rela_bytes = Vec::new();
    rela.to_writer(&mut rela_bytes)?;

    let mut rela_data = object.section_by_index(sections.rela_section)?.data.clone();
    rela_data.extend_from_slice(&rela_bytes);
    object.new_data(sections.rela_section, rela_data)?;

    logger.info(&format!(
        "recorded probe instance for {} at {:#x}",
        instance.symbol_name, instance.offset
    ));

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arch::x86_64::X86_64;
    use crate::elf::header::{ElfHeader, ElfIdentifier, ElfMachine, ElfType, ELF64_EHDR_SIZE};
    use crate::elf::section::{Section, ELF64_SHDR_SIZE};
    use crate::logging::RecordingLogger;

    fn empty_object() -> ElfObject {
        let strtab_data = vec![0u8];
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
            section_header_entry_count: 2,
            section_name_string_table_index: 1,
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
    fn emits_record_and_relocation() {
        let mut object = empty_object();
        let sections = create_instance_sections(&mut object, 3).unwrap();
        let logger = RecordingLogger::new();
        let instance = ProbeInstance::new("__dtrace_probe_foo", 0x10);
        let probe = ResolvedProbe {
            symbol_index: 5,
            symtab_index: 3,
        };

        emit_instance(&mut object, &X86_64, &sections, &instance, &probe, &logger).unwrap();

        let instance_section = object.section_by_index(sections.instance_section).unwrap();
        assert_eq!(instance_section.data.len(), 16);
        assert_eq!(&instance_section.data[8..16], &0x10u64.to_le_bytes());

        let rela_section = object.section_by_index(sections.rela_section).unwrap();
        assert_eq!(rela_section.data.len(), crate::elf::relocation::ELF64_RELA_SIZE);
        let rela = {
            use crate::elf::base::FromReader;
            RelocationAddend::from_reader(&mut std::io::Cursor::new(&rela_section.data)).unwrap()
        };
        assert_eq!(rela.info.symbol(), 5);
        assert_eq!(rela.info.r#type(), crate::elf::relocation::R_X86_64_64);
        assert_eq!(rela.offset, 0);
    }
}
