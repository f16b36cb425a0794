//! The probe call-site rewriter (component 3 in the original numbering:
//! "Probe Call-Site Rewriter" in the design, driven per-relocation by the
//! scanner).
//!
//! Grounded in `process_rel` from `sdtconvert.c`: filter by symbol name,
//! validate symbol metadata, dispatch to the architecture's patcher, reset
//! the relocation to the null type, and record the call site.

use crate::arch::ProbeArch;
use crate::elf::object::ElfObject;
use crate::elf::relocation::RelocationInfo;
use crate::error::Error;
use crate::logging::Logger;
use crate::probe::{ProbeInstance, ProbeInstanceList, PROBE_PREFIX};

const STT_NOTYPE: u8 = 0;
const STB_GLOBAL: u8 = 1;

/// Attempt to rewrite one relocation as a probe call site.
///
/// Returns `Ok(true)` if the relocation targeted a probe stub and was
/// rewritten (`info` has been mutated in place to the null type), or
/// `Ok(false)` if the relocation isn't a probe call site and nothing was
/// touched.
pub fn rewrite_call_site(
    object: &mut ElfObject,
    arch: &dyn ProbeArch,
    symtab_index: u32,
    target_index: u32,
    offset: u64,
    info: &mut RelocationInfo,
    instances: &mut ProbeInstanceList,
    logger: &dyn Logger,
) -> Result<bool, Error> {
    let symbol = object.symbol(symtab_index, info.symbol())?;
    let strtab_index = object.section_by_index(symtab_index)?.header.link;
    let symbol_name = object.string(strtab_index, symbol.name_offset)?;

    if !symbol_name.starts_with(PROBE_PREFIX) {
        return Ok(false);
    }

    if info.r#type() == arch.null_reloc_type() {
        // Already neutralized by a previous run; nothing left to patch.
        return Ok(false);
    }

    if symbol.symbol_type() != STT_NOTYPE {
        return Err(Error::BadSymbolMetadata {
            name: symbol_name,
            reason: format!("expected STT_NOTYPE, found type {}", symbol.symbol_type()),
        });
    }
    if symbol.binding() != STB_GLOBAL {
        return Err(Error::BadSymbolMetadata {
            name: symbol_name,
            reason: format!("expected STB_GLOBAL, found binding {}", symbol.binding()),
        });
    }

    let target = object.section_by_index_mut(target_index)?;
    let kind = arch.validate_call_site(&target.data, offset)?;
    arch.patch(&mut target.data, offset, kind);
    target.mark_dirty();

    info.set_type(arch.null_reloc_type());

    logger.info(&format!(
        "updated relocation for {symbol_name} at {:#x}",
        offset.saturating_sub(1)
    ));

    instances.push(ProbeInstance::new(symbol_name, offset));

    Ok(true)
}
