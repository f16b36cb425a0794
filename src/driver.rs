//! The driver: per-object orchestration of scan → resolve → emit → flush.
//!
//! Grounded in `process_obj`: open read/write, require `ET_REL` (skip with
//! a warning otherwise), scan for probe call sites, and if any were found,
//! add the instance sections and emit a record for each before flushing.
//! Unlike the source, the ELF handle here is owned by value and dropped
//! normally on every path, so there is nothing to leak on the "not ET_REL"
//! early return.

use crate::arch;
use crate::elf::object::ElfObject;
use crate::emitter::{create_instance_sections, emit_instance};
use crate::error::Error;
use crate::logging::Logger;
use crate::probe::ProbeInstanceList;
use crate::resolver::resolve;
use crate::scanner::scan_relocations;
use std::io::Cursor;
use std::path::Path;

/// The outcome of running the pipeline over a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not a relocatable object; left untouched.
    Skipped,
    /// Relocatable, but no probe-stub call sites were found.
    NoProbes,
    /// Probe call sites were rewritten and `count` instances emitted.
    Processed { count: usize },
}

/// Run the full pipeline over an in-memory object image.
///
/// Returns the outcome plus the bytes to write back: the original bytes,
/// unmodified, for `Skipped`/`NoProbes`; the flushed, rewritten image for
/// `Processed`.
pub fn run_on_object(data: &[u8], logger: &dyn Logger) -> Result<(Outcome, Vec<u8>), Error> {
    let mut object = match ElfObject::open_rw(&mut Cursor::new(data)) {
        Ok(object) => object,
        Err(crate::elf::Error::NotRelocatable) => {
            logger.warn("invalid ELF type, skipping");
            return Ok((Outcome::Skipped, data.to_vec()));
        }
        Err(err) => return Err(err.into()),
    };

    let arch = arch::for_machine(object.header.machine)?;

    let mut instances = ProbeInstanceList::new();
    scan_relocations(&mut object, arch.as_ref(), &mut instances, logger)?;

    if instances.is_empty() {
        logger.info("no probes found");
        return Ok((Outcome::NoProbes, data.to_vec()));
    }

    let mut iter = instances.iter();
    let Some(first_instance) = iter.next() else {
        unreachable!("instances list was just checked to be non-empty");
    };
    let first_probe = resolve(&object, first_instance)?;
    let sections = create_instance_sections(&mut object, first_probe.symtab_index)?;
    emit_instance(&mut object, arch.as_ref(), &sections, first_instance, &first_probe, logger)?;
    let mut count = 1;

    for instance in iter {
        let probe = resolve(&object, instance)?;
        emit_instance(&mut object, arch.as_ref(), &sections, instance, &probe, logger)?;
        count += 1;
    }

    let mut out = Vec::new();
    object.flush(&mut out)?;

    Ok((Outcome::Processed { count }, out))
}

/// Process one object file in place on disk.
pub fn run_on_path(path: &Path, logger: &dyn Logger) -> Result<Outcome, Error> {
    let data = std::fs::read(path).map_err(crate::elf::Error::from)?;
    let (outcome, out) = run_on_object(&data, logger)?;
    if matches!(outcome, Outcome::Processed { .. }) {
        std::fs::write(path, out).map_err(crate::elf::Error::from)?;
    }
    Ok(outcome)
}

/// Process every path in `paths`, logging and continuing past a skip but
/// propagating the first fatal error.
pub fn run_files(paths: &[std::path::PathBuf], logger: &dyn Logger) -> Result<(), Error> {
    for path in paths {
        logger.info(&format!("processing {}", path.display()));
        run_on_path(path, logger)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::logging::RecordingLogger;

    #[test]
    fn skips_non_relocatable_without_error() {
        // A header whose class/magic are wrong short-circuits at the ELF
        // access layer before the ET_REL check; that's a structural error,
        // not a skip, and is exercised separately in elf::object's tests.
        // Here we only confirm run_on_object never panics on the smallest
        // possible malformed input.
        let logger = RecordingLogger::new();
        let err = run_on_object(&[0u8; 4], &logger).unwrap_err();
        assert!(matches!(err, Error::Elf(_)));
    }
}
