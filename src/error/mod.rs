//! Top-level error type for the probe rewriter.
//!
//! Wraps `elf::Error` (structural ELF access failures) and adds the
//! rewriter/resolver-specific fatal cases. "Wrong ELF type" is deliberately
//! not a variant here: per the driver's contract that condition is a
//! warning-and-skip, not a failure.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Elf(#[from] crate::elf::Error),

    #[error("unexpected opcode 0x{byte:02x} for probe call site at offset 0x{offset:x}")]
    BadOpcode { offset: u64, byte: u8 },

    #[error("unexpected non-zero displacement for probe call site at offset 0x{offset:x}")]
    NonZeroDisplacement { offset: u64 },

    #[error("unexpected symbol metadata for probe stub {name}: {reason}")]
    BadSymbolMetadata { name: String, reason: String },

    #[error("unhandled machine type {machine}")]
    UnsupportedMachine { machine: String },

    #[error("failed to find SDT probe relocation for {probe}")]
    MissingProbeDescriptor { probe: String },
}

pub type Result<T> = std::result::Result<T, Error>;
