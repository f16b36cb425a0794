//! Architecture-specific call-site patching.
//!
//! Generalizes the machine-specific branch of the rewriter into a capability
//! trait: each architecture implements `validate_call_site`/`patch`/
//! `null_reloc_type`/`absolute_reloc_type`, and the rewriter never itself
//! branches on `e_machine` beyond picking which implementation to use.

pub mod x86_64;

use crate::elf::header::ElfMachine;
use crate::error::Error;

/// What kind of control-flow transfer a probe call site turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSiteKind {
    /// A `CALL`-shaped site: control returns to the instruction after it.
    Call,
    /// A `JMP`-shaped tail call: control does not return here.
    TailCall,
}

/// A machine's probe call-site patching rules.
pub trait ProbeArch {
    /// Inspect the opcode byte preceding `offset` and the four
    /// (expected-zero) displacement bytes at `offset`, returning what kind
    /// of call site this is. Returns an error if the bytes don't look like
    /// an unresolved probe call.
    fn validate_call_site(&self, data: &[u8], offset: u64) -> Result<CallSiteKind, Error>;

    /// Overwrite the call site's bytes in place per `kind`.
    fn patch(&self, data: &mut [u8], offset: u64, kind: CallSiteKind);

    /// The architecture's "do nothing" relocation type, used to neutralize
    /// a spent probe relocation.
    fn null_reloc_type(&self) -> u32;

    /// The architecture's 64-bit absolute relocation type, used for the
    /// companion relocation emitted against the instance record's `probe`
    /// field.
    fn absolute_reloc_type(&self) -> u32;
}

/// Resolve the `ProbeArch` implementation for an ELF header's `e_machine`.
pub fn for_machine(machine: ElfMachine) -> Result<Box<dyn ProbeArch>, Error> {
    match machine {
        ElfMachine::X86_64 => Ok(Box::new(x86_64::X86_64)),
        other => Err(Error::UnsupportedMachine {
            machine: format!("{other:?}"),
        }),
    }
}
