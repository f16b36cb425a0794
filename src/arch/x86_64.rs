//! x86-64 probe call-site patching.
//!
//! Grounded directly in `process_rel`'s `EM_X86_64` branch: a probe stub
//! call site is a 5-byte `CALL rel32` (`0xE8`) or `JMP rel32` (`0xE9`) with
//! a zero displacement awaiting relocation. Rewriting turns the whole
//! 5-byte instruction into NOPs, except a tail call's opcode byte becomes
//! `RET` so control still exits the function.

use super::{CallSiteKind, ProbeArch};
use crate::elf::relocation::{R_X86_64_64, R_X86_64_NONE};
use crate::error::Error;

const CALL: u8 = 0xe8;
const JMP32: u8 = 0xe9;
const NOP: u8 = 0x90;
const RETQ: u8 = 0xc3;

pub struct X86_64;

impl ProbeArch for X86_64 {
    fn validate_call_site(&self, data: &[u8], offset: u64) -> Result<CallSiteKind, Error> {
        let offset = offset as usize;
        if offset == 0 || offset + 4 > data.len() {
            return Err(Error::BadOpcode { offset: offset as u64, byte: 0 });
        }

        let opcode = data[offset - 1];
        let kind = match opcode {
            CALL => CallSiteKind::Call,
            JMP32 => CallSiteKind::TailCall,
            other => return Err(Error::BadOpcode { offset: offset as u64, byte: other }),
        };

        if data[offset..offset + 4] != [0, 0, 0, 0] {
            return Err(Error::NonZeroDisplacement { offset: offset as u64 });
        }

        Ok(kind)
    }

    fn patch(&self, data: &mut [u8], offset: u64, kind: CallSiteKind) {
        let offset = offset as usize;
        data[offset - 1..offset + 4].fill(NOP);
        if kind == CallSiteKind::TailCall {
            data[offset - 1] = RETQ;
        }
    }

    fn null_reloc_type(&self) -> u32 {
        R_X86_64_NONE
    }

    fn absolute_reloc_type(&self) -> u32 {
        R_X86_64_64
    }
}
