//! Follows compiler-generated forwarding stubs to the real body of a method.
//!
//! il2cpp method pointers frequently point at small thunks (register loads followed by an
//! indirect jump, `this` adjustments, push/ret pairs) rather than at the function itself.
//! Hooking a thunk only intercepts callers that go through that particular thunk, so every
//! address is walked forward until no recognized forwarding idiom remains.

use std::fmt;

use iced_x86::{Decoder, DecoderOptions, Instruction, Mnemonic, OpKind, Register};
use serde::{Deserialize, Serialize};

use super::{memory::CodeMemory, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrampolinePattern {
    MovImm64JmpRax,
    JmpImmediate,
    JmpRipRelative,
    PushImmRet
}

impl fmt::Display for TrampolinePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrampolinePattern::MovImm64JmpRax => "mov rax, imm64; jmp rax",
            TrampolinePattern::JmpImmediate => "jmp imm",
            TrampolinePattern::JmpRipRelative => "jmp [rip+disp32]",
            TrampolinePattern::PushImmRet => "push imm; ret"
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Stubs followed before giving up and returning the last address reached.
    pub max_hops: usize,
    /// Instructions decoded per stub.
    pub max_instructions: usize,
    /// Bytes made available to the decoder per stub.
    pub scan_window: usize,
    /// Offset accepted in `add <this>, imm` adjustor thunks.
    pub this_adjustment: u64,
    #[serde(skip)]
    pub bitness: u32,
    #[serde(skip)]
    pub this_register: Register
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_hops: 6,
            max_instructions: 16,
            scan_window: 256,
            this_adjustment: 0x10,
            bitness: usize::BITS,
            this_register: default_this_register()
        }
    }
}

fn default_this_register() -> Register {
    if cfg!(target_pointer_width = "32") {
        Register::ECX
    }
    else if cfg!(target_os = "windows") {
        Register::RCX
    }
    else {
        Register::RDI
    }
}

/// Outcome of walking a method pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub original: usize,
    pub address: usize,
    pub patterns: Vec<TrampolinePattern>
}

impl Resolution {
    pub fn is_forwarded(&self) -> bool {
        !self.patterns.is_empty()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patterns.is_empty() {
            return write!(f, "{:#x} (no forwarding)", self.address);
        }

        write!(f, "{:#x} -> {:#x} via ", self.original, self.address)?;
        for (i, pattern) in self.patterns.iter().enumerate() {
            if i != 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", pattern)?;
        }
        Ok(())
    }
}

pub struct MethodResolver<'a, M: CodeMemory> {
    memory: &'a M,
    config: ResolverConfig
}

impl<'a, M: CodeMemory> MethodResolver<'a, M> {
    pub fn new(memory: &'a M) -> Self {
        Self::with_config(memory, ResolverConfig::default())
    }

    pub fn with_config(memory: &'a M, config: ResolverConfig) -> Self {
        MethodResolver { memory, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Returns the address of the body `start` eventually forwards to, or `start` itself when
    /// it is not a recognized stub. Only a null or unreadable `start` is an error.
    pub fn resolve(&self, start: usize) -> Result<Resolution, Error> {
        if start == 0 || self.memory.read(start, 1).is_none() {
            return Err(Error::InvalidAddress(start));
        }

        let mut address = start;
        let mut patterns = Vec::new();

        for _ in 0..self.config.max_hops {
            let Some((target, pattern)) = self.follow(address) else {
                break;
            };

            debug!("MethodResolver: {:#x} -> {:#x} ({})", address, target, pattern);
            patterns.push(pattern);
            address = target;
        }

        let resolution = Resolution {
            original: start,
            address,
            patterns
        };
        info!("MethodResolver: resolved {}", resolution);

        Ok(resolution)
    }

    /// Decodes a single stub and returns where it forwards to.
    fn follow(&self, address: usize) -> Option<(usize, TrampolinePattern)> {
        let Some(code) = self.memory.read(address, self.config.scan_window) else {
            warn!("MethodResolver: {:#x} is not readable", address);
            return None;
        };

        let mut decoder = Decoder::with_ip(self.config.bitness, code, address as u64, DecoderOptions::NONE);
        let mut instr = Instruction::default();
        let mut mov_rax_imm = 0u64;

        for _ in 0..self.config.max_instructions {
            if !decoder.can_decode() {
                return None;
            }
            decoder.decode_out(&mut instr);

            match instr.mnemonic() {
                Mnemonic::Int3 => return None,

                Mnemonic::Add => {
                    if self.is_this_adjustment(&instr) {
                        continue;
                    }
                    return None;
                }

                Mnemonic::Mov if instr.op0_register() == Register::RAX && instr.op1_kind() == OpKind::Immediate64 => {
                    mov_rax_imm = instr.immediate64();
                }

                Mnemonic::Jmp => return self.jump_target(&instr, mov_rax_imm),

                Mnemonic::Push => {
                    let imm = match instr.op0_kind() {
                        OpKind::Immediate64 => instr.immediate64(),
                        OpKind::Immediate32 | OpKind::Immediate32to64 => instr.immediate32() as u64,
                        _ => return None
                    };

                    if !decoder.can_decode() {
                        return None;
                    }
                    let next = decoder.decode();
                    if next.mnemonic() == Mnemonic::Ret && imm != 0 {
                        return Some((imm as usize, TrampolinePattern::PushImmRet));
                    }
                    return None;
                }

                _ => return None
            }
        }

        None
    }

    fn is_this_adjustment(&self, instr: &Instruction) -> bool {
        instr.op0_kind() == OpKind::Register &&
        instr.op0_register() == self.config.this_register &&
        matches!(instr.op1_kind(), OpKind::Immediate8to32 | OpKind::Immediate8to64 | OpKind::Immediate32 | OpKind::Immediate32to64) &&
        instr.immediate(1) == self.config.this_adjustment
    }

    fn jump_target(&self, instr: &Instruction, mov_rax_imm: u64) -> Option<(usize, TrampolinePattern)> {
        match instr.op0_kind() {
            OpKind::Register if instr.op0_register() == Register::RAX && mov_rax_imm != 0 => {
                Some((mov_rax_imm as usize, TrampolinePattern::MovImm64JmpRax))
            }

            OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64 => {
                Some((instr.near_branch_target() as usize, TrampolinePattern::JmpImmediate))
            }

            OpKind::FarBranch16 => Some((instr.far_branch16() as usize, TrampolinePattern::JmpImmediate)),
            OpKind::FarBranch32 => Some((instr.far_branch32() as usize, TrampolinePattern::JmpImmediate)),

            OpKind::Memory if instr.is_ip_rel_memory_operand() => {
                let slot = instr.ip_rel_memory_address() as usize;
                match self.memory.read_usize(slot) {
                    Some(target) if target != 0 => Some((target, TrampolinePattern::JmpRipRelative)),
                    _ => {
                        warn!("MethodResolver: jump slot {:#x} is not readable", slot);
                        None
                    }
                }
            }

            _ => None
        }
    }
}
