//! Minimal x86/x86_64 inline hook: the displaced prologue is relocated into a trampoline and
//! the entry is overwritten with an absolute jump to the replacement.

use iced_x86::{BlockEncoder, BlockEncoderOptions, Decoder, DecoderOptions, FlowControl, Instruction, InstructionBlock};
use region::Protection;

use super::{memory::{CodeMemory, ExecutableMemoryPatch, ProcessMemory}, Error};

const PROLOGUE_SCAN: usize = 64;
const TRAMPOLINE_SIZE: usize = 128;
const NOP: u8 = 0x90;

pub struct InlineHook {
    target: usize,
    patch: ExecutableMemoryPatch,
    trampoline: region::Allocation
}

// The trampoline allocation is only written during install
unsafe impl Send for InlineHook {}
unsafe impl Sync for InlineHook {}

/// Absolute jump that does not depend on the distance between `from` and `to`.
pub fn absolute_jump(to: usize) -> Vec<u8> {
    let mut code = Vec::with_capacity(14);
    if usize::BITS == 64 {
        // jmp [rip+0]; dq to
        code.extend_from_slice(&[0xFF, 0x25, 0x00, 0x00, 0x00, 0x00]);
        code.extend_from_slice(&(to as u64).to_le_bytes());
    }
    else {
        // push imm32; ret
        code.push(0x68);
        code.extend_from_slice(&(to as u32).to_le_bytes());
        code.push(0xC3);
    }
    code
}

impl InlineHook {
    /// # Safety
    /// `target` must be the entry of a function whose first bytes are not a jump target of
    /// its own body, and no thread may be executing them while they are rewritten.
    pub unsafe fn install(target: usize, detour: usize) -> Result<InlineHook, Error> {
        if !cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
            return Err(Error::HookingError("unsupported architecture".to_owned()));
        }
        if target == 0 {
            return Err(Error::InvalidAddress(target));
        }
        if detour == 0 {
            return Err(Error::InvalidAddress(detour));
        }

        let entry_jump = absolute_jump(detour);
        let memory = ProcessMemory;
        let prologue = memory.read(target, PROLOGUE_SCAN).ok_or(Error::InvalidAddress(target))?;
        let instructions = decode_prologue(prologue, target, entry_jump.len())?;
        let stolen_len: usize = instructions.iter().map(|i| i.len()).sum();

        let mut trampoline = region::alloc(TRAMPOLINE_SIZE, Protection::READ_WRITE_EXECUTE)?;
        let trampoline_addr = trampoline.as_ptr::<u8>() as usize;

        let block = InstructionBlock::new(&instructions, trampoline_addr as u64);
        let mut code = BlockEncoder::encode(usize::BITS, block, BlockEncoderOptions::NONE)
            .map_err(|e| Error::HookingError(format!("failed to relocate prologue of {:#x}: {}", target, e)))?
            .code_buffer;
        code.extend(absolute_jump(target + stolen_len));

        if code.len() > TRAMPOLINE_SIZE {
            return Err(Error::HookingError(format!("trampoline for {:#x} needs {} bytes", target, code.len())));
        }
        std::ptr::copy_nonoverlapping(code.as_ptr(), trampoline.as_mut_ptr::<u8>(), code.len());

        let mut patch_bytes = entry_jump;
        patch_bytes.resize(stolen_len, NOP);
        let patch = ExecutableMemoryPatch::apply(target, &patch_bytes)?;

        Ok(InlineHook {
            target,
            patch,
            trampoline
        })
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn trampoline_addr(&self) -> usize {
        self.trampoline.as_ptr::<u8>() as usize
    }

    /// Puts the original prologue back. The trampoline is freed with `self`.
    ///
    /// # Safety
    /// No thread may be executing the patched bytes or the trampoline.
    pub unsafe fn remove(self) -> Result<(), Error> {
        self.patch.revert()
    }
}

fn decode_prologue(code: &[u8], ip: usize, min_len: usize) -> Result<Vec<Instruction>, Error> {
    let mut decoder = Decoder::with_ip(usize::BITS, code, ip as u64, DecoderOptions::NONE);
    let mut instructions = Vec::new();
    let mut total = 0;

    while total < min_len {
        if !decoder.can_decode() {
            return Err(Error::HookingError(format!("prologue of {:#x} is not readable", ip)));
        }

        let instr = decoder.decode();
        if instr.is_invalid() {
            return Err(Error::HookingError(format!("invalid instruction at {:#x}", instr.ip())));
        }

        total += instr.len();
        let ends_function = matches!(
            instr.flow_control(),
            FlowControl::Return | FlowControl::Interrupt | FlowControl::UnconditionalBranch |
            FlowControl::IndirectBranch | FlowControl::Exception
        );
        instructions.push(instr);

        if ends_function && total < min_len {
            return Err(Error::HookingError(format!("function at {:#x} is too short to hook ({} bytes)", ip, total)));
        }
    }

    Ok(instructions)
}
