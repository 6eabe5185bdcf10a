//! Hand-assembly helpers for microcode words.
//!
//! These pack the field layouts from [`isa`](super::isa) back into raw
//! words. They exist for building small programs in tests and demos;
//! there is no full assembler behind them.

use super::isa::OpCode;

/// Identity component selector (.xyzw).
pub const SEL_XYZW: [u32; 4] = [0, 1, 2, 3];

pub const COND_OR: u32 = 0;
pub const COND_AND: u32 = 1;
pub const COND_JUST_X: u32 = 2;
pub const COND_JUST_Y: u32 = 3;

/// Common-format arithmetic instruction.
pub fn arith(op: OpCode, dest: u32, src1: u32, src2: u32, desc: u32) -> u32 {
    ((op as u32) << 26) | ((dest & 0x1F) << 21) | ((src1 & 0x7F) << 12) | ((src2 & 0x1F) << 7)
        | (desc & 0x7F)
}

/// Common-format arithmetic instruction with an address register index
/// applied to src1 (1 = a0.x, 2 = a0.y, 3 = aL).
pub fn arith_indexed(op: OpCode, dest: u32, idx: u32, src1: u32, src2: u32, desc: u32) -> u32 {
    arith(op, dest, src1, src2, desc) | ((idx & 0x3) << 19)
}

/// CMP: per-lane compare ops update the condition flags, no destination.
pub fn cmp(src1: u32, src2: u32, op_x: u32, op_y: u32, desc: u32) -> u32 {
    ((OpCode::Cmp as u32) << 26)
        | ((op_x & 0x7) << 24)
        | ((op_y & 0x7) << 21)
        | ((src1 & 0x7F) << 12)
        | ((src2 & 0x1F) << 7)
        | (desc & 0x7F)
}

/// MAD: dest = src1 * src2 + src3. The destination field shares bits
/// with the low half of the opcode range.
pub fn mad(dest: u32, src1: u32, src2: u32, src3: u32, desc: u32) -> u32 {
    (0b111 << 29)
        | ((dest & 0x1F) << 24)
        | ((src1 & 0x1F) << 17)
        | ((src2 & 0x7F) << 10)
        | ((src3 & 0x1F) << 5)
        | (desc & 0x1F)
}

pub fn nop() -> u32 {
    (OpCode::Nop as u32) << 26
}

pub fn end() -> u32 {
    (OpCode::End as u32) << 26
}

pub fn call(dest_offset: u32, num_instructions: u32) -> u32 {
    ((OpCode::Call as u32) << 26) | ((dest_offset & 0xFFF) << 10) | (num_instructions & 0xFF)
}

pub fn callu(bool_uniform_id: u32, dest_offset: u32, num_instructions: u32) -> u32 {
    ((OpCode::Callu as u32) << 26)
        | ((bool_uniform_id & 0xF) << 22)
        | ((dest_offset & 0xFFF) << 10)
        | (num_instructions & 0xFF)
}

pub fn callc(cond_op: u32, refx: bool, refy: bool, dest_offset: u32, num_instructions: u32) -> u32 {
    ((OpCode::Callc as u32) << 26)
        | ((refx as u32) << 25)
        | ((refy as u32) << 24)
        | ((cond_op & 0x3) << 22)
        | ((dest_offset & 0xFFF) << 10)
        | (num_instructions & 0xFF)
}

pub fn ifu(bool_uniform_id: u32, dest_offset: u32, num_instructions: u32) -> u32 {
    ((OpCode::Ifu as u32) << 26)
        | ((bool_uniform_id & 0xF) << 22)
        | ((dest_offset & 0xFFF) << 10)
        | (num_instructions & 0xFF)
}

pub fn ifc(cond_op: u32, refx: bool, refy: bool, dest_offset: u32, num_instructions: u32) -> u32 {
    ((OpCode::Ifc as u32) << 26)
        | ((refx as u32) << 25)
        | ((refy as u32) << 24)
        | ((cond_op & 0x3) << 22)
        | ((dest_offset & 0xFFF) << 10)
        | (num_instructions & 0xFF)
}

pub fn jmpc(cond_op: u32, refx: bool, refy: bool, dest_offset: u32) -> u32 {
    ((OpCode::Jmpc as u32) << 26)
        | ((refx as u32) << 25)
        | ((refy as u32) << 24)
        | ((cond_op & 0x3) << 22)
        | ((dest_offset & 0xFFF) << 10)
}

/// JMPU jumps when b[id] is true; `inverted` flips the sense.
pub fn jmpu(bool_uniform_id: u32, dest_offset: u32, inverted: bool) -> u32 {
    ((OpCode::Jmpu as u32) << 26)
        | ((bool_uniform_id & 0xF) << 22)
        | ((dest_offset & 0xFFF) << 10)
        | inverted as u32
}

/// LOOP repeats the block ending at `dest_offset` (inclusive), with the
/// trip count and aL parameters taken from integer uniform `id`.
pub fn loop_block(int_uniform_id: u32, dest_offset: u32) -> u32 {
    ((OpCode::Loop as u32) << 26) | ((int_uniform_id & 0x3) << 22) | ((dest_offset & 0xFFF) << 10)
}

fn pack_selector(base: u32, sel: [u32; 4]) -> u32 {
    let mut word = 0;
    for (comp, s) in sel.iter().enumerate() {
        word |= (s & 0x3) << (base + 2 * (3 - comp as u32));
    }
    word
}

/// Two-operand swizzle word. `mask` enables destination components, x
/// component gated by bit 3.
pub fn swizzle(mask: u32, sel1: [u32; 4], neg1: bool, sel2: [u32; 4], neg2: bool) -> u32 {
    (mask & 0xF)
        | ((neg1 as u32) << 4)
        | pack_selector(5, sel1)
        | ((neg2 as u32) << 13)
        | pack_selector(14, sel2)
}

/// Three-operand swizzle word for MAD/MADI.
pub fn swizzle3(
    mask: u32,
    sel1: [u32; 4],
    neg1: bool,
    sel2: [u32; 4],
    neg2: bool,
    sel3: [u32; 4],
    neg3: bool,
) -> u32 {
    swizzle(mask, sel1, neg1, sel2, neg2) | ((neg3 as u32) << 22) | pack_selector(23, sel3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::isa::{Instruction, RegisterKind, SwizzlePattern};

    // Cross-checked against words from a hand-assembled reference program.

    #[test]
    fn arith_matches_known_words() {
        // mov r0, v0 with desc 0
        assert_eq!(arith(OpCode::Mov, 0x10, 0x00, 0, 0), 0x4e000000);
        // mov r0, c95 with desc 1
        assert_eq!(arith(OpCode::Mov, 0x10, 0x7F, 0, 1), 0x4e07f001);
        // dp4 o0, c0, r0 with desc 2
        assert_eq!(arith(OpCode::Dp4, 0x00, 0x20, 0x10, 2), 0x08020802);
        assert_eq!(end(), 0x88000000);
    }

    #[test]
    fn swizzle_matches_known_words() {
        // The single-source reference words leave the src2 selector zero
        let sel_zero = [0, 0, 0, 0];
        assert_eq!(swizzle(0b1110, SEL_XYZW, false, sel_zero, false), 0x36e);
        assert_eq!(swizzle(0b0001, [1, 1, 1, 1], false, sel_zero, false), 0xaa1);
        assert_eq!(swizzle(0b1000, SEL_XYZW, false, SEL_XYZW, false), 0x6c368);
    }

    #[test]
    fn round_trip_through_decoder() {
        let word = arith_indexed(OpCode::Add, 0x03, 3, 0x24, 0x11, 5);
        let instr = Instruction(word);
        assert_eq!(instr.opcode(), Some(OpCode::Add));
        assert_eq!(instr.dest().index(), 3);
        assert_eq!(instr.address_register_index(), 3);
        assert_eq!(instr.src1(false).kind(), RegisterKind::FloatUniform);
        assert_eq!(instr.src1(false).index(), 4);
        assert_eq!(instr.src2(false).index(), 1);
        assert_eq!(instr.operand_desc_id(), 5);

        let word = mad(0x02, 0x11, 0x21, 0x12, 3);
        let instr = Instruction(word);
        assert_eq!(instr.opcode(), Some(OpCode::Mad));
        assert_eq!(instr.mad_dest().index(), 2);
        assert_eq!(instr.mad_src1().index(), 1);
        assert_eq!(instr.mad_src2(false).kind(), RegisterKind::FloatUniform);
        assert_eq!(instr.mad_src3(false).index(), 2);
        assert_eq!(instr.mad_operand_desc_id(), 3);

        let sw = SwizzlePattern(swizzle3(
            0xF,
            [3, 2, 1, 0],
            true,
            SEL_XYZW,
            false,
            [0, 0, 0, 0],
            true,
        ));
        assert_eq!(sw.selector(0, 0), 3);
        assert_eq!(sw.selector(1, 2), 2);
        assert_eq!(sw.selector(2, 3), 0);
        assert!(sw.negate(0));
        assert!(!sw.negate(1));
        assert!(sw.negate(2));
    }

    #[test]
    fn flow_words_decode() {
        let instr = Instruction(loop_block(2, 0x47));
        assert_eq!(instr.opcode(), Some(OpCode::Loop));
        assert_eq!(instr.int_uniform_id(), 2);
        assert_eq!(instr.dest_offset(), 0x47);

        let instr = Instruction(ifc(COND_AND, true, false, 10, 2));
        assert_eq!(instr.opcode(), Some(OpCode::Ifc));
        assert!(instr.refx());
        assert!(!instr.refy());
        assert_eq!(instr.dest_offset(), 10);
        assert_eq!(instr.num_instructions(), 2);
    }
}
