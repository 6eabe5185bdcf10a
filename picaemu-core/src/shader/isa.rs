//! Vertex shader microcode word formats.
//!
//! Instructions are 32-bit words; operand swizzles live in a separate
//! table of 32-bit words indexed by the instruction's operand descriptor
//! id. The field offsets here are bit-compatible with the hardware
//! microcode format, so programs assembled for the real device decode
//! unchanged.
//!
//! Field layout by format:
//! - common arithmetic: `[desc:7][src2:5][src1:7][idx:2][dest:5][opcode:6]`
//! - inverted arithmetic: src2 widens to 7 bits, src1 narrows to 5
//! - flow control: `[num:8][..][dest_offset:12][op/uniform:2-4][refy][refx][opcode:6]`
//! - multiply-add: `[desc:5][src3:5][src2:7][src1:5][idx:2][dest:5][opcode:3..6]`

/// Shader opcodes. CMP occupies two opcode slots; MAD and MADI each
/// occupy an eight-slot range (their low opcode bits are don't-care).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Add = 0x00,
    Dp3 = 0x01,
    Dp4 = 0x02,
    Dph = 0x03,
    Ex2 = 0x05,
    Lg2 = 0x06,
    Mul = 0x08,
    Sge = 0x09,
    Slt = 0x0A,
    Flr = 0x0B,
    Max = 0x0C,
    Min = 0x0D,
    Rcp = 0x0E,
    Rsq = 0x0F,
    Mova = 0x12,
    Mov = 0x13,
    Dphi = 0x18,
    Sgei = 0x1A,
    Slti = 0x1B,
    Nop = 0x21,
    End = 0x22,
    Call = 0x24,
    Callc = 0x25,
    Callu = 0x26,
    Ifu = 0x27,
    Ifc = 0x28,
    Loop = 0x29,
    Jmpc = 0x2C,
    Jmpu = 0x2D,
    Cmp = 0x2E,
    Madi = 0x30,
    Mad = 0x38,
}

/// Broad execution category an opcode belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCategory {
    Arithmetic,
    MultiplyAdd,
    FlowControl,
}

impl OpCode {
    /// Decode the opcode field (bits 26-31). Returns `None` for words
    /// the hardware does not define.
    pub fn from_instruction_word(word: u32) -> Option<Self> {
        let op = (word >> 26) & 0x3F;
        Some(match op {
            0x00 => Self::Add,
            0x01 => Self::Dp3,
            0x02 => Self::Dp4,
            0x03 => Self::Dph,
            0x05 => Self::Ex2,
            0x06 => Self::Lg2,
            0x08 => Self::Mul,
            0x09 => Self::Sge,
            0x0A => Self::Slt,
            0x0B => Self::Flr,
            0x0C => Self::Max,
            0x0D => Self::Min,
            0x0E => Self::Rcp,
            0x0F => Self::Rsq,
            0x12 => Self::Mova,
            0x13 => Self::Mov,
            0x18 => Self::Dphi,
            0x1A => Self::Sgei,
            0x1B => Self::Slti,
            0x21 => Self::Nop,
            0x22 => Self::End,
            0x24 => Self::Call,
            0x25 => Self::Callc,
            0x26 => Self::Callu,
            0x27 => Self::Ifu,
            0x28 => Self::Ifc,
            0x29 => Self::Loop,
            0x2C => Self::Jmpc,
            0x2D => Self::Jmpu,
            0x2E | 0x2F => Self::Cmp,
            0x30..=0x37 => Self::Madi,
            0x38..=0x3F => Self::Mad,
            _ => return None,
        })
    }

    pub fn category(self) -> OpCategory {
        match self {
            Self::Mad | Self::Madi => OpCategory::MultiplyAdd,
            Self::Nop
            | Self::End
            | Self::Call
            | Self::Callc
            | Self::Callu
            | Self::Ifu
            | Self::Ifc
            | Self::Loop
            | Self::Jmpc
            | Self::Jmpu => OpCategory::FlowControl,
            _ => OpCategory::Arithmetic,
        }
    }

    /// Inverted-addressing variants move the wide (uniform-capable)
    /// source field to the second or third operand.
    pub fn is_inverted(self) -> bool {
        matches!(self, Self::Dphi | Self::Sgei | Self::Slti | Self::Madi)
    }
}

/// Register file a register value addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Input,
    Temporary,
    FloatUniform,
    Output,
}

/// A 7-bit source register value: 0x00-0x0F input, 0x10-0x1F temporary,
/// 0x20-0x7F float uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRegister(u32);

impl SourceRegister {
    pub fn from_value(value: u32) -> Self {
        Self(value & 0x7F)
    }

    pub fn kind(self) -> RegisterKind {
        match self.0 {
            0x00..=0x0F => RegisterKind::Input,
            0x10..=0x1F => RegisterKind::Temporary,
            _ => RegisterKind::FloatUniform,
        }
    }

    pub fn index(self) -> usize {
        match self.kind() {
            RegisterKind::Input => self.0 as usize,
            RegisterKind::Temporary => (self.0 - 0x10) as usize,
            _ => (self.0 - 0x20) as usize,
        }
    }

    /// Apply an address-register offset. The sum wraps within the 7-bit
    /// register space, like the hardware adder.
    pub fn offset_by(self, offset: i32) -> Self {
        Self::from_value((self.0 as i32).wrapping_add(offset) as u32)
    }
}

/// A 5-bit destination register value: 0x00-0x0F output, 0x10-0x1F
/// temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestRegister(u32);

impl DestRegister {
    pub fn from_value(value: u32) -> Self {
        Self(value & 0x1F)
    }

    pub fn kind(self) -> RegisterKind {
        if self.0 < 0x10 {
            RegisterKind::Output
        } else {
            RegisterKind::Temporary
        }
    }

    pub fn index(self) -> usize {
        (self.0 & 0xF) as usize
    }
}

/// Per-lane comparison operator for CMP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl CompareOp {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Equal),
            1 => Some(Self::NotEqual),
            2 => Some(Self::LessThan),
            3 => Some(Self::LessEqual),
            4 => Some(Self::GreaterThan),
            5 => Some(Self::GreaterEqual),
            _ => None,
        }
    }
}

/// Two-flag boolean combiner for conditional flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOp {
    Or,
    And,
    JustX,
    JustY,
}

/// A raw 32-bit instruction word with typed field accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(pub u32);

impl Instruction {
    pub fn opcode(self) -> Option<OpCode> {
        OpCode::from_instruction_word(self.0)
    }

    // -- Common arithmetic format ---------------------------------------

    pub fn operand_desc_id(self) -> usize {
        (self.0 & 0x7F) as usize
    }

    pub fn src1(self, inverted: bool) -> SourceRegister {
        if inverted {
            SourceRegister::from_value((self.0 >> 14) & 0x1F)
        } else {
            SourceRegister::from_value((self.0 >> 12) & 0x7F)
        }
    }

    pub fn src2(self, inverted: bool) -> SourceRegister {
        if inverted {
            SourceRegister::from_value((self.0 >> 7) & 0x7F)
        } else {
            SourceRegister::from_value((self.0 >> 7) & 0x1F)
        }
    }

    /// 0 = no indirection, 1/2 = a0.x/a0.y, 3 = loop counter aL.
    pub fn address_register_index(self) -> usize {
        ((self.0 >> 19) & 0x3) as usize
    }

    pub fn dest(self) -> DestRegister {
        DestRegister::from_value((self.0 >> 21) & 0x1F)
    }

    pub fn compare_op_x(self) -> Option<CompareOp> {
        CompareOp::from_raw((self.0 >> 24) & 0x7)
    }

    pub fn compare_op_y(self) -> Option<CompareOp> {
        CompareOp::from_raw((self.0 >> 21) & 0x7)
    }

    // -- Flow control format --------------------------------------------

    pub fn num_instructions(self) -> u32 {
        self.0 & 0xFF
    }

    pub fn dest_offset(self) -> u32 {
        (self.0 >> 10) & 0xFFF
    }

    pub fn flow_op(self) -> FlowOp {
        match (self.0 >> 22) & 0x3 {
            0 => FlowOp::Or,
            1 => FlowOp::And,
            2 => FlowOp::JustX,
            _ => FlowOp::JustY,
        }
    }

    pub fn bool_uniform_id(self) -> usize {
        ((self.0 >> 22) & 0xF) as usize
    }

    pub fn int_uniform_id(self) -> usize {
        ((self.0 >> 22) & 0x3) as usize
    }

    pub fn refx(self) -> bool {
        (self.0 >> 25) & 1 != 0
    }

    pub fn refy(self) -> bool {
        (self.0 >> 24) & 1 != 0
    }

    // -- Multiply-add format --------------------------------------------

    pub fn mad_operand_desc_id(self) -> usize {
        (self.0 & 0x1F) as usize
    }

    pub fn mad_src1(self) -> SourceRegister {
        SourceRegister::from_value((self.0 >> 17) & 0x1F)
    }

    pub fn mad_src2(self, inverted: bool) -> SourceRegister {
        if inverted {
            SourceRegister::from_value((self.0 >> 12) & 0x1F)
        } else {
            SourceRegister::from_value((self.0 >> 10) & 0x7F)
        }
    }

    pub fn mad_src3(self, inverted: bool) -> SourceRegister {
        if inverted {
            SourceRegister::from_value((self.0 >> 5) & 0x7F)
        } else {
            SourceRegister::from_value((self.0 >> 5) & 0x1F)
        }
    }

    pub fn mad_address_register_index(self) -> usize {
        ((self.0 >> 22) & 0x3) as usize
    }

    pub fn mad_dest(self) -> DestRegister {
        DestRegister::from_value((self.0 >> 24) & 0x1F)
    }
}

/// A 32-bit swizzle-pattern word: four 2-bit component selectors per
/// source (three sources), a negate flag per source, and a 4-bit
/// destination write mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwizzlePattern(pub u32);

impl SwizzlePattern {
    const SELECTOR_BASE: [u32; 3] = [5, 14, 23];
    const NEGATE_BIT: [u32; 3] = [4, 13, 22];

    /// Component selector for source `src` (0-based), destination
    /// component `comp`. Returns the source component index 0-3.
    pub fn selector(self, src: usize, comp: usize) -> usize {
        let shift = Self::SELECTOR_BASE[src] + 2 * (3 - comp as u32);
        ((self.0 >> shift) & 0x3) as usize
    }

    pub fn negate(self, src: usize) -> bool {
        (self.0 >> Self::NEGATE_BIT[src]) & 1 != 0
    }

    /// Write mask: component 0 (x) is gated by the mask's MSB.
    pub fn dest_component_enabled(self, comp: usize) -> bool {
        self.0 & (0x8 >> comp) != 0
    }
}
