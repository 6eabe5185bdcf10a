//! Vertex shader engine: a microcode interpreter over a 4-wide
//! `Float24` register file.
//!
//! A [`ShaderSetup`] holds the program and swizzle words shared by all
//! invocations of a batch; [`Uniforms`] hold the constant banks shared
//! across batches. A [`ShaderEngine`] borrows both and owns the
//! per-invocation state (input/temporary/output registers, condition
//! flags, address registers).

pub mod asm;
pub mod isa;

use smallvec::SmallVec;

use crate::error::PipelineError;
use crate::math::{Float24, Vec2, Vec3, Vec4};
use isa::{
    CompareOp, DestRegister, FlowOp, Instruction, OpCategory, OpCode, RegisterKind,
    SourceRegister, SwizzlePattern,
};

/// Size of the program code storage, in 32-bit words.
pub const MAX_PROGRAM_CODE_LENGTH: usize = 512;
/// Size of the swizzle data storage, in 32-bit words.
pub const MAX_SWIZZLE_DATA_LENGTH: usize = 128;

/// Nesting depth of the hardware call stack.
const CALL_STACK_CAPACITY: usize = 8;

/// General purpose attribute buffer, used as both shader input and
/// output.
#[derive(Debug, Clone, Copy)]
pub struct AttributeBuffer {
    pub attr: [Vec4<Float24>; 16],
}

impl Default for AttributeBuffer {
    fn default() -> Self {
        Self {
            attr: [Vec4::splat(Float24::zero()); 16],
        }
    }
}

/// Post-shader vertex in the fixed hardware layout handed to primitive
/// assembly. 24 words, including the two unused padding slots.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct OutputVertex {
    pub pos: Vec4<Float24>,
    pub quat: Vec4<Float24>,
    pub color: Vec4<Float24>,
    pub tc0: Vec2<Float24>,
    pub tc1: Vec2<Float24>,
    pub tc0_w: Float24,
    pad0: u32,
    pub view: Vec3<Float24>,
    pad1: u32,
    pub tc2: Vec2<Float24>,
}

const _: () = assert!(std::mem::size_of::<OutputVertex>() == 24 * 4);

impl OutputVertex {
    /// Build an output vertex from a shader output buffer.
    ///
    /// Output register allocation is fixed: o0 carries the clip-space
    /// position, o1 the vertex color, o2 the first texture coordinate.
    pub fn from_attribute_buffer(buffer: &AttributeBuffer) -> Self {
        let zero = Float24::zero();
        Self {
            pos: buffer.attr[0],
            quat: Vec4::splat(zero),
            color: buffer.attr[1],
            tc0: buffer.attr[2].xy(),
            tc1: Vec2::splat(zero),
            tc0_w: buffer.attr[2].w,
            pad0: 0,
            view: Vec3::new(zero, zero, zero),
            pad1: 0,
            tc2: Vec2::splat(zero),
        }
    }
}

/// Register file owned by each shader invocation.
#[derive(Debug, Clone, Copy)]
pub struct Registers {
    pub input: [Vec4<Float24>; 16],
    pub temporary: [Vec4<Float24>; 16],
    pub output: [Vec4<Float24>; 16],
}

impl Default for Registers {
    fn default() -> Self {
        let zero = Vec4::splat(Float24::zero());
        Self {
            input: [zero; 16],
            temporary: [zero; 16],
            output: [zero; 16],
        }
    }
}

/// Uniform banks: 96 float vectors, 16 booleans, 4 byte vectors.
#[derive(Debug, Clone, Copy)]
pub struct Uniforms {
    pub f: [Vec4<Float24>; 96],
    pub b: [bool; 16],
    pub i: [Vec4<u8>; 4],
}

impl Default for Uniforms {
    fn default() -> Self {
        Self {
            f: [Vec4::splat(Float24::zero()); 96],
            b: [false; 16],
            i: [Vec4::splat(0); 4],
        }
    }
}

/// Program state shared by every invocation of a batch.
#[derive(Debug, Clone)]
pub struct ShaderSetup {
    program_code: [u32; MAX_PROGRAM_CODE_LENGTH],
    swizzle_data: [u32; MAX_SWIZZLE_DATA_LENGTH],
    entry_point: u32,
}

impl ShaderSetup {
    pub fn new(
        program_code: &[u32],
        swizzle_data: &[u32],
        entry_point: u32,
    ) -> Result<Self, PipelineError> {
        if program_code.len() > MAX_PROGRAM_CODE_LENGTH {
            return Err(PipelineError::ProgramTooLong {
                len: program_code.len(),
            });
        }
        if swizzle_data.len() > MAX_SWIZZLE_DATA_LENGTH {
            return Err(PipelineError::SwizzleDataTooLong {
                len: swizzle_data.len(),
            });
        }
        if entry_point as usize >= MAX_PROGRAM_CODE_LENGTH {
            return Err(PipelineError::EntryPointOutOfRange { entry_point });
        }

        let mut code = [0u32; MAX_PROGRAM_CODE_LENGTH];
        code[..program_code.len()].copy_from_slice(program_code);
        let mut swizzles = [0u32; MAX_SWIZZLE_DATA_LENGTH];
        swizzles[..swizzle_data.len()].copy_from_slice(swizzle_data);

        Ok(Self {
            program_code: code,
            swizzle_data: swizzles,
            entry_point,
        })
    }

    /// Select the entry point for the next batch of invocations.
    pub fn setup_batch(&mut self, entry_point: u32) -> Result<(), PipelineError> {
        if entry_point as usize >= MAX_PROGRAM_CODE_LENGTH {
            return Err(PipelineError::EntryPointOutOfRange { entry_point });
        }
        self.entry_point = entry_point;
        Ok(())
    }
}

struct CallStackFrame {
    /// Address upon which we jump to `return_address`.
    final_address: u32,
    /// Where to jump when leaving the scope.
    return_address: u32,
    /// How many more iterations until the frame is popped.
    repeat_counter: u8,
    /// Added to the loop counter aL after each iteration.
    loop_increment: u8,
    /// Address execution returns to for each iteration.
    loop_address: u32,
}

/// One shader invocation's execution state.
pub struct ShaderEngine<'a> {
    setup: &'a ShaderSetup,
    uniforms: &'a Uniforms,
    registers: Registers,
    conditional_code: [bool; 2],
    /// a0.x, a0.y, aL.
    address_registers: [i32; 3],
}

impl<'a> ShaderEngine<'a> {
    pub fn new(setup: &'a ShaderSetup, uniforms: &'a Uniforms) -> Self {
        Self {
            setup,
            uniforms,
            registers: Registers::default(),
            conditional_code: [false; 2],
            address_registers: [0; 3],
        }
    }

    pub fn load_input(&mut self, input: &AttributeBuffer) {
        self.registers.input = input.attr;
    }

    pub fn write_output(&self, output: &mut AttributeBuffer) {
        output.attr = self.registers.output;
    }

    fn lookup_source(&self, reg: SourceRegister) -> Vec4<Float24> {
        match reg.kind() {
            RegisterKind::Input => self.registers.input[reg.index()],
            RegisterKind::Temporary => self.registers.temporary[reg.index()],
            _ => self.uniforms.f[reg.index()],
        }
    }

    /// Read a source operand: apply the address-register offset, fetch
    /// the register, then swizzle and negate per the operand slot.
    fn read_operand(
        &self,
        reg: SourceRegister,
        offset: i32,
        swizzle: SwizzlePattern,
        slot: usize,
    ) -> Vec4<Float24> {
        let value = self.lookup_source(reg.offset_by(offset));
        let mut out = Vec4::splat(Float24::zero());
        for comp in 0..4 {
            out[comp] = value[swizzle.selector(slot, comp)];
        }
        if swizzle.negate(slot) {
            out = -out;
        }
        out
    }

    fn write_masked(&mut self, dest: DestRegister, swizzle: SwizzlePattern, value: Vec4<Float24>) {
        let slot = match dest.kind() {
            RegisterKind::Output => &mut self.registers.output[dest.index()],
            _ => &mut self.registers.temporary[dest.index()],
        };
        for comp in 0..4 {
            if swizzle.dest_component_enabled(comp) {
                slot[comp] = value[comp];
            }
        }
    }

    fn address_offset(&self, index: usize) -> i32 {
        if index == 0 {
            0
        } else {
            self.address_registers[index - 1]
        }
    }

    fn evaluate_condition(&self, instr: Instruction) -> bool {
        let result_x = instr.refx() == self.conditional_code[0];
        let result_y = instr.refy() == self.conditional_code[1];
        match instr.flow_op() {
            FlowOp::Or => result_x || result_y,
            FlowOp::And => result_x && result_y,
            FlowOp::JustX => result_x,
            FlowOp::JustY => result_y,
        }
    }

    /// Execute from the configured entry point until END.
    ///
    /// Malformed microcode (undefined opcodes, call stack overflow, a
    /// program counter escaping program memory) aborts: the program is
    /// produced by the integrating application, not by untrusted data,
    /// so this is a caller bug.
    pub fn run(&mut self) {
        let mut call_stack: SmallVec<[CallStackFrame; CALL_STACK_CAPACITY]> = SmallVec::new();
        let mut program_counter = self.setup.entry_point;

        self.conditional_code = [false, false];

        fn call(
            stack: &mut SmallVec<[CallStackFrame; CALL_STACK_CAPACITY]>,
            program_counter: &mut u32,
            offset: u32,
            num_instructions: u32,
            return_offset: u32,
            repeat_count: u8,
            loop_increment: u8,
        ) {
            // -1 so the increment at the end of the cycle lands on `offset`
            *program_counter = offset.wrapping_sub(1);
            if stack.len() >= CALL_STACK_CAPACITY {
                log::error!("VS: call stack overflow at pc 0x{:03x}", *program_counter);
                panic!("shader call stack overflow");
            }
            stack.push(CallStackFrame {
                final_address: offset + num_instructions,
                return_address: return_offset,
                repeat_counter: repeat_count,
                loop_increment,
                loop_address: offset,
            });
        }

        loop {
            if let Some(top) = call_stack.last_mut() {
                if program_counter == top.final_address {
                    self.address_registers[2] += top.loop_increment as i32;

                    if top.repeat_counter == 0 {
                        program_counter = top.return_address;
                        call_stack.pop();
                    } else {
                        top.repeat_counter -= 1;
                        program_counter = top.loop_address;
                    }
                    continue;
                }
            }

            let Some(&word) = self.setup.program_code.get(program_counter as usize) else {
                log::error!(
                    "VS: program counter 0x{:03x} outside program memory",
                    program_counter
                );
                panic!("shader program counter out of range");
            };
            let instr = Instruction(word);
            let Some(opcode) = instr.opcode() else {
                log::error!(
                    "VS: undefined instruction 0x{:08x} at pc 0x{:03x}",
                    word,
                    program_counter
                );
                panic!("undefined shader instruction");
            };

            match opcode.category() {
                OpCategory::Arithmetic => {
                    let inverted = opcode.is_inverted();
                    let swizzle = SwizzlePattern(self.setup.swizzle_data[instr.operand_desc_id()]);
                    let offset = self.address_offset(instr.address_register_index());

                    // The address register only indexes the wide operand,
                    // which is src2 for the inverted encodings.
                    let src1 = self.read_operand(
                        instr.src1(inverted),
                        if inverted { 0 } else { offset },
                        swizzle,
                        0,
                    );
                    let src2 = self.read_operand(
                        instr.src2(inverted),
                        if inverted { offset } else { 0 },
                        swizzle,
                        1,
                    );
                    let dest = instr.dest();

                    match opcode {
                        OpCode::Add => self.write_masked(dest, swizzle, src1 + src2),

                        OpCode::Mul => {
                            let mut out = Vec4::splat(Float24::zero());
                            for i in 0..4 {
                                out[i] = src1[i] * src2[i];
                            }
                            self.write_masked(dest, swizzle, out);
                        }

                        OpCode::Flr => {
                            let mut out = Vec4::splat(Float24::zero());
                            for i in 0..4 {
                                out[i] = Float24::from_f32(src1[i].to_f32().floor());
                            }
                            self.write_masked(dest, swizzle, out);
                        }

                        // Exact comparison form required to match NaN
                        // semantics to hardware:
                        //   max(0, NaN) -> NaN, max(NaN, 0) -> 0
                        OpCode::Max => {
                            let mut out = Vec4::splat(Float24::zero());
                            for i in 0..4 {
                                out[i] = if src1[i] > src2[i] { src1[i] } else { src2[i] };
                            }
                            self.write_masked(dest, swizzle, out);
                        }

                        OpCode::Min => {
                            let mut out = Vec4::splat(Float24::zero());
                            for i in 0..4 {
                                out[i] = if src1[i] < src2[i] { src1[i] } else { src2[i] };
                            }
                            self.write_masked(dest, swizzle, out);
                        }

                        OpCode::Dp3 | OpCode::Dp4 | OpCode::Dph | OpCode::Dphi => {
                            let mut src1 = src1;
                            if matches!(opcode, OpCode::Dph | OpCode::Dphi) {
                                src1.w = Float24::one();
                            }
                            let dot = if opcode == OpCode::Dp3 {
                                src1.xyz().dot(src2.xyz())
                            } else {
                                src1.dot(src2)
                            };
                            self.write_masked(dest, swizzle, Vec4::splat(dot));
                        }

                        OpCode::Rcp => {
                            let rcp = Float24::from_f32(1.0 / src1.x.to_f32());
                            self.write_masked(dest, swizzle, Vec4::splat(rcp));
                        }

                        OpCode::Rsq => {
                            let rsq = Float24::from_f32(1.0 / src1.x.to_f32().sqrt());
                            self.write_masked(dest, swizzle, Vec4::splat(rsq));
                        }

                        OpCode::Ex2 => {
                            let ex2 = Float24::from_f32(src1.x.to_f32().exp2());
                            self.write_masked(dest, swizzle, Vec4::splat(ex2));
                        }

                        OpCode::Lg2 => {
                            let lg2 = Float24::from_f32(src1.x.to_f32().log2());
                            self.write_masked(dest, swizzle, Vec4::splat(lg2));
                        }

                        OpCode::Mova => {
                            for i in 0..2 {
                                if swizzle.dest_component_enabled(i) {
                                    self.address_registers[i] = src1[i].to_f32() as i32;
                                }
                            }
                        }

                        OpCode::Mov => self.write_masked(dest, swizzle, src1),

                        OpCode::Sge | OpCode::Sgei => {
                            let mut out = Vec4::splat(Float24::zero());
                            for i in 0..4 {
                                out[i] = if src1[i] >= src2[i] {
                                    Float24::one()
                                } else {
                                    Float24::zero()
                                };
                            }
                            self.write_masked(dest, swizzle, out);
                        }

                        OpCode::Slt | OpCode::Slti => {
                            let mut out = Vec4::splat(Float24::zero());
                            for i in 0..4 {
                                out[i] = if src1[i] < src2[i] {
                                    Float24::one()
                                } else {
                                    Float24::zero()
                                };
                            }
                            self.write_masked(dest, swizzle, out);
                        }

                        OpCode::Cmp => {
                            let ops = [instr.compare_op_x(), instr.compare_op_y()];
                            for (i, op) in ops.into_iter().enumerate() {
                                let Some(op) = op else {
                                    log::error!("VS: unknown compare mode in 0x{:08x}", word);
                                    continue;
                                };
                                self.conditional_code[i] = match op {
                                    CompareOp::Equal => src1[i] == src2[i],
                                    CompareOp::NotEqual => src1[i] != src2[i],
                                    CompareOp::LessThan => src1[i] < src2[i],
                                    CompareOp::LessEqual => src1[i] <= src2[i],
                                    CompareOp::GreaterThan => src1[i] > src2[i],
                                    CompareOp::GreaterEqual => src1[i] >= src2[i],
                                };
                            }
                        }

                        _ => unreachable!(),
                    }
                }

                OpCategory::MultiplyAdd => {
                    let inverted = opcode.is_inverted();
                    let swizzle =
                        SwizzlePattern(self.setup.swizzle_data[instr.mad_operand_desc_id()]);
                    let offset = self.address_offset(instr.mad_address_register_index());

                    let src1 = self.read_operand(instr.mad_src1(), 0, swizzle, 0);
                    let src2 = self.read_operand(
                        instr.mad_src2(inverted),
                        if inverted { 0 } else { offset },
                        swizzle,
                        1,
                    );
                    let src3 = self.read_operand(
                        instr.mad_src3(inverted),
                        if inverted { offset } else { 0 },
                        swizzle,
                        2,
                    );

                    let mut out = Vec4::splat(Float24::zero());
                    for i in 0..4 {
                        out[i] = src1[i] * src2[i] + src3[i];
                    }
                    self.write_masked(instr.mad_dest(), swizzle, out);
                }

                OpCategory::FlowControl => match opcode {
                    OpCode::End => break,

                    OpCode::Nop => {}

                    OpCode::Jmpc => {
                        if self.evaluate_condition(instr) {
                            program_counter = instr.dest_offset().wrapping_sub(1);
                        }
                    }

                    OpCode::Jmpu => {
                        // Bit 0 of num_instructions inverts the condition
                        if self.uniforms.b[instr.bool_uniform_id()]
                            == ((instr.num_instructions() & 1) == 0)
                        {
                            program_counter = instr.dest_offset().wrapping_sub(1);
                        }
                    }

                    OpCode::Call => {
                        let return_address = program_counter + 1;
                        call(
                            &mut call_stack,
                            &mut program_counter,
                            instr.dest_offset(),
                            instr.num_instructions(),
                            return_address,
                            0,
                            0,
                        );
                    }

                    OpCode::Callu => {
                        if self.uniforms.b[instr.bool_uniform_id()] {
                            let return_address = program_counter + 1;
                            call(
                                &mut call_stack,
                                &mut program_counter,
                                instr.dest_offset(),
                                instr.num_instructions(),
                                return_address,
                                0,
                                0,
                            );
                        }
                    }

                    OpCode::Callc => {
                        if self.evaluate_condition(instr) {
                            let return_address = program_counter + 1;
                            call(
                                &mut call_stack,
                                &mut program_counter,
                                instr.dest_offset(),
                                instr.num_instructions(),
                                return_address,
                                0,
                                0,
                            );
                        }
                    }

                    OpCode::Ifu | OpCode::Ifc => {
                        let taken = if opcode == OpCode::Ifu {
                            self.uniforms.b[instr.bool_uniform_id()]
                        } else {
                            self.evaluate_condition(instr)
                        };
                        // Both branches rejoin after the else block.
                        let rejoin = instr.dest_offset() + instr.num_instructions();
                        if taken {
                            let if_offset = program_counter + 1;
                            let if_length = instr.dest_offset() - program_counter - 1;
                            call(
                                &mut call_stack,
                                &mut program_counter,
                                if_offset,
                                if_length,
                                rejoin,
                                0,
                                0,
                            );
                        } else {
                            call(
                                &mut call_stack,
                                &mut program_counter,
                                instr.dest_offset(),
                                instr.num_instructions(),
                                rejoin,
                                0,
                                0,
                            );
                        }
                    }

                    OpCode::Loop => {
                        // i[id] = (iteration count, aL init, aL step, -)
                        let param = self.uniforms.i[instr.int_uniform_id()];
                        self.address_registers[2] = param.y as i32;

                        let body_offset = program_counter + 1;
                        let body_length = instr.dest_offset() - program_counter;
                        call(
                            &mut call_stack,
                            &mut program_counter,
                            body_offset,
                            body_length,
                            instr.dest_offset() + 1,
                            param.x,
                            param.z,
                        );
                    }

                    _ => unreachable!(),
                },
            }

            program_counter = program_counter.wrapping_add(1);
        }
    }
}
