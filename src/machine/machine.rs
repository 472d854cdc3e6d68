use std::{
    collections::HashMap,
    io::{BufRead, Write},
};

use log::{debug, trace};

use crate::{
    analyzer::Address,
    codegen::{Instruction, Label, Line, Opcode, Operand, Program},
};

use super::{RuntimeError, RuntimeErrorKind};

type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MachineConfig {
    /// Number of slots in the static data region.
    pub data_capacity: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            data_capacity: 1000,
        }
    }
}

/// One active call. `depth` is the operand stack depth right after the
/// record was allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationRecord {
    pub base: usize,
    pub size: usize,
    pub depth: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Running,
    Halted,
}

/// A stack machine with a fixed-size static data region.
#[derive(Debug)]
pub struct Machine {
    code: Vec<Instruction>,
    labels: HashMap<Label, usize>,
    stack: Vec<i64>,
    data: Vec<i64>,
    records: Vec<ActivationRecord>,
    returns: Vec<usize>,
    pc: usize,
}

impl Machine {
    /// Resolves every label definition to the index of the instruction that
    /// follows it, and checks that every jump has a target.
    pub fn load(program: &Program, config: MachineConfig) -> Result<Self> {
        let mut code = vec![];
        let mut labels = HashMap::new();
        for line in &program.lines {
            match line {
                Line::Label(label) => {
                    if labels.insert(*label, code.len()).is_some() {
                        return Err(RuntimeError {
                            pc: code.len(),
                            kind: RuntimeErrorKind::DuplicateLabel(*label),
                        });
                    }
                }
                Line::Instr(instruction) => code.push(*instruction),
            }
        }

        for (pc, instruction) in code.iter().enumerate() {
            if let Some(Operand::Label(label)) = instruction.operand {
                if !labels.contains_key(&label) {
                    return Err(RuntimeError {
                        pc,
                        kind: RuntimeErrorKind::UndefinedLabel(label),
                    });
                }
            }
        }
        debug!(
            "loaded {} instructions and {} labels",
            code.len(),
            labels.len()
        );

        Ok(Self {
            code,
            labels,
            stack: vec![],
            data: vec![0; config.data_capacity],
            records: vec![],
            returns: vec![],
            pc: 0,
        })
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn records(&self) -> &[ActivationRecord] {
        &self.records
    }

    pub fn run(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
        while self.step(input, output)? == Step::Running {}
        output
            .flush()
            .map_err(|e| self.error(RuntimeErrorKind::Io(e)))
    }

    fn error(&self, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError { pc: self.pc, kind }
    }

    fn push(&mut self, value: i64) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<i64> {
        self.stack
            .pop()
            .ok_or_else(|| self.error(RuntimeErrorKind::StackUnderflow))
    }

    fn top(&self) -> Result<i64> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| self.error(RuntimeErrorKind::StackUnderflow))
    }

    /// Turns an address into a data index. Relative addresses are offsets
    /// from the base of the innermost activation record.
    fn resolve(&self, address: Address) -> Result<usize> {
        let index = match address {
            Address::Absolute(a) => a,
            Address::Relative(a) => {
                let record = self
                    .records
                    .last()
                    .ok_or_else(|| self.error(RuntimeErrorKind::NoActivationRecord))?;
                record.base.checked_add(a).unwrap_or(usize::MAX)
            }
        };
        if index >= self.data.len() {
            return Err(self.error(RuntimeErrorKind::AddressOverflow {
                address: index,
                capacity: self.data.len(),
            }));
        }
        Ok(index)
    }

    fn jump(&mut self, label: Label) -> Result<()> {
        self.pc = *self
            .labels
            .get(&label)
            .ok_or_else(|| self.error(RuntimeErrorKind::UndefinedLabel(label)))?;
        Ok(())
    }

    fn binary(&mut self, f: impl FnOnce(i64, i64) -> i64) -> Result<()> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        self.push(f(lhs, rhs));
        Ok(())
    }

    fn allocate(&mut self, size: usize) -> Result<()> {
        let base = self.records.last().map_or(0, |r| r.base + r.size);
        let end = base.checked_add(size).unwrap_or(usize::MAX);
        if end > self.data.len() {
            return Err(self.error(RuntimeErrorKind::AddressOverflow {
                address: end - 1,
                capacity: self.data.len(),
            }));
        }
        // The outermost record overlays the globals, which are already
        // initialized. Every other record starts zeroed.
        if !self.records.is_empty() {
            self.data[base..end].fill(0);
        }
        self.records.push(ActivationRecord {
            base,
            size,
            depth: self.stack.len(),
        });
        Ok(())
    }

    fn read(&self, input: &mut impl BufRead) -> Result<i64> {
        let mut line = String::new();
        let n = input
            .read_line(&mut line)
            .map_err(|e| self.error(RuntimeErrorKind::Io(e)))?;
        if n == 0 {
            return Err(self.error(RuntimeErrorKind::InvalidInput(String::new())));
        }
        let text = line.trim();
        text.parse()
            .map_err(|_| self.error(RuntimeErrorKind::InvalidInput(text.to_string())))
    }

    /// Executes one instruction. Errors leave `pc` at the faulting
    /// instruction.
    pub fn step(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<Step> {
        let Some(&instruction) = self.code.get(self.pc) else {
            return Err(self.error(RuntimeErrorKind::RanOffEnd));
        };
        trace!("{:>4}: {instruction} {:?}", self.pc, self.stack);

        let pc = self.pc;
        let invalid = move || RuntimeError {
            pc,
            kind: RuntimeErrorKind::InvalidOperand(instruction.opcode),
        };
        let value = move || match instruction.operand {
            Some(Operand::Value(v)) => Ok(v),
            _ => Err(invalid()),
        };
        let address = move || match instruction.operand {
            Some(Operand::Address(a)) => Ok(a),
            _ => Err(invalid()),
        };
        let label = move || match instruction.operand {
            Some(Operand::Label(l)) => Ok(l),
            _ => Err(invalid()),
        };

        let mut next = self.pc + 1;
        match instruction.opcode {
            Opcode::Loadi => self.push(value()?),
            Opcode::Load => {
                let index = self.resolve(address()?)?;
                self.push(self.data[index]);
            }
            Opcode::Sto => {
                let index = self.resolve(address()?)?;
                self.data[index] = self.top()?;
            }
            Opcode::Pop => {
                self.pop()?;
            }

            Opcode::Add => self.binary(i64::wrapping_add)?,
            Opcode::Sub => self.binary(i64::wrapping_sub)?,
            Opcode::Mult => self.binary(i64::wrapping_mul)?,
            Opcode::Div => {
                if self.top()? == 0 {
                    return Err(self.error(RuntimeErrorKind::DivisionByZero));
                }
                self.binary(i64::wrapping_div)?
            }

            Opcode::Gt => self.binary(|a, b| (a > b) as i64)?,
            Opcode::Ge => self.binary(|a, b| (a >= b) as i64)?,
            Opcode::Les => self.binary(|a, b| (a < b) as i64)?,
            Opcode::Le => self.binary(|a, b| (a <= b) as i64)?,
            Opcode::Eq => self.binary(|a, b| (a == b) as i64)?,
            Opcode::NotEq => self.binary(|a, b| (a != b) as i64)?,
            Opcode::And => self.binary(|a, b| (a != 0 && b != 0) as i64)?,
            Opcode::Or => self.binary(|a, b| (a != 0 || b != 0) as i64)?,

            Opcode::Br => {
                self.jump(label()?)?;
                next = self.pc;
            }
            Opcode::Brf => {
                let target = label()?;
                if self.pop()? == 0 {
                    self.jump(target)?;
                    next = self.pc;
                }
            }

            Opcode::In => {
                let v = self.read(input)?;
                self.push(v);
            }
            Opcode::Out => {
                let v = self.pop()?;
                writeln!(output, "{v}").map_err(|e| self.error(RuntimeErrorKind::Io(e)))?;
            }

            Opcode::Allocate => {
                let size = usize::try_from(value()?).map_err(|_| invalid())?;
                self.allocate(size)?;
            }
            Opcode::Jsr => {
                self.returns.push(next);
                self.jump(label()?)?;
                next = self.pc;
            }
            Opcode::Ret => {
                let index = self.resolve(address()?)?;
                let v = self.data[index];
                if self.records.pop().is_none() {
                    return Err(self.error(RuntimeErrorKind::NoActivationRecord));
                }
                next = self
                    .returns
                    .pop()
                    .ok_or_else(|| self.error(RuntimeErrorKind::NoReturnAddress))?;
                self.push(v);
            }
            Opcode::Stop => {
                debug!("halted at instruction {}", self.pc);
                return Ok(Step::Halted);
            }
        }

        self.pc = next;
        Ok(Step::Running)
    }
}
