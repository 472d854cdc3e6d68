use std::{fmt, str::FromStr};

use phf::phf_map;

use crate::{analyzer::Address, lexer::TokenKind};

use super::Label;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    Loadi,
    Load,
    Sto,
    Pop,

    Add,
    Sub,
    Mult,
    Div,

    Gt,
    Ge,
    Les,
    Le,
    Eq,
    NotEq,
    And,
    Or,

    Br,
    Brf,
    In,
    Out,
    Allocate,
    Jsr,
    Ret,
    Stop,
}

/// Binary operator text to the opcode that computes it.
pub static OPERATOR_OPCODES: phf::Map<&'static str, Opcode> = phf_map! {
    ">" => Opcode::Gt,
    ">=" => Opcode::Ge,
    "<" => Opcode::Les,
    "<=" => Opcode::Le,
    "==" => Opcode::Eq,
    "!=" => Opcode::NotEq,
    "||" => Opcode::Or,
    "&&" => Opcode::And,
    "+" => Opcode::Add,
    "-" => Opcode::Sub,
    "*" => Opcode::Mult,
    "/" => Opcode::Div,
};

static MNEMONICS: phf::Map<&'static str, Opcode> = phf_map! {
    "LOADI" => Opcode::Loadi,
    "LOAD" => Opcode::Load,
    "STO" => Opcode::Sto,
    "POP" => Opcode::Pop,
    "ADD" => Opcode::Add,
    "SUB" => Opcode::Sub,
    "MULT" => Opcode::Mult,
    "DIV" => Opcode::Div,
    "GT" => Opcode::Gt,
    "GE" => Opcode::Ge,
    "LES" => Opcode::Les,
    "LE" => Opcode::Le,
    "EQ" => Opcode::Eq,
    "NOTEQ" => Opcode::NotEq,
    "AND" => Opcode::And,
    "OR" => Opcode::Or,
    "BR" => Opcode::Br,
    "BRF" => Opcode::Brf,
    "IN" => Opcode::In,
    "OUT" => Opcode::Out,
    "ALLOCATE" => Opcode::Allocate,
    "JSR" => Opcode::Jsr,
    "RET" => Opcode::Ret,
    "STOP" => Opcode::Stop,
};

/// The kind of operand an opcode carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    None,
    Value,
    Address,
    Label,
}

impl Opcode {
    pub fn for_operator(kind: TokenKind) -> Option<Opcode> {
        OPERATOR_OPCODES.get(kind.as_str()).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Opcode::Loadi => "LOADI",
            Opcode::Load => "LOAD",
            Opcode::Sto => "STO",
            Opcode::Pop => "POP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mult => "MULT",
            Opcode::Div => "DIV",
            Opcode::Gt => "GT",
            Opcode::Ge => "GE",
            Opcode::Les => "LES",
            Opcode::Le => "LE",
            Opcode::Eq => "EQ",
            Opcode::NotEq => "NOTEQ",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Br => "BR",
            Opcode::Brf => "BRF",
            Opcode::In => "IN",
            Opcode::Out => "OUT",
            Opcode::Allocate => "ALLOCATE",
            Opcode::Jsr => "JSR",
            Opcode::Ret => "RET",
            Opcode::Stop => "STOP",
        }
    }

    pub fn operand_kind(&self) -> OperandKind {
        match self {
            Opcode::Loadi | Opcode::Allocate => OperandKind::Value,
            Opcode::Load | Opcode::Sto | Opcode::Ret => OperandKind::Address,
            Opcode::Br | Opcode::Brf | Opcode::Jsr => OperandKind::Label,
            _ => OperandKind::None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Value(i64),
    Address(Address),
    Label(Label),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Address(a) => write!(f, "{a}"),
            Operand::Label(l) => write!(f, "{l}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Option<Operand>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    pub fn loadi(value: i64) -> Self {
        Self::with(Opcode::Loadi, Operand::Value(value))
    }

    pub fn load(address: Address) -> Self {
        Self::with(Opcode::Load, Operand::Address(address))
    }

    pub fn sto(address: Address) -> Self {
        Self::with(Opcode::Sto, Operand::Address(address))
    }

    pub fn ret(address: Address) -> Self {
        Self::with(Opcode::Ret, Operand::Address(address))
    }

    pub fn allocate(size: usize) -> Self {
        Self::with(Opcode::Allocate, Operand::Value(size as i64))
    }

    pub fn jump(opcode: Opcode, label: Label) -> Self {
        Self::with(opcode, Operand::Label(label))
    }

    fn with(opcode: Opcode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(operand) => write!(f, "{} {operand}", self.opcode),
            None => write!(f, "{}", self.opcode),
        }
    }
}

/// One line of a program listing: a label definition or an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    Label(Label),
    Instr(Instruction),
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Label(l) => write!(f, "{l}:"),
            Line::Instr(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub lines: Vec<Line>,
}

impl Program {
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.lines.iter().filter_map(|l| match l {
            Line::Instr(i) => Some(i),
            Line::Label(_) => None,
        })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("listing line {line}: {kind}")]
pub struct ListingError {
    pub line: usize,
    pub kind: ListingErrorKind,
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ListingErrorKind {
    #[error("unknown opcode {0:?}")]
    UnknownOpcode(String),
    #[error("malformed label {0:?}")]
    BadLabel(String),
    #[error("malformed operand {0:?}")]
    BadOperand(String),
    #[error("{0} expects an operand")]
    MissingOperand(Opcode),
    #[error("{0} takes no operand")]
    UnexpectedOperand(Opcode),
}

fn parse_label(s: &str) -> Option<Label> {
    s.strip_prefix("LABEL")?.parse().ok().map(Label)
}

fn parse_operand(kind: OperandKind, s: &str) -> Option<Operand> {
    match kind {
        OperandKind::Value => s.parse().ok().map(Operand::Value),
        OperandKind::Address => {
            let address = match s.strip_prefix(':') {
                Some(rel) => Address::Relative(rel.parse().ok()?),
                None => Address::Absolute(s.parse().ok()?),
            };
            Some(Operand::Address(address))
        }
        OperandKind::Label => parse_label(s).map(Operand::Label),
        OperandKind::None => None,
    }
}

fn parse_line(text: &str) -> Result<Line, ListingErrorKind> {
    if let Some(label) = text.strip_suffix(':') {
        return parse_label(label)
            .map(Line::Label)
            .ok_or_else(|| ListingErrorKind::BadLabel(label.to_string()));
    }

    let mut words = text.split_whitespace();
    let mnemonic = words.next().unwrap_or_default();
    let opcode = *MNEMONICS
        .get(mnemonic)
        .ok_or_else(|| ListingErrorKind::UnknownOpcode(mnemonic.to_string()))?;

    let operand = match (opcode.operand_kind(), words.next()) {
        (OperandKind::None, None) => None,
        (OperandKind::None, Some(_)) => return Err(ListingErrorKind::UnexpectedOperand(opcode)),
        (_, None) => return Err(ListingErrorKind::MissingOperand(opcode)),
        (kind, Some(word)) => Some(
            parse_operand(kind, word)
                .ok_or_else(|| ListingErrorKind::BadOperand(word.to_string()))?,
        ),
    };
    if let Some(extra) = words.next() {
        return Err(ListingErrorKind::BadOperand(extra.to_string()));
    }

    Ok(Line::Instr(Instruction { opcode, operand }))
}

impl FromStr for Program {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = vec![];
        for (i, text) in s.lines().enumerate() {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let line = parse_line(text).map_err(|kind| ListingError { line: i + 1, kind })?;
            lines.push(line);
        }
        Ok(Program { lines })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn operator_table() {
        assert_eq!(Opcode::for_operator(TokenKind::LessThan), Some(Opcode::Les));
        assert_eq!(Opcode::for_operator(TokenKind::NotEqual), Some(Opcode::NotEq));
        assert_eq!(Opcode::for_operator(TokenKind::DoublePipe), Some(Opcode::Or));
        assert_eq!(Opcode::for_operator(TokenKind::Slash), Some(Opcode::Div));
        assert_eq!(Opcode::for_operator(TokenKind::Equal), None);
    }

    #[test]
    fn listing_text() {
        let program = Program {
            lines: vec![
                Line::Instr(Instruction::jump(Opcode::Br, Label(1))),
                Line::Label(Label(1)),
                Line::Instr(Instruction::allocate(2)),
                Line::Instr(Instruction::loadi(-4)),
                Line::Instr(Instruction::sto(Address::Relative(1))),
                Line::Instr(Instruction::load(Address::Absolute(0))),
                Line::Instr(Instruction::new(Opcode::NotEq)),
                Line::Instr(Instruction::new(Opcode::Stop)),
            ],
        };
        let text = "BR LABEL1\nLABEL1:\nALLOCATE 2\nLOADI -4\nSTO :1\nLOAD 0\nNOTEQ\nSTOP\n";
        assert_eq!(program.to_string(), text);
        assert_eq!(text.parse::<Program>(), Ok(program));
    }

    #[test]
    fn malformed_listings() {
        assert_matches!(
            "LOADI 1\nPUSH 2".parse::<Program>(),
            Err(ListingError {
                line: 2,
                kind: ListingErrorKind::UnknownOpcode(_)
            })
        );
        assert_matches!(
            "LOAD".parse::<Program>(),
            Err(ListingError {
                kind: ListingErrorKind::MissingOperand(Opcode::Load),
                ..
            })
        );
        assert_matches!(
            "POP 1".parse::<Program>(),
            Err(ListingError {
                kind: ListingErrorKind::UnexpectedOperand(Opcode::Pop),
                ..
            })
        );
        assert_matches!(
            "BR 3".parse::<Program>(),
            Err(ListingError {
                kind: ListingErrorKind::BadOperand(_),
                ..
            })
        );
        assert_matches!(
            "LABELx:".parse::<Program>(),
            Err(ListingError {
                kind: ListingErrorKind::BadLabel(_),
                ..
            })
        );
    }
}
