//! Typed block tree.
//!
//! One node per visual block. Instead of an inheritance chain there is a
//! single [`BlockNode`] carrying a closed [`BlockKind`] with the
//! subtype-specific fields (stored operators, time multiplier, the else
//! branch). Every kind declares how many variables it expects; the loader
//! rejects a node whose declared count differs.

use crate::error::{ErrorKind, ProgramError};
use crate::robot::Axis;

/// Relational operator of an If/IfElse block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl CmpOp {
    /// Find the operator in a block's free-text payload. Two-character
    /// tokens are tried first so `<=` never parses as `<`.
    pub fn parse(text: &str) -> Option<CmpOp> {
        const TOKENS: [(&str, CmpOp); 6] = [
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
        ];
        TOKENS
            .iter()
            .find(|(token, _)| text.contains(token))
            .map(|&(_, op)| op)
    }

    pub fn eval(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Gt => lhs > rhs,
        }
    }
}

/// Arithmetic operator of a Calculation block.
///
/// The canonical token set is the one the block editor serializes: `{` `}`
/// `[` stand in for `+` `-` `*` because those characters are reserved in
/// variable naming on the editor side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Root,
    Mod,
    BitXor,
    BitAnd,
    BitOr,
    BitNot,
    Shl,
    Shr,
}

impl CalcOp {
    /// Find the operator in the payload text. More specific tokens are tried
    /// first (`xor` before `or`, `<<` before `<`-free fallthrough).
    pub fn parse(text: &str) -> Option<CalcOp> {
        const TOKENS: [(&str, CalcOp); 13] = [
            ("{", CalcOp::Add),
            ("}", CalcOp::Sub),
            ("[", CalcOp::Mul),
            ("/", CalcOp::Div),
            ("pow", CalcOp::Pow),
            ("sqrt", CalcOp::Root),
            ("mod", CalcOp::Mod),
            ("xor", CalcOp::BitXor),
            ("and", CalcOp::BitAnd),
            ("or", CalcOp::BitOr),
            ("not", CalcOp::BitNot),
            ("<<", CalcOp::Shl),
            (">>", CalcOp::Shr),
        ];
        TOKENS
            .iter()
            .find(|(token, _)| text.contains(token))
            .map(|&(_, op)| op)
    }
}

/// The closed set of block kinds, with their subtype-specific fields.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    /// Structural/event wrapper with no behavior of its own.
    Wrapper,
    Break,
    Repeat,
    /// `[from, to)` loop; variables are loop var, from, to.
    For,
    While,
    If {
        op: Option<CmpOp>,
    },
    IfElse {
        op: Option<CmpOp>,
        else_children: Vec<BlockNode>,
    },
    Move {
        axis: Axis,
    },
    ResetPosition,
    MoveToPosition,
    Position,
    Calculation {
        op: Option<CalcOp>,
    },
    Timer {
        multiplier: u64,
    },
    DebugPrint,
    Measurement,
}

impl BlockKind {
    /// Exact declared-variable count this kind expects; `None` means any
    /// count is accepted (DebugPrint formats whatever it is given).
    pub fn expected_vars(&self) -> Option<usize> {
        match self {
            BlockKind::Wrapper => Some(0),
            BlockKind::Break => Some(0),
            BlockKind::Repeat => Some(1),
            BlockKind::For => Some(3),
            BlockKind::While => Some(0),
            BlockKind::If { .. } => Some(2),
            BlockKind::IfElse { .. } => Some(2),
            BlockKind::Move { .. } => Some(1),
            BlockKind::ResetPosition => Some(0),
            // The editor serializes the position variables onto this block
            // as well; they are accepted and discarded.
            BlockKind::MoveToPosition => Some(3),
            BlockKind::Position => Some(3),
            BlockKind::Calculation { .. } => Some(3),
            BlockKind::Timer { .. } => Some(1),
            BlockKind::DebugPrint => None,
            BlockKind::Measurement => Some(0),
        }
    }
}

/// One node of the parsed program tree; the unit of execution.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub id: String,
    pub text: String,
    pub vars: Vec<String>,
    pub children: Vec<BlockNode>,
    pub kind: BlockKind,
}

impl BlockNode {
    /// Construct a node, validating the declared-variable count.
    pub fn new(
        id: String,
        text: String,
        vars: Vec<String>,
        children: Vec<BlockNode>,
        kind: BlockKind,
    ) -> Result<Self, ProgramError> {
        if let Some(expected) = kind.expected_vars() {
            if vars.len() != expected {
                return Err(ErrorKind::ExpectedVariableCount {
                    expected,
                    found: vars.len(),
                }
                .at_block(&id));
            }
        }
        Ok(BlockNode {
            id,
            text,
            vars,
            children,
            kind,
        })
    }
}
