//! Loader: serialized program document -> typed block tree.
//!
//! The document is an ordered list of block records coming from the visual
//! editor. The loader dispatches each record to a concrete [`BlockKind`] from
//! its type tag plus structural hints on the id/text, in a fixed priority
//! order so ambiguous tags resolve deterministically, and collects every
//! declared variable into one program-wide list for the run context.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{ErrorKind, ProgramError};
use crate::interpreter::Variable;
use crate::robot::Axis;

use super::block::{BlockKind, BlockNode, CalcOp, CmpOp};

/// One declared variable record as serialized by the editor.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVariable {
    /// Variable name.
    pub text: String,
    /// Initial value; the editor emits strings or numbers.
    #[serde(default)]
    pub value: JsonValue,
}

impl RawVariable {
    fn raw_value(&self) -> String {
        match &self.value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// One block record as serialized by the editor.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub variables: Vec<RawVariable>,
    #[serde(default)]
    pub children: Vec<RawBlock>,
    /// Secondary branch of an if-else block; absent everywhere else.
    #[serde(default)]
    pub else_children: Vec<RawBlock>,
}

/// Parses a serialized program into typed blocks plus the flat collection of
/// every declared variable.
#[derive(Debug)]
pub struct Loader {
    blocks: Vec<BlockNode>,
    variables: Vec<Variable>,
}

impl Loader {
    /// Load from a JSON document string. A malformed program never partially
    /// loads: the first invalid record aborts the whole call.
    pub fn from_str(document: &str) -> Result<Self, ProgramError> {
        let raw_blocks: Vec<RawBlock> =
            serde_json::from_str(document).map_err(|err| ErrorKind::MalformedProgram {
                message: err.to_string(),
            })?;
        Self::from_raw(raw_blocks)
    }

    /// Load from an already-deserialized JSON value.
    pub fn from_value(document: JsonValue) -> Result<Self, ProgramError> {
        let raw_blocks: Vec<RawBlock> =
            serde_json::from_value(document).map_err(|err| ErrorKind::MalformedProgram {
                message: err.to_string(),
            })?;
        Self::from_raw(raw_blocks)
    }

    fn from_raw(raw_blocks: Vec<RawBlock>) -> Result<Self, ProgramError> {
        let mut loader = Loader {
            blocks: Vec::new(),
            variables: Vec::new(),
        };
        for raw in raw_blocks {
            let block = loader.factory(raw)?;
            loader.blocks.push(block);
        }
        debug!(
            blocks = loader.blocks.len(),
            variables = loader.variables.len(),
            "program loaded"
        );
        Ok(loader)
    }

    pub fn blocks(&self) -> &[BlockNode] {
        &self.blocks
    }

    /// Declared variables in traversal order (children before the declaring
    /// node itself), duplicates included. The context collapses them.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn into_parts(self) -> (Vec<BlockNode>, Vec<Variable>) {
        (self.blocks, self.variables)
    }

    fn factory(&mut self, raw: RawBlock) -> Result<BlockNode, ProgramError> {
        // Children first, so their declared variables land in the program
        // list before the parent's own.
        let mut children = Vec::with_capacity(raw.children.len());
        for child in raw.children {
            children.push(self.factory(child)?);
        }
        let mut else_children = Vec::with_capacity(raw.else_children.len());
        for child in raw.else_children {
            else_children.push(self.factory(child)?);
        }

        let mut var_names = Vec::with_capacity(raw.variables.len());
        for var in &raw.variables {
            var_names.push(var.text.clone());
            self.variables
                .push(Variable::new(var.text.clone(), var.raw_value()));
        }

        let kind = Self::dispatch(&raw.id, &raw.block_type, &raw.text, else_children);
        BlockNode::new(raw.id, raw.text, var_names, children, kind)
    }

    /// Type tag + structural hints, in fixed priority order.
    fn dispatch(id: &str, block_type: &str, text: &str, else_children: Vec<BlockNode>) -> BlockKind {
        if block_type == "block-event" && id.contains("break") {
            return BlockKind::Break;
        }
        if block_type == "block-controll" {
            if text.contains("repeat") {
                return BlockKind::Repeat;
            }
            if text.contains("for") {
                return BlockKind::For;
            }
            if text.contains("while") {
                return BlockKind::While;
            }
            // "else" before "if" so an if-else tag resolves deterministically.
            if text.contains("else") {
                return BlockKind::IfElse {
                    op: CmpOp::parse(text),
                    else_children,
                };
            }
            if text.contains("if") {
                return BlockKind::If {
                    op: CmpOp::parse(text),
                };
            }
        }
        if block_type.starts_with("block-move") {
            if id.contains("steps-x") {
                return BlockKind::Move { axis: Axis::X };
            }
            if id.contains("steps-y") {
                return BlockKind::Move { axis: Axis::Y };
            }
            if id.contains("steps-z") {
                return BlockKind::Move { axis: Axis::Z };
            }
            if id.contains("reset") {
                return BlockKind::ResetPosition;
            }
            if id.contains("to-pos") {
                return BlockKind::MoveToPosition;
            }
        }
        if block_type == "block-pos" {
            return BlockKind::Position;
        }
        if block_type == "block-calc" {
            return BlockKind::Calculation {
                op: CalcOp::parse(text),
            };
        }
        if block_type == "block-time" {
            if id.contains("seconds") {
                return BlockKind::Timer { multiplier: 1 };
            }
            if id.contains("minutes") {
                return BlockKind::Timer { multiplier: 60 };
            }
        }
        if block_type == "block-debug" && id.contains("print") {
            return BlockKind::DebugPrint;
        }
        if block_type == "block-measure" {
            return BlockKind::Measurement;
        }

        // Purely structural/event wrapper.
        BlockKind::Wrapper
    }
}
