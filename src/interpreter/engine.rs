//! The recursive execution engine.
//!
//! Every block executes against the run's [`Context`] and returns a
//! [`Control`]: either fall through to the next sibling or unwind to the
//! nearest enclosing loop. A `Break` travels up through `execute_children`
//! and is consumed by the loop that owns the pass; everything above the loop
//! only ever sees `Continue`. Errors unwind the whole run immediately; the
//! innermost failing block stamps its id onto the error on the way out.

use std::thread;
use std::time::Duration;

use tracing::info;

use crate::error::{ErrorKind, ProgramError};
use crate::program::{BlockKind, BlockNode, CalcOp, CmpOp};
use crate::realtime::Event;

use super::context::Context;

/// Control-flow result of one block execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Proceed with the next sibling.
    Continue,
    /// Unwind to the nearest enclosing loop and stop it.
    Break,
}

/// Execute a whole program, top-level block by top-level block.
pub fn run(blocks: &[BlockNode], ctx: &mut Context) -> Result<(), ProgramError> {
    execute_children(blocks, ctx)?;
    Ok(())
}

/// Execute one block.
pub fn execute(node: &BlockNode, ctx: &mut Context) -> Result<Control, ProgramError> {
    execute_kind(node, ctx).map_err(|err| err.or_at_block(&node.id))
}

/// Execute a child list in order, stopping mid-pass as soon as a Break
/// surfaces.
fn execute_children(children: &[BlockNode], ctx: &mut Context) -> Result<Control, ProgramError> {
    for child in children {
        if execute(child, ctx)? == Control::Break {
            return Ok(Control::Break);
        }
    }
    Ok(Control::Continue)
}

fn execute_kind(node: &BlockNode, ctx: &mut Context) -> Result<Control, ProgramError> {
    match &node.kind {
        // Structural wrapper: nothing of its own, children pass through.
        BlockKind::Wrapper => execute_children(&node.children, ctx),

        BlockKind::Break => Ok(Control::Break),

        BlockKind::Repeat => {
            let count = ctx.int_value(&node.vars[0])?;
            for _ in 0..count {
                if execute_children(&node.children, ctx)? == Control::Break {
                    break;
                }
            }
            Ok(Control::Continue)
        }

        BlockKind::For => {
            let from = ctx.int_value(&node.vars[1])?;
            let to = ctx.int_value(&node.vars[2])?;
            let mut index = from;
            while index < to {
                ctx.set_int(&node.vars[0], index)?;
                if execute_children(&node.children, ctx)? == Control::Break {
                    break;
                }
                index += 1;
            }
            Ok(Control::Continue)
        }

        // Unbounded on purpose: a While whose break condition never fires
        // yields an unterminated run. Documented, not capped.
        BlockKind::While => {
            loop {
                if execute_children(&node.children, ctx)? == Control::Break {
                    break;
                }
            }
            Ok(Control::Continue)
        }

        BlockKind::If { op } => {
            if condition_holds(*op, node, ctx)? {
                execute_children(&node.children, ctx)
            } else {
                Ok(Control::Continue)
            }
        }

        BlockKind::IfElse { op, else_children } => {
            // Both branches are stored; only the taken one runs.
            if condition_holds(*op, node, ctx)? {
                execute_children(&node.children, ctx)
            } else {
                execute_children(else_children, ctx)
            }
        }

        BlockKind::Move { axis } => {
            let delta = ctx.int_value(&node.vars[0])?;
            ctx.robot().move_axis(*axis, delta)?;
            Ok(Control::Continue)
        }

        BlockKind::ResetPosition => {
            ctx.robot().home()?;
            Ok(Control::Continue)
        }

        BlockKind::MoveToPosition => {
            let Some(child) = node.children.first() else {
                return Err(ErrorKind::MissingDelta.into());
            };
            if !matches!(child.kind, BlockKind::Position) {
                return Err(ErrorKind::MissingDelta.into());
            }
            let x = ctx.int_value(&child.vars[0])?;
            let y = ctx.int_value(&child.vars[1])?;
            let z = ctx.int_value(&child.vars[2])?;
            ctx.robot().move_to(x, y, z)?;
            Ok(Control::Continue)
        }

        // Its three variables are read by the MoveToPosition parent; on its
        // own it is structural.
        BlockKind::Position => Ok(Control::Continue),

        BlockKind::Calculation { op } => {
            let current = ctx.int_value(&node.vars[0])?;
            let arg1 = ctx.int_value(&node.vars[1])?;
            let arg2 = ctx.int_value(&node.vars[2])?;
            let value = match op {
                Some(op) => apply_calc(*op, arg1, arg2)?,
                // No recognizable operator: the target keeps its value.
                None => current,
            };
            ctx.set_int(&node.vars[0], value)?;
            Ok(Control::Continue)
        }

        BlockKind::Timer { multiplier } => {
            let value = ctx.int_value(&node.vars[0])?;
            if value < 0 {
                return Err(ProgramError::internal(format!(
                    "cannot wait a negative duration ({value})"
                )));
            }
            let seconds = (value as u64).checked_mul(*multiplier).ok_or_else(|| {
                ProgramError::internal(format!("wait duration overflows ({value})"))
            })?;
            thread::sleep(Duration::from_secs(seconds));
            Ok(Control::Continue)
        }

        BlockKind::DebugPrint => {
            if !node.vars.is_empty() {
                let mut values = Vec::with_capacity(node.vars.len());
                for name in &node.vars {
                    values.push(ctx.text_value(name)?);
                }
                let line = format!("[DEBUG] {}", values.join(" | "));
                info!("{line}");
                ctx.emit(Event::Update { data: line });
            }
            Ok(Control::Continue)
        }

        BlockKind::Measurement => {
            let Some(collector) = ctx.collector() else {
                return Err(ErrorKind::NoDeviceConnected.into());
            };
            collector.run_one_collection()?;
            Ok(Control::Continue)
        }
    }
}

fn condition_holds(
    op: Option<CmpOp>,
    node: &BlockNode,
    ctx: &Context,
) -> Result<bool, ProgramError> {
    // Text without a recognizable operator compares false.
    let Some(op) = op else {
        return Ok(false);
    };
    let lhs = ctx.int_value(&node.vars[0])?;
    let rhs = ctx.int_value(&node.vars[1])?;
    Ok(op.eval(lhs, rhs))
}

fn apply_calc(op: CalcOp, arg1: i64, arg2: i64) -> Result<i64, ProgramError> {
    let overflow = || ProgramError::internal("arithmetic overflow");
    match op {
        CalcOp::Add => arg1.checked_add(arg2).ok_or_else(overflow),
        CalcOp::Sub => arg1.checked_sub(arg2).ok_or_else(overflow),
        CalcOp::Mul => arg1.checked_mul(arg2).ok_or_else(overflow),
        CalcOp::Div => {
            if arg2 == 0 {
                return Err(ProgramError::internal("division by zero"));
            }
            arg1.checked_div(arg2).ok_or_else(overflow)
        }
        CalcOp::Pow => {
            let exponent = u32::try_from(arg2)
                .map_err(|_| ProgramError::internal("exponent out of range"))?;
            arg1.checked_pow(exponent).ok_or_else(overflow)
        }
        CalcOp::Root => {
            // value2 ^ (1 / value1): the integer value1-th root of value2.
            if arg1 == 0 {
                return Err(ProgramError::internal("zeroth root is undefined"));
            }
            if arg2 < 0 {
                return Err(ProgramError::internal("root of a negative number"));
            }
            Ok((arg2 as f64).powf(1.0 / arg1 as f64) as i64)
        }
        CalcOp::Mod => {
            if arg2 == 0 {
                return Err(ProgramError::internal("modulo by zero"));
            }
            arg1.checked_rem(arg2).ok_or_else(overflow)
        }
        CalcOp::BitXor => Ok(arg1 ^ arg2),
        CalcOp::BitAnd => Ok(arg1 & arg2),
        CalcOp::BitOr => Ok(arg1 | arg2),
        // Only the second argument matters; the first is a formality of the
        // editor's three-variable calc shape.
        CalcOp::BitNot => Ok(!arg2),
        CalcOp::Shl | CalcOp::Shr => {
            if !(0..64).contains(&arg2) {
                return Err(ProgramError::internal(format!(
                    "shift count {arg2} out of range"
                )));
            }
            Ok(match op {
                CalcOp::Shl => arg1 << arg2,
                _ => arg1 >> arg2,
            })
        }
    }
}
