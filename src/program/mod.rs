//! The serialized program document and the typed block tree built from it.

pub mod block;
pub mod loader;

pub use block::{BlockKind, BlockNode, CalcOp, CmpOp};
pub use loader::{Loader, RawBlock, RawVariable};
