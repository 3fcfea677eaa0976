//! Expression-based slice queries
//!
//! A query is parsed into an [`Expr`], compiled into a [`Cursor`] tree over
//! the live index, then driven by [`slice`] or [`hot`].

mod compiler;
mod cursor;
mod exec;
mod expr;

pub use compiler::compile;
pub use cursor::Cursor;
pub use exec::{hot, slice, SliceOptions, SliceResponse};
pub use expr::Expr;
