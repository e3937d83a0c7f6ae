//! Byte-exact Chronicler V2 (`.hyd`) file format (`spec.md` §3.4).

pub mod block;
pub mod entry;
pub mod footer;
pub mod header;

pub use block::Block;
pub use entry::{Entry, Operation};
pub use footer::{FooterLocation, IndexFooter, Trailer};
pub use header::Header;
