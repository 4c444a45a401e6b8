//! LambdaMOO database values and text-format I/O
//!
//! The value model (integers, object ids, errors, floats, shared strings and
//! copy-on-write lists), the growable byte buffer everything is assembled in,
//! and the line-oriented reader and writer for database files.

pub mod dbio;
pub mod heap;
pub mod intern;
pub mod numbers;
pub mod options;
pub mod stream;
pub mod var;


// Re-export main public APIs
pub use dbio::{DbError, DbReader, DbVersion, DbWriter, DbioFailed};
pub use heap::{List, Str};
pub use stream::{Stream, StreamTooBig};
pub use var::{Error, Var, VarType};
