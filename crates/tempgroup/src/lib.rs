#![doc = include_str!("../README.md")]

mod error;
mod generator;
mod grouper;
mod job;
mod pool;
mod reader;
mod record;
pub mod seed;
mod store;
mod writer;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::grouper::*;
pub use crate::job::*;
pub use crate::pool::*;
pub use crate::reader::*;
pub use crate::record::*;
pub use crate::store::*;
pub use crate::writer::*;
