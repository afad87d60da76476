//! Bounded worker pool for the process phase of a chunk.
//!
//! A chunk is split into at most one contiguous slice per worker. Each slice
//! is sent to a worker over its own bounded channel and the worker stamps it
//! through the shared [`Grouper`](crate::Grouper), answering on a oneshot
//! channel. Slices are reassembled in their original order.

mod manager;
mod request;
mod worker;

pub use manager::*;
pub(crate) use request::*;
pub(crate) use worker::*;
