//! Record store capability surface and its implementations.
//!
//! The pipeline only talks to storage through [`RecordStore`] and
//! [`ChunkTransaction`]. [`MemoryStore`] is always available;
//! `PgStore` is compiled with the `postgres` feature.

mod interface;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use interface::*;
pub use memory::*;
#[cfg(feature = "postgres")]
pub use postgres::*;
