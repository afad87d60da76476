mod atomic;
mod interface;
mod temp_id;

pub use atomic::*;
pub use interface::*;
pub use temp_id::*;

#[cfg(test)]
mod tests;
