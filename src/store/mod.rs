//! Entry storage: the slab of reusable slots behind every cache instance.

pub mod slab;

pub use slab::{Entry, Slab, SlotId};
