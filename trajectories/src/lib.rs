pub mod table;
pub use table::*;

pub mod location;
pub use location::*;

pub mod trajectory;
pub use trajectory::*;

pub mod dataset;
pub use dataset::*;

#[inline]
pub(crate) fn default<T: Default>() -> T {
    T::default()
}

pub type Id = u64;
pub type Timestamp = i64;
pub type Meter = f64;
