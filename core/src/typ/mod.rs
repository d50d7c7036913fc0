mod coerce;


pub use coerce::{CoerceError, coerce};
