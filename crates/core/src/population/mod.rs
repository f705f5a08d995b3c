// Individual records, the population snapshot and its loaders.

mod individual;
mod io;
mod store;

pub use individual::Individual;
pub use store::Population;
