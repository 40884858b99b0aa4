pub mod descriptor;
pub mod pipeline;
pub mod query;
pub mod table;

pub use descriptor::*;
pub use pipeline::*;
pub use query::*;
pub use table::*;
