pub mod cache;
pub mod pipeline;
pub mod record;
pub mod store;

pub use cache::*;
pub use pipeline::*;
pub use record::*;
pub use store::*;
