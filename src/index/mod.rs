pub mod models;
pub mod store;

pub use models::*;
pub use store::IndexStore;
