pub mod handlers;
pub mod models;
pub mod store;

pub use handlers::*;
pub use models::*;
pub use store::*;
