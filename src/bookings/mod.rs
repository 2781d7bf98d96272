pub mod aggregate;
pub mod code_generator;
pub mod error;
pub mod handlers;
pub mod models;
pub mod price_calculator;
pub mod query;
pub mod repository;
pub mod service;
pub mod status_machine;

pub use aggregate::*;
pub use code_generator::*;
pub use error::*;
pub use handlers::*;
pub use models::*;
pub use price_calculator::*;
pub use query::*;
pub use repository::*;
pub use service::*;
pub use status_machine::*;
