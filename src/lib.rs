mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    #[cfg(any(test, feature = "test-support"))]
    pub mod memory;
    pub mod pagination;
    pub mod repository;
    pub mod schema;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
}
mod services {
    pub mod catalog;
    pub mod follows;
    pub mod interactions;
    pub mod recipes;
    pub mod shopping_list;
    pub mod users;

    #[cfg(test)]
    pub mod fixtures;
}
mod config;
mod constants;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use services::*;
