mod data_api;
mod repository;

pub use data_api::{DataApiConfig, DataApiStore};
pub use repository::DocumentStore;

#[cfg(test)]
pub use repository::MockDocumentStore;
