// library catalog: authors, books and the web pages to manage them

pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod web;

#[cfg(test)]
mod testing;

pub use catalog::Catalog;
pub use error::{CatalogError, CatalogResult};
