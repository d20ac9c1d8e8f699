//! Application services over the CMS adapters.

pub mod adjacency;
pub mod comments;
pub mod content;
pub mod error;
pub mod pagination;
pub mod repos;
pub mod site;
pub mod sitemap;

#[cfg(test)]
pub mod testing;
