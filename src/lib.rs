//! Newsdesk: a blog and news server backed by a headless CMS.
//!
//! Content is read through the CMS GraphQL endpoint, comments are read from
//! the delivery API and written through the management API.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
