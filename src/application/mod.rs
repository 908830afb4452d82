//! Application services: content reads, view assembly, mutations and their hooks.

pub mod chrome;
pub mod content;
pub mod error;
pub mod forms;
pub mod integrations;
pub mod mutations;
pub mod newsletter;
pub mod page;
pub mod repos;
pub mod resolver;
pub mod revalidation;
pub mod seo;
pub mod sitemap;
pub mod stars;
pub mod static_params;
