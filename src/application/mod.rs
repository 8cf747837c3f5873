pub mod catalog;
pub mod contact;
pub mod contributions;
pub mod error;
pub mod related;
pub mod render;
pub mod sitemap;
pub mod syndication;
pub mod view_counts;
