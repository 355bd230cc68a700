pub mod analytics;
pub mod product;
pub mod sale;
