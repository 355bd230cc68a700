pub mod analytics_service;
pub mod product_service;
pub mod sale_service;
