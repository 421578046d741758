pub mod catalog_service;
pub mod pay_service;
pub mod user_service;
