pub mod chat_service;
pub mod engagement_service;
pub mod error;
pub mod identity;
pub mod listing_service;
pub mod product_service;
pub mod profile_service;
pub mod rating_service;
pub mod storage;
