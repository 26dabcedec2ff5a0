pub mod auth;
pub mod chat;
pub mod engagements;
pub mod listings;
pub mod products;
pub mod profiles;
pub mod reviews;
pub mod uploads;
