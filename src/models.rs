pub mod chatmodels;
pub mod engagementmodel;
pub mod listingmodel;
pub mod productmodel;
pub mod reviewmodel;
pub mod usermodel;
