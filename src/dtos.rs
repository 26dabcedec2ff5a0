pub mod chatdtos;
pub mod listingdtos;
pub mod productdtos;
pub mod reviewdtos;
pub mod userdtos;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}
