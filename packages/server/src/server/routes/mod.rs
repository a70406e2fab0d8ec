// HTTP routes
pub mod health;
pub mod match_records;
pub mod matching;
pub mod needs;
pub mod quotes;

pub use health::*;
pub use match_records::*;
pub use matching::*;
pub use needs::*;
pub use quotes::*;

use axum::Json;
use serde::Serialize;

/// Success envelope; failures render through `MatchingError`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}
