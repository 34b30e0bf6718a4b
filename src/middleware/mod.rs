pub mod auth;
pub mod response;

pub use auth::CurrentUser;
pub use response::{ApiResponse, ApiResult};
