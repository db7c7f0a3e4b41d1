pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod utils;

pub use error::AppError;
pub use router::build_router;
