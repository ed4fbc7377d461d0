mod middleware;
mod public;

pub use middleware::log_responses;
pub use public::{HttpState, build_router};
