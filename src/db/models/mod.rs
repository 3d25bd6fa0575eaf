mod availability;
mod session;

pub use availability::*;
pub use session::*;
