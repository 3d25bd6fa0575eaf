pub mod availability;
pub mod sessions;
