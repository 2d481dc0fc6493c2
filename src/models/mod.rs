pub mod event;
pub mod rate;
pub mod response;
