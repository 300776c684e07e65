pub mod event;
pub mod job;
pub mod projection;
pub mod tags;
