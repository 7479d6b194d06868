pub mod permission;
pub mod role;
pub mod service;
pub mod user;
pub mod workflow;
