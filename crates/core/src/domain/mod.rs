pub mod admin;
pub mod claim;
pub mod slot;
pub mod user;
