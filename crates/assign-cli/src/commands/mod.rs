pub mod admin;
pub mod assign;
pub mod booking;
pub mod seed;
