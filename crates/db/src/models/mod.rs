pub mod client;
pub mod sale;
