pub mod requests;
pub mod tour;
