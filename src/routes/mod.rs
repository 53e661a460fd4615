pub mod health;
pub mod tour;
