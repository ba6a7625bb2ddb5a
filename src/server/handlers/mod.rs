pub mod health;
pub mod plan;
