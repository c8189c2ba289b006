pub mod checks;
pub mod health;
pub mod monitoring;
pub mod schedule;
