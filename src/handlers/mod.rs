pub mod location;
pub mod vote;
