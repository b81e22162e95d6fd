pub mod location;
pub mod vote;

pub use location::LocationService;
pub use vote::VoteService;
