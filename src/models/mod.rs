pub mod location;
pub mod user;
pub mod vote;

pub use location::{Entity as Location, Model as LocationModel};
pub use user::{Entity as User, Model as UserModel};
pub use vote::{Entity as Vote, Model as VoteModel, VoteKind};
