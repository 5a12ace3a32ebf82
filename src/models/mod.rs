pub mod page;
pub mod user;

pub use page::Page;
pub use user::{NewUser, Role, Status, Timestamp, User, UserRecord};
