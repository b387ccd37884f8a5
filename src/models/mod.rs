pub mod appointment;
pub mod enums;
pub mod record;
pub mod slot;
pub mod user;

pub use appointment::*;
pub use enums::*;
pub use record::*;
pub use slot::*;
pub use user::*;
