pub mod enums;
pub mod fields;
pub mod layout;

pub use enums::*;
pub use fields::*;
pub use layout::*;
