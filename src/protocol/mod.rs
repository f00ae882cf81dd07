pub mod command;
pub mod packet;
pub mod primitive;
pub mod response;
pub mod value;

pub use value::{BinaryValue, NullBitmap};
