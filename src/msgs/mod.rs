#[macro_use]
mod macros;

pub mod codec;
pub mod deframer;
pub mod enums;
