#![no_std]
extern crate alloc;

mod addr;
mod direct;
mod live;
mod mapping;
mod ram;
mod segment;

pub use addr::*;
pub use direct::*;
pub use mapping::*;
pub use ram::*;
pub use segment::*;
