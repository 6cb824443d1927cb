#![no_std]
extern crate alloc;

mod addr;
mod region;
pub mod smap;

pub use addr::*;
pub use region::*;
pub use smap::{LocateError, SmapEntry, SmapError, SmapTable, SmapType, locate};
