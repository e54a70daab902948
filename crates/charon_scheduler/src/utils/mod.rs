pub mod newtype_index;
pub mod threads;
pub mod time;
