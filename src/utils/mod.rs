pub mod file_io;
pub mod net;
pub(crate) mod time;
