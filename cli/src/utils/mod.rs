pub mod io;

pub use self::io::LOG_PREFIX_INFO;
