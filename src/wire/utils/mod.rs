pub mod read_line;

pub use read_line::read_line;
