pub mod libs;

pub use libs::io::{persist, reader, writer};
