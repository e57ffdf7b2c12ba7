pub mod alignment;
pub mod breaks;
pub mod digest;
pub mod emit;
pub mod error;
pub mod io;
pub mod junction;
pub mod layout;
pub mod pipeline;
pub mod rescale;
pub mod scaffold;
pub mod stat;
pub mod table;
