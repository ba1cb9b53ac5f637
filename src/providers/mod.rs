pub mod grandtrunk;
pub mod openrates;
pub mod util;
