pub mod lsm9ds0;
pub mod pulse;
