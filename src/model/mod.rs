pub mod employee;
pub mod role;
pub mod time_off;
