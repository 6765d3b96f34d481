pub mod countdown;
pub mod dates;
pub mod error;
pub mod repository;
pub mod task;
pub mod time_entry;
pub mod weather;
