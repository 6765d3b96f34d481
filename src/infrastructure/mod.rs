pub mod local_storage;
pub mod open_meteo;
pub mod sqlite_repo;
pub mod unconfigured;
