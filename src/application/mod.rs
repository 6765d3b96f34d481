pub mod calendar;
pub mod countdowns;
pub mod sky;
pub mod task_service;
mod task_service_tests;
#[cfg(test)]
pub(crate) mod testing;
pub mod tick;
pub mod timer;
pub mod village;
