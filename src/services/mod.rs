// Services module - Auth provider client and dashboard fetch logic

pub mod auth;
pub mod dashboard;
pub mod dates;
pub mod fetch_task;
