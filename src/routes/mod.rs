pub mod auth;
pub mod documents;
pub mod meetings;
pub mod professionals;
pub mod schools;
pub mod students;
pub mod supports;
pub mod users;
