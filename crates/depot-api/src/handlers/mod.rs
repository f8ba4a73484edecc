pub mod archives;
pub mod health;
pub mod objects;
pub mod records;
pub mod repositories;
pub mod uploads;
pub mod urls;
