pub mod about;
pub mod admin;
pub mod coordinator;
pub mod db;
pub mod event;
pub mod guest;
pub mod participant;
pub mod settings;
