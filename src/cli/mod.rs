pub mod characters;
pub mod import;
pub mod repair;
pub mod verify;
