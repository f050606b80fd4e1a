pub mod oauth;
pub mod verify;
