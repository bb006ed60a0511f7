pub mod admin;
pub mod auth;
pub mod market;
pub mod oauth;
pub mod user;
