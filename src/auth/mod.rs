pub mod accounts;
pub mod auth;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod password;
pub mod session;
