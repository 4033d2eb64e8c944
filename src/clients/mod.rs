pub mod filemoon;
pub mod http;
pub mod telegram;
pub mod tmdb;
