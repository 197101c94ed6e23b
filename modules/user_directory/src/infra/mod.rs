pub mod http;
pub mod rest;
