#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod db;
pub mod email;
pub mod models;
pub mod money;
pub mod rates;
pub mod reconcile;
pub mod request_io;
pub mod schema;
pub mod spending;
pub mod token;
pub mod validators;
