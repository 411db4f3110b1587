#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod db;
pub mod ledger;
pub mod models;
pub mod query;
pub mod request_io;
pub mod schema;
pub mod token;
pub mod validators;
