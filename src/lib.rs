pub mod db;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod repository;
pub mod service;
