pub mod bootstrap;
pub mod boundary;
pub mod client;
pub mod config;
pub mod data;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod ingestor;
pub mod status_code;
pub mod subscription;
pub mod web;
