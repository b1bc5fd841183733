mod common;
mod preprocess;
mod service;
