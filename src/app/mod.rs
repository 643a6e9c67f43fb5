pub mod fetcher;
pub mod pipelines;
pub mod runner;
