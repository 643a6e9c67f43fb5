pub mod store_pipeline;
