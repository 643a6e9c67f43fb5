pub mod assemble;
pub mod classify;
pub mod etl;
pub mod mapping;
pub mod transform;

pub use crate::domain::model::{CanonicalRecord, RawRecord, Record, SplitTables, TransformResult};
pub use crate::domain::ports::{Pipeline, RecordSource, Storage};
pub use crate::utils::error::Result;
