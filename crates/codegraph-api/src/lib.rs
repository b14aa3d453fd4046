pub mod pipeline;
pub mod query_api;

pub use pipeline::{
    AnalyzeOptions, BatchReport, ChannelProgressSink, FileOutcome, IngestionPipeline,
    NullProgressSink, ProgressEvent, ProgressSink,
};
pub use query_api::QueryAPI;
