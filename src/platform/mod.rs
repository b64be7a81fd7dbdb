//! IFS Cloud External Reports Gateway calls: stage a temporary lob, fill it, link it to the job.

pub mod client;
pub mod finalizer;
pub mod handle;
pub mod stager;
pub mod uploader;
