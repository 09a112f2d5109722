pub mod classifier;
pub mod history;
pub mod s3;
pub mod storage;
pub mod store;
pub mod tracker;
pub mod validation;
pub mod worker;
