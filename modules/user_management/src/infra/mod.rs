pub mod activity;
pub mod storage;
