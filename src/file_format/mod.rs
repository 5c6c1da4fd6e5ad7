pub mod event;
pub mod ltsv;
