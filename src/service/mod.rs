pub mod auditor;
pub mod concurrency;
pub mod crawler;
pub mod gsc;
pub mod http;
pub mod providers;
pub mod report;
pub mod tips;
