pub mod batch;
pub mod check;
pub mod oracle;
pub mod replay;
pub mod report;
pub mod shared;
