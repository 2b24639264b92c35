pub mod document_scanner;
pub mod file_filter;

pub use document_scanner::{DocumentScanner, InputFile, ScanStatistics};
pub use file_filter::FileFilter;
