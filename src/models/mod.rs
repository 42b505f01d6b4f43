pub mod category;
pub mod os_path;
pub mod record;
pub mod scan_result;
pub mod snapshot;
pub mod stats;
pub mod volume;
