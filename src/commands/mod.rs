//! CLI command implementations
//!
//! Every command is handed the loaded partition table and an already
//! opened flash medium; argument handling and medium setup stay in
//! `main`.

mod erase;
mod flash;
mod info;
mod list;
mod read;
mod write;

pub use erase::run_erase;
pub use flash::run_flash;
pub use info::run_info;
pub use list::run_list;
pub use read::run_read;
pub use write::run_write;
