mod client;
mod progress_stream;
mod snapshot;
mod transfer;

pub use client::RemoteClient;
pub use progress_stream::{percent_of, ProgressStream};
pub use snapshot::HttpFolderSnapshot;
pub use transfer::HttpTransfer;
