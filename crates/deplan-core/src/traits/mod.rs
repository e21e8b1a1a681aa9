pub mod fetch;
pub mod manifest;
pub mod protocol;

pub use fetch::{FetchedArtifact, Fetcher};
pub use manifest::{ManifestReader, PackagedDependency, PackagedInfo, PackagedReader};
pub use protocol::ProtocolHandlers;
