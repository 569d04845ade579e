mod fs;

pub use fs::FsArtifactStore;
