use crate::finder::descriptor::Descriptor;
use crate::synda::records::RemoteRecord;
use anyhow::Result;

/// Lists candidate files for a descriptor on some local mirror. Which
/// directories get searched is the implementation's business.
pub trait FileDiscovery {
    fn name(&self) -> &str;

    fn discover_files(&self, descriptor: &Descriptor) -> Result<Vec<String>>;
}

/// A federated index that can report and fetch files the mirrors lack.
pub trait RemoteIndex {
    fn search_remote(&self, model_data: &str, variable: &str) -> Result<Vec<RemoteRecord>>;

    fn install_remote(&self, file_id: &str) -> Result<()>;

    /// Where `record` lives (or will live) once installed.
    fn install_path(&self, record: &RemoteRecord, variable: &str) -> Option<String>;
}
