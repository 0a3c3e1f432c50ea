use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[readonly::make]
pub struct OutputSettings {
    pub csv_path: PathBuf,
    pub heap_dump_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("memory_profiler_output.csv"),
            heap_dump_dir: PathBuf::from("heap_dump"),
        }
    }
}
