#![warn(missing_docs)]
//! Test and CI helpers: per-chunk mesh metrics written as JSON artifacts.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Mesh metric snapshot for a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeshMetric {
    /// Chunk coordinates [x, y, z].
    pub chunk: [i32; 3],
    /// Triangle count of the opaque layer.
    pub opaque_triangles: usize,
    /// Triangle count of the transparent layer.
    pub transparent_triangles: usize,
    /// Combined mesh hash (hex string) for deterministic comparisons.
    pub hash: String,
}

impl ChunkMeshMetric {
    /// Triangles across both layers.
    pub fn triangles(&self) -> usize {
        self.opaque_triangles + self.transparent_triangles
    }
}

/// Writes chunk mesh metrics to JSON for CI artifacts.
pub struct MeshMetricSink {
    file: File,
}

impl MeshMetricSink {
    /// Create a sink pointed at the supplied path, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            file: File::create(path)?,
        })
    }

    /// Persist the provided metrics as pretty JSON.
    pub fn write(&mut self, metrics: &[ChunkMeshMetric]) -> Result<()> {
        let json = serde_json::to_string_pretty(metrics)?;
        self.file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Read metrics previously written by [`MeshMetricSink`].
pub fn read_metrics<P: AsRef<Path>>(path: P) -> Result<Vec<ChunkMeshMetric>> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn mesh_metric_sink_writes_file() {
        let path = std::env::temp_dir().join(format!(
            "blockview-mesh-metrics-{}.json",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let metrics = vec![ChunkMeshMetric {
            chunk: [-1, 0, 2],
            opaque_triangles: 12,
            transparent_triangles: 4,
            hash: "deadbeef".into(),
        }];
        let mut sink = MeshMetricSink::create(&path).expect("sink create");
        sink.write(&metrics).expect("write succeeds");
        drop(sink);

        let contents = fs::read_to_string(&path).expect("file readable");
        assert!(contents.contains("deadbeef"));
        assert!(contents.contains("opaque_triangles"));

        let back = read_metrics(&path).expect("metrics parse");
        assert_eq!(back, metrics);
        assert_eq!(back[0].triangles(), 16);
        let _ = fs::remove_file(&path);
    }
}
