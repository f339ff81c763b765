use std::sync::Arc;

use blockview_assets::registry_from_str;
use blockview_core::{BlockName, BlockPos, BlockState};
use blockview_render::{ChunkBuilder, CpuUploader, Layer, Resources};
use blockview_world::Structure;

const PACK: &str = r#"
[
  { "name": "air", "invisible": true },
  { "name": "stone", "opaque": true, "self_culling": true },
  { "name": "custom:crystal", "semi_transparent": true,
    "emissive": { "color": [0.6, 0.2, 1.0], "intensity": 2.0 } }
]
"#;

fn state(name: &str) -> BlockState {
    BlockState::new(BlockName::parse(name).unwrap())
}

#[test]
fn registry_mesh_pipeline_from_json() {
    let registry = registry_from_str(PACK).expect("valid pack");
    let resources = Arc::new(Resources::with_default_models(registry));

    let mut structure = Structure::with_size(3, 1, 1);
    structure.set_block(BlockPos::new(0, 0, 0), state("stone")).unwrap();
    structure.set_block(BlockPos::new(1, 0, 0), state("custom:crystal")).unwrap();
    structure.set_block(BlockPos::new(2, 0, 0), state("air")).unwrap();

    let mut builder = ChunkBuilder::new(structure, resources, 16, CpuUploader::new()).expect("builder");
    let entries = builder.mesh_entries();
    let layers: Vec<Layer> = entries.iter().map(|entry| entry.layer).collect();
    assert_eq!(layers, vec![Layer::Opaque, Layer::Transparent]);
    assert_eq!(entries[0].mesh.quad_count(), 6);
    // The crystal hides nothing behind the opaque stone face.
    assert_eq!(entries[1].mesh.quad_count(), 5);

    let lights = builder.emissive_lights();
    assert_eq!(lights.len(), 1);
    assert_eq!(lights[0].position, [1.5, 0.5, 0.5]);
}

#[test]
fn metrics_round_trip_through_testkit() {
    let registry = registry_from_str(PACK).expect("valid pack");
    let resources = Arc::new(Resources::with_default_models(registry));
    let mut structure = Structure::new(blockview_world::Bounds::new(
        BlockPos::new(-20, 0, 0),
        BlockPos::new(20, 0, 0),
    ));
    structure.set_block(BlockPos::new(-20, 0, 0), state("stone")).unwrap();
    structure.set_block(BlockPos::new(20, 0, 0), state("stone")).unwrap();
    let builder = ChunkBuilder::new(structure, resources, 16, CpuUploader::new()).expect("builder");

    let path = std::env::temp_dir()
        .join(format!("blockview_metrics_{}", std::process::id()))
        .join("metrics.json");
    blockview_render::write_metrics_to_file(&builder.chunk_stats(), &path).expect("write metrics");
    let metrics = blockview_testkit::read_metrics(&path).expect("read metrics");

    let chunks: Vec<[i32; 3]> = metrics.iter().map(|metric| metric.chunk).collect();
    assert_eq!(chunks, vec![[-2, 0, 0], [1, 0, 0]]);
    assert!(metrics.iter().all(|metric| metric.opaque_triangles == 12));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
