use wgpu::naga;

fn validate_wgsl(source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| err.emit_to_string(source))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );

    validator
        .validate(&module)
        .map_err(|err| err.emit_to_string(source))?;
    Ok(module)
}

fn assert_entry_points(source: &str, expected: &[&str]) {
    let module = validate_wgsl(source).unwrap();
    let names: Vec<&str> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
    for name in expected {
        assert!(names.contains(name), "missing entry point {name}; found {names:?}");
    }
}

#[test]
fn scene_shader_is_valid_wgsl() {
    assert_entry_points(
        include_str!("../src/shaders/scene.wgsl"),
        &["vs_sky", "fs_sky", "vs_main", "fs_opaque", "fs_transparent"],
    );
}

#[test]
fn shadow_shader_is_valid_wgsl() {
    assert_entry_points(include_str!("../src/shaders/shadow.wgsl"), &["vs_shadow"]);
}

#[test]
fn overlay_shader_is_valid_wgsl() {
    assert_entry_points(include_str!("../src/shaders/overlay.wgsl"), &["vs_main", "fs_main"]);
}

#[test]
fn ssao_shader_is_valid_wgsl() {
    assert_entry_points(include_str!("../src/shaders/ssao.wgsl"), &["vs_fullscreen", "fs_ssao"]);
}

#[test]
fn bloom_shader_is_valid_wgsl() {
    assert_entry_points(
        include_str!("../src/shaders/bloom.wgsl"),
        &["vs_fullscreen", "fs_extract", "fs_blur"],
    );
}

#[test]
fn god_ray_shader_is_valid_wgsl() {
    assert_entry_points(
        include_str!("../src/shaders/god_rays.wgsl"),
        &["vs_fullscreen", "fs_god_rays"],
    );
}

#[test]
fn composite_shader_is_valid_wgsl() {
    assert_entry_points(
        include_str!("../src/shaders/composite.wgsl"),
        &["vs_fullscreen", "fs_composite"],
    );
}
