use std::path::PathBuf;

use blockview_render::OverlayVisibility;

pub const DEFAULT_OUTPUT: &str = "blockview.png";

/// Command-line options for a single headless frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub blocks: Option<PathBuf>,
    pub atlas: Option<PathBuf>,
    pub metrics: Option<PathBuf>,
    pub resolution: Option<(u32, u32)>,
    pub overlays: Option<OverlayVisibility>,
    pub direct: bool,
    pub draw_distance: Option<f32>,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            config: None,
            blocks: None,
            atlas: None,
            metrics: None,
            resolution: None,
            overlays: None,
            direct: false,
            draw_distance: None,
        }
    }
}

impl CliOptions {
    /// Parse arguments; malformed values are logged and ignored.
    pub fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();
        let mut output_seen = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => opts.config = path_arg(&mut args, "--config"),
                "--blocks" => opts.blocks = path_arg(&mut args, "--blocks"),
                "--atlas" => opts.atlas = path_arg(&mut args, "--atlas"),
                "--metrics" => opts.metrics = path_arg(&mut args, "--metrics"),
                "--direct" => opts.direct = true,
                "--resolution" => {
                    if let Some(raw) = args.next() {
                        match parse_resolution(&raw) {
                            Some(resolution) => opts.resolution = Some(resolution),
                            None => tracing::error!(value = %raw, "--resolution must be like 1280x720"),
                        }
                    } else {
                        tracing::error!("--resolution requires a value like 1280x720");
                    }
                }
                "--overlays" => {
                    if let Some(raw) = args.next() {
                        opts.overlays = Some(parse_overlays(&raw));
                    } else {
                        tracing::error!("--overlays requires a list like grid,outline,lines");
                    }
                }
                "--draw-distance" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<f32>() {
                            Ok(value) => opts.draw_distance = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--draw-distance must be a number");
                            }
                        }
                    } else {
                        tracing::error!("--draw-distance requires a number");
                    }
                }
                other if other.starts_with("--") => {
                    tracing::warn!(arg = %other, "ignoring unknown option");
                }
                other => {
                    if output_seen {
                        tracing::warn!(arg = %other, "ignoring extra positional argument");
                    } else {
                        opts.output = PathBuf::from(other);
                        output_seen = true;
                    }
                }
            }
        }

        opts
    }
}

fn path_arg<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Option<PathBuf> {
    let path = args.next().map(PathBuf::from);
    if path.is_none() {
        tracing::error!(flag, "option requires a file path");
    }
    path
}

fn parse_resolution(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.split_once('x')?;
    match (w.parse::<u32>(), h.parse::<u32>()) {
        (Ok(width), Ok(height)) if width > 0 && height > 0 => Some((width, height)),
        _ => None,
    }
}

fn parse_overlays(raw: &str) -> OverlayVisibility {
    let mut overlays = OverlayVisibility::NONE;
    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        match name {
            "grid" => overlays.grid = true,
            "outline" => overlays.outline = true,
            "lines" | "mesh" => overlays.mesh_lines = true,
            "all" => overlays = OverlayVisibility::ALL,
            "none" => overlays = OverlayVisibility::NONE,
            other => tracing::warn!(overlay = %other, "unknown overlay"),
        }
    }
    overlays
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(parse(&[]), CliOptions::default());
    }

    #[test]
    fn first_positional_is_output() {
        let opts = parse(&["out/frame.png", "--direct", "ignored.png"]);
        assert_eq!(opts.output, PathBuf::from("out/frame.png"));
        assert!(opts.direct);
    }

    #[test]
    fn bad_resolution_is_ignored() {
        assert_eq!(parse(&["--resolution", "0x10"]).resolution, None);
        assert_eq!(parse(&["--resolution", "640x480"]).resolution, Some((640, 480)));
    }

    #[test]
    fn overlay_list_sets_flags() {
        let overlays = parse(&["--overlays", "grid, lines"]).overlays.unwrap();
        assert!(overlays.grid);
        assert!(!overlays.outline);
        assert!(overlays.mesh_lines);
    }
}
