use anyhow::Result;
use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Minimum fraction of mode energy in the transverse-magnetic polarization
/// for a candidate mode to be accepted by the sweep.
pub const TM_FRACTION_THRESHOLD: f64 = 0.5;
/// Margin (in geometry units) by which the core is buffered to form the
/// surrounding air region.
pub const AIR_BUFFER: f64 = 5.0;
/// Scaling factor for integer coordinates during clipping.
pub const CLIP_TOLERANCE: f64 = 1e6;
/// Minimum triangle area (in geometry units squared) to be considered non-degenerate.
pub const AREA_THRESHOLD: f64 = 1e-12;
/// Axis coordinates closer than this are merged into a single mesh line.
pub const COORD_MERGE_DISTANCE: f64 = 1e-9;

/// Per-region mesh refinement hint.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MeshResolution {
    /// Target edge length inside the region.
    pub resolution: f64,
    /// Distance from the region over which the refinement is held.
    pub distance: f64,
}

/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    /// Free-space wavelength in micrometres.
    pub wavelength: f64,
    /// Width of the silica slab.
    pub slab_width: f64,
    /// Height of the silica slab.
    pub slab_height: f64,
    /// Height of the silicon rail above the slab.
    pub rail_height: f64,
    /// Thickness of the Si-NC core strip embedded in the rail.
    pub core_thickness: f64,
    /// Refractive index of the Si-NC core.
    pub n_core: f64,
    /// Refractive index of silicon.
    pub n_silicon: f64,
    /// Refractive index of silica.
    pub n_silica: f64,
    /// Refractive index of air.
    pub n_air: f64,
    /// First core width of the sweep, in nanometres.
    pub width_start_nm: usize,
    /// End of the sweep (exclusive), in nanometres.
    pub width_stop_nm: usize,
    /// Sweep step, in nanometres.
    pub width_step_nm: usize,
    /// Number of candidate modes requested from the solver per width.
    pub num_modes: usize,
    /// Refinement applied to the core, silicon and silica regions.
    pub refinement: MeshResolution,
    /// Maximum edge length away from all refined regions.
    pub default_resolution_max: f64,
    /// Reference effective-area measurements (two-column CSV).
    pub reference_aeff: String,
    /// Reference effective-index measurements (two-column CSV).
    pub reference_neff: String,
    /// Output directory for results and plots.
    #[serde(default = "default_directory")]
    pub directory: String,
}

fn default_directory() -> String {
    "out".to_string()
}

impl Settings {
    /// The swept core widths in nanometres, ascending.
    pub fn widths_nm(&self) -> Vec<usize> {
        (self.width_start_nm..self.width_stop_nm)
            .step_by(self.width_step_nm)
            .collect()
    }

    /// Free-space wavenumber k0 = 2 pi / wavelength.
    pub fn wavenumber(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.wavelength
    }

    /// Lowest refractive index among the four materials.
    pub fn n_min(&self) -> f64 {
        self.n_core
            .min(self.n_silicon)
            .min(self.n_silica)
            .min(self.n_air)
    }

    /// Highest refractive index among the four materials.
    pub fn n_max(&self) -> f64 {
        self.n_core
            .max(self.n_silicon)
            .max(self.n_silica)
            .max(self.n_air)
    }
}

pub fn load_default_config() -> Result<Settings> {
    let root_dir = retrieve_project_root();
    let default_config_file = root_dir.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .unwrap_or_else(|err| {
            eprintln!("Error loading configuration: {}", err);
            std::process::exit(1);
        });

    let config: Settings = settings.try_deserialize().unwrap_or_else(|err| {
        eprintln!("Error deserializing configuration: {}", err);
        std::process::exit(1);
    });

    validate_config(&config);

    Ok(config)
}

pub fn load_config() -> Result<Settings> {
    // Try to find the project directory in different ways
    let root_dir = retrieve_project_root();

    let default_config_file = root_dir.join("config/default.toml");
    let local_config = root_dir.join("config/local.toml");

    // Check if local config exists, if not use default
    let config_file = if local_config.exists() {
        println!("Using local configuration: {:?}", local_config);
        local_config
    } else {
        println!("Using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(Environment::with_prefix("modesweep"))
        .build()
        .unwrap_or_else(|err| {
            eprintln!("Error loading configuration: {}", err);
            std::process::exit(1);
        });

    let mut config: Settings = settings.try_deserialize().unwrap_or_else(|err| {
        eprintln!("Error deserializing configuration: {}", err);
        std::process::exit(1);
    });

    // Parse command-line arguments and override values
    let args = CliArgs::parse();

    if let Some(wavelength) = args.w {
        config.wavelength = wavelength;
    }
    if let Some(modes) = args.modes {
        config.num_modes = modes;
    }
    if let Some(res) = args.res {
        config.refinement.resolution = res;
    }
    if let Some(max) = args.res_max {
        config.default_resolution_max = max;
    }
    if let Some(dir) = args.dir {
        config.directory = dir;
    }

    // Handle the sweep range
    if let Some(range) = &args.widths {
        if range.len() == 3 {
            config.width_start_nm = range[0];
            config.width_stop_nm = range[1];
            config.width_step_nm = range[2];
        } else {
            eprintln!(
                "Warning: --widths requires exactly three values (start stop step). Using configured sweep."
            );
        }
    }

    validate_config(&config);

    println!("{:#?}", config);

    Ok(config)
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the MODESWEEP_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
/// If none of these methods work, the function will panic.
fn retrieve_project_root() -> std::path::PathBuf {
    let root_dir = if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        std::path::PathBuf::from(manifest_dir)
    } else if let Ok(path) = env::var("MODESWEEP_ROOT_DIR") {
        // Allow explicit configuration via environment variable
        std::path::PathBuf::from(path)
    } else {
        // Fallback: try to find the nearest directory containing a "config" subdirectory
        // Start from the executable directory and walk upward
        let exe_path = env::current_exe().expect("Failed to get current executable path");
        let mut current_dir = exe_path
            .parent()
            .expect("Failed to get executable directory")
            .to_path_buf();
        let mut found = false;

        while !found && current_dir.parent().is_some() {
            if current_dir.join("config").is_dir() {
                found = true;
            } else {
                current_dir = current_dir.parent().unwrap().to_path_buf();
            }
        }

        if found {
            current_dir
        } else {
            panic!("Could not find project root directory");
        }
    };
    root_dir
}

fn validate_config(config: &Settings) {
    assert!(config.wavelength > 0.0, "Wavelength must be greater than 0");
    assert!(
        config.refinement.resolution > 0.0,
        "Mesh resolution must be greater than 0"
    );
    assert!(
        config.default_resolution_max >= config.refinement.resolution,
        "Maximum resolution must not be finer than the refined resolution"
    );
    assert!(
        config.width_start_nm < config.width_stop_nm && config.width_step_nm > 0,
        "Sweep widths must be ascending with a positive step"
    );
    assert!(config.num_modes > 0, "At least one mode must be requested");
    assert!(
        config.core_thickness <= config.rail_height,
        "Core strip must fit inside the silicon rail"
    );
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "modesweep - effective index and effective area of a Si-NC slot waveguide over a width sweep"
)]
pub struct CliArgs {
    /// Wavelength in units of the geometry.
    #[arg(short, long)]
    w: Option<f64>,

    /// Number of candidate modes requested from the solver per width.
    #[arg(long)]
    modes: Option<usize>,

    /// Target edge length inside the refined regions.
    #[arg(long)]
    res: Option<f64>,

    /// Maximum edge length away from the refined regions.
    #[arg(long)]
    res_max: Option<f64>,

    /// Output directory for results and plots.
    #[arg(short, long)]
    dir: Option<String>,

    /// Sweep range in nanometres: start stop step.
    #[arg(long, num_args = 3, value_delimiter = ' ')]
    widths: Option<Vec<usize>>,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Wavelength: {:.6}
  - Sweep: {}..{} nm step {} nm
  - Modes per width: {}
  - Indices (core, silicon, silica, air): {:.4}, {:.4}, {:.4}, {:.4}
  - Refinement: {:.4} within {:.4}, max {:.4}
  ",
            self.wavelength,
            self.width_start_nm,
            self.width_stop_nm,
            self.width_step_nm,
            self.num_modes,
            self.n_core,
            self.n_silicon,
            self.n_silica,
            self.n_air,
            self.refinement.resolution,
            self.refinement.distance,
            self.default_resolution_max,
        )
    }
}
