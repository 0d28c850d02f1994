use std::{path::PathBuf, time::Instant};

use anyhow::{Context, Error};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use nalgebra::{Point3, Vector3};

use dfrender::{
    config::Config,
    encode::{self, Colormap},
    render::{self, Backend},
};

#[derive(Parser, Debug)]
#[command(version, about = "Render depth images of signed distance fields")]
struct Cli {
    #[command(subcommand)]
    source: Source,

    #[command(flatten)]
    opts: Opts,
}

#[derive(Subcommand, Debug)]
enum Source {
    /// Render a synthetic sphere field.
    Sphere {
        /// Voxels per side of the volume.
        #[arg(long, default_value_t = 100)]
        dim: usize,

        #[arg(long, default_value_t = 40.0)]
        radius: f32,
    },

    /// Render a field stored in a VTK image data file.
    Vti { path: PathBuf },
}

#[derive(Args, Debug)]
struct Opts {
    /// Output image; the format follows the extension.
    #[arg(short, long, global = true, default_value = "depth.png")]
    output: PathBuf,

    #[arg(long, global = true)]
    width: Option<u32>,

    #[arg(long, global = true)]
    height: Option<u32>,

    /// Ray origin of pixel (0, 0), as `x,y,z`.
    #[arg(long, global = true, value_parser = parse_triple, allow_hyphen_values = true)]
    image_origin: Option<[f32; 3]>,

    /// Pixel size in world units.
    #[arg(long, global = true)]
    pixel_size: Option<f32>,

    /// View direction, as `x,y,z`.
    #[arg(long, global = true, value_parser = parse_triple, allow_hyphen_values = true)]
    direction: Option<[f32; 3]>,

    #[arg(long, global = true)]
    max_steps: Option<u32>,

    #[arg(long, global = true)]
    epsilon: Option<f32>,

    #[arg(long, global = true)]
    max_distance: Option<f32>,

    /// Worker threads; zero traces on the calling thread only.
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    #[arg(long, global = true, value_enum, default_value_t = Cmap::Jet)]
    colormap: Cmap,

    /// Also print an ascii preview this many columns wide.
    #[arg(long, global = true)]
    ascii: Option<u32>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Cmap {
    Gray,
    Jet,
}

impl From<Cmap> for Colormap {
    fn from(cmap: Cmap) -> Self {
        match cmap {
            Cmap::Gray => Colormap::Gray,
            Cmap::Jet => Colormap::Jet,
        }
    }
}

fn parse_triple(text: &str) -> Result<[f32; 3], String> {
    let parts = text
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid number in `{}`: {}", text, err))?;
    parts
        .try_into()
        .map_err(|_| format!("expected three comma separated values, got `{}`", text))
}

impl Opts {
    fn apply(&self, config: &mut Config) {
        let camera = &mut config.camera;
        camera.width = self.width.unwrap_or(camera.width);
        camera.height = self.height.unwrap_or(camera.height);
        camera.pixel_size = self.pixel_size.unwrap_or(camera.pixel_size);
        if let Some(origin) = self.image_origin {
            camera.origin = Point3::from(origin);
        }
        if let Some(direction) = self.direction {
            camera.direction = Vector3::from(direction);
        }

        let march = &mut config.march;
        march.max_steps = self.max_steps.unwrap_or(march.max_steps);
        march.epsilon = self.epsilon.unwrap_or(march.epsilon);
        march.max_distance = self.max_distance.unwrap_or(march.max_distance);

        config.backend = match self.jobs {
            Some(0) => Backend::Serial,
            Some(jobs) => Backend::Threaded { jobs },
            None => Backend::default(),
        };

        config.encode.colormap = self.colormap.into();
    }
}

fn main() -> Result<(), Error> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();

    let mut config = match cli.source {
        Source::Sphere { dim, radius } => {
            let mut config = Config::sphere();
            let center = dim as f32 / 2.0;
            config.grid = dfrender::config::GridSource::Sphere {
                dim,
                voxel_width: 1.0,
                center: Point3::new(center, center, center),
                radius,
            };
            config
        }
        Source::Vti { path } => Config::vti(path),
    };
    cli.opts.apply(&mut config);

    let grid = config.grid.load().context("failed to load the distance field")?;
    let camera = config.camera.build().context("invalid camera")?;

    let start = Instant::now();
    let depth = render::render(&grid, &camera, &config.march, config.backend)
        .context("render failed")?;
    info!("traced in {:.2?}", start.elapsed());

    match depth.min_max() {
        Some((lo, hi)) => info!("min(depth) = {}, max(depth) = {}", lo, hi),
        None => warn!("no ray hit the surface"),
    }

    if let Some(columns) = cli.opts.ascii {
        println!("{}", encode::to_ascii(&depth, columns));
    }

    encode::save(&depth, &config.encode, &cli.opts.output)
        .with_context(|| format!("failed to write `{}`", cli.opts.output.display()))?;

    Ok(())
}
