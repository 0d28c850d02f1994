use crossbeam::{channel, thread};
use log::{debug, info};

use crate::{
    camera::Camera,
    depth::DepthImage,
    grid::Grid,
    march::{trace, MarchConfig},
    Error, Result,
};

const TILE_SIZE: u32 = 16;

/// How the pixels of an image are distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Trace every pixel in order on the calling thread.
    Serial,

    /// Trace tiles of the image on a pool of `jobs` scoped threads.
    Threaded { jobs: usize },
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Threaded {
            jobs: num_cpus::get(),
        }
    }
}

/// An individual tile in the rendering target.
#[derive(Debug)]
struct Tile {
    row: u32,
    col: u32,
    width: u32,
    height: u32,
}

/// An iterator for tiles in a rendering target.
#[derive(Debug)]
struct Tiles {
    width: u32,
    height: u32,
    chunks_x: u32,
    chunks_y: u32,
    x: u32,
    y: u32,
}

impl Tiles {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            chunks_x: (width + TILE_SIZE - 1) / TILE_SIZE,
            chunks_y: (height + TILE_SIZE - 1) / TILE_SIZE,
            x: 0,
            y: 0,
        }
    }

    fn total(&self) -> u32 {
        self.chunks_x * self.chunks_y
    }
}

impl Iterator for Tiles {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.x >= self.chunks_x {
            self.x = 0;
            self.y += 1;
        }

        if self.y >= self.chunks_y {
            return None;
        }

        let col = self.x * TILE_SIZE;
        let row = self.y * TILE_SIZE;

        self.x += 1;

        Some(Tile {
            row,
            col,
            width: (self.width - col).min(TILE_SIZE),
            height: (self.height - row).min(TILE_SIZE),
        })
    }
}

/// Render a depth image of `grid` as seen by `camera`.
///
/// Configuration problems are reported before any ray is traced. Individual pixels never fail: a
/// ray that misses leaves NaN in its cell. Both backends produce identical images.
pub fn render<C: Camera>(
    grid: &Grid,
    camera: &C,
    config: &MarchConfig,
    backend: Backend,
) -> Result<DepthImage> {
    config.validate()?;

    let (width, height) = camera.resolution();
    if width == 0 || height == 0 {
        return Err(Error::Resolution(width, height));
    }

    info!("rendering {}x{} depth image ({:?})", width, height, backend);

    let image = match backend {
        Backend::Serial => render_serial(grid, camera, config),
        Backend::Threaded { jobs } => render_threaded(grid, camera, config, jobs.max(1)),
    };

    Ok(image)
}

/// Trace the pixels covered by `tile`, producing an image the size of the tile.
fn render_tile<C: Camera>(
    grid: &Grid,
    camera: &C,
    config: &MarchConfig,
    tile: &Tile,
) -> DepthImage {
    let mut chunk = DepthImage::new(tile.width, tile.height);
    for y in 0..tile.height {
        for x in 0..tile.width {
            let ray = camera.generate_ray(tile.row + y, tile.col + x);
            let depth = trace(grid, &ray, config).map(|hit| hit.distance);
            chunk.set(y as usize, x as usize, depth);
        }
    }
    chunk
}

fn render_serial<C: Camera>(grid: &Grid, camera: &C, config: &MarchConfig) -> DepthImage {
    let (width, height) = camera.resolution();
    let whole = Tile {
        row: 0,
        col: 0,
        width,
        height,
    };
    render_tile(grid, camera, config, &whole)
}

fn render_threaded<C: Camera>(
    grid: &Grid,
    camera: &C,
    config: &MarchConfig,
    jobs: usize,
) -> DepthImage {
    let (width, height) = camera.resolution();
    let mut image = DepthImage::new(width, height);

    let tiles = Tiles::new(width, height);
    let expecting = tiles.total() as usize;
    debug!("{} tiles across {} workers", expecting, jobs);

    let (input, pending) = channel::unbounded();
    for tile in tiles {
        // The receiver is still in scope, so this cannot fail.
        let _ = input.send(tile);
    }
    drop(input);

    let (results, chunks) = channel::unbounded();

    thread::scope(|s| {
        for _ in 0..jobs {
            let pending = pending.clone();
            let results = results.clone();
            s.spawn(move |_| {
                for tile in pending.iter() {
                    let chunk = render_tile(grid, camera, config, &tile);
                    if results.send((tile, chunk)).is_err() {
                        break;
                    }
                }
            });
        }

        // Only the workers hold senders now, so a worker dying ends the loop below.
        drop(results);

        for (tile, chunk) in chunks.iter().take(expecting) {
            image.blit(tile.row, tile.col, &chunk);
        }
    })
    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

    image
}
