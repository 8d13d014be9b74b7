//! Seed types for initializing water maps.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Starting scenario for map initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    /// Scenario to build.
    pub scenario: Scenario,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            scenario: Scenario::Basin {
                center: (0.5, 0.5),
                radius: 0.15,
                depth: 2.0,
                contamination: 0.5,
            },
        }
    }
}

/// Predefined starting maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Scenario {
    /// Flat terrain with one circular pool.
    Basin {
        /// Center position as fraction of map size (0.0-1.0).
        center: (f32, f32),
        /// Radius as fraction of the smaller map dimension.
        radius: f32,
        /// Water depth inside the pool.
        depth: f32,
        /// Contamination of the pool water.
        contamination: f32,
    },
    /// Water on a plateau that ends in a cliff.
    Waterfall {
        /// Column of the cliff edge as fraction of width.
        cliff: f32,
        /// Height of the plateau above the lowland.
        cliff_height: f32,
        /// Water depth on the plateau.
        depth: f32,
    },
    /// A reservoir held back by a column of partial obstacles.
    Dam {
        /// Column of the dam as fraction of width.
        dam: f32,
        /// Reservoir depth.
        depth: f32,
        /// Reservoir contamination.
        contamination: f32,
    },
    /// Random rolling terrain under uniform rain.
    Terrain {
        /// Random seed.
        seed: u64,
        /// Terrain heights lie in [0, max_height].
        max_height: f32,
        /// Water depth added to every tile.
        rain: f32,
        /// Contamination of the rain.
        contamination: f32,
    },
    /// Explicit water depths (sparse representation).
    Custom {
        /// List of (x, y, depth, contamination) entries.
        values: Vec<(usize, usize, f32, f32)>,
    },
}

/// Per-tile starting layers in map coordinates (`y * width + x`, no border).
#[derive(Debug, Clone, Default)]
pub struct SeedLayers {
    pub width: usize,
    pub height: usize,
    pub surface_heights: Vec<f32>,
    pub partial_obstacles: Vec<bool>,
    pub depths: Vec<f32>,
    pub contaminations: Vec<f32>,
}

impl SeedLayers {
    fn flat(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            surface_heights: vec![0.0; len],
            partial_obstacles: vec![false; len],
            depths: vec![0.0; len],
            contaminations: vec![0.0; len],
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }
}

impl Seed {
    /// Generate starting layers for a `width × height` map.
    pub fn generate(&self, width: usize, height: usize) -> SeedLayers {
        let mut layers = SeedLayers::flat(width, height);

        match &self.scenario {
            Scenario::Basin {
                center,
                radius,
                depth,
                contamination,
            } => {
                let cx = center.0 * width as f32;
                let cy = center.1 * height as f32;
                let r = radius * width.min(height) as f32;
                for y in 0..height {
                    for x in 0..width {
                        let dx = x as f32 + 0.5 - cx;
                        let dy = y as f32 + 0.5 - cy;
                        if dx * dx + dy * dy <= r * r {
                            let i = layers.idx(x, y);
                            layers.depths[i] = *depth;
                            layers.contaminations[i] = *contamination;
                        }
                    }
                }
            }
            Scenario::Waterfall {
                cliff,
                cliff_height,
                depth,
            } => {
                let edge = column(*cliff, width);
                for y in 0..height {
                    for x in 0..edge {
                        let i = layers.idx(x, y);
                        layers.surface_heights[i] = *cliff_height;
                        layers.depths[i] = *depth;
                    }
                }
            }
            Scenario::Dam {
                dam,
                depth,
                contamination,
            } => {
                let dam_x = column(*dam, width);
                for y in 0..height {
                    for x in 0..width {
                        let i = layers.idx(x, y);
                        if x == dam_x {
                            layers.partial_obstacles[i] = true;
                        } else if x < dam_x {
                            layers.depths[i] = *depth;
                            layers.contaminations[i] = *contamination;
                        }
                    }
                }
            }
            Scenario::Terrain {
                seed,
                max_height,
                rain,
                contamination,
            } => {
                apply_terrain(&mut layers, *seed, *max_height);
                layers.depths.fill(*rain);
                layers.contaminations.fill(*contamination);
            }
            Scenario::Custom { values } => {
                for &(x, y, depth, contamination) in values {
                    if x < width && y < height {
                        let i = layers.idx(x, y);
                        layers.depths[i] = depth;
                        layers.contaminations[i] = contamination;
                    }
                }
            }
        }

        layers
    }
}

fn column(fraction: f32, width: usize) -> usize {
    ((fraction * width as f32) as usize).min(width.saturating_sub(1))
}

/// Random heights smoothed with a few box-blur passes.
fn apply_terrain(layers: &mut SeedLayers, seed: u64, max_height: f32) {
    let (width, height) = (layers.width, layers.height);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut heights: Vec<f32> = (0..width * height).map(|_| rng.gen_range(0.0..1.0)).collect();

    let mut blurred = vec![0.0f32; heights.len()];
    for _ in 0..3 {
        for y in 0..height {
            for x in 0..width {
                let mut sum = 0.0;
                let mut count = 0.0;
                for ny in y.saturating_sub(1)..(y + 2).min(height) {
                    for nx in x.saturating_sub(1)..(x + 2).min(width) {
                        sum += heights[ny * width + nx];
                        count += 1.0;
                    }
                }
                blurred[y * width + x] = sum / count;
            }
        }
        std::mem::swap(&mut heights, &mut blurred);
    }

    let (lo, hi) = heights
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));
    let range = (hi - lo).max(1e-6);
    for (out, h) in layers.surface_heights.iter_mut().zip(heights) {
        *out = (h - lo) / range * max_height;
    }
}
