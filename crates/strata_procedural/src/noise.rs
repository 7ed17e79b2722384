//! # Noise Field
//!
//! Seeded gradient noise and the derived samplers terrain classification is
//! built on.
//!
//! ## Samplers
//!
//! - [`NoiseField::perlin2d`]: a single 2D Perlin sample in `[0, 1]`
//! - [`NoiseField::layered_perlin2d`]: an unnormalized layered accumulation
//! - [`NoiseField::perlin3d_above_threshold`]: a 3D threshold test built from
//!   six pairwise 2D samples
//! - [`diamond_square`]: the classic fractal heightfield
//!
//! ## Determinism Guarantee
//!
//! Given the same seed, every sampler produces exactly the same values on any
//! platform, any time. The diamond-square random offsets come from a
//! ChaCha8 stream seeded by the world seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::chunk::CHUNK_WIDTH;

/// Pre-computed permutation table for gradient noise.
///
/// Computed once from the seed and reused for every sample.
struct PermutationTable {
    /// 512-entry permutation table (256 entries, doubled for overflow handling).
    perm: [u8; 512],
}

impl PermutationTable {
    /// Creates a new permutation table from a seed.
    fn new(seed: u64) -> Self {
        let mut perm = [0u8; 512];

        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates shuffle with a deterministic xorshift64 stream.
        // The increment keeps the state nonzero and separates nearby seeds.
        let mut rng_state = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        if rng_state == 0 {
            rng_state = 0x9E37_79B9_7F4A_7C15;
        }
        for i in (1..256).rev() {
            rng_state ^= rng_state << 13;
            rng_state ^= rng_state >> 7;
            rng_state ^= rng_state << 17;

            let j = (rng_state as usize) % (i + 1);
            perm.swap(i, j);
        }

        for i in 0..256 {
            perm[256 + i] = perm[i];
        }

        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> u8 {
        self.perm[index & 511]
    }
}

/// 2D Perlin noise generator with output mapped to `[0, 1]`.
///
/// This is classic permutation-table Perlin noise. The raw gradient result
/// lies in roughly `[-0.707, 0.707]`; it is rescaled and shifted into the
/// unit interval so callers can treat samples as normalized weights, the
/// convention every consumer in this workspace relies on.
pub struct Perlin2 {
    perm_table: PermutationTable,
}

impl Perlin2 {
    /// Creates a new Perlin sampler from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// Samples 2D Perlin noise at the given coordinates.
    ///
    /// # Returns
    ///
    /// A value in the range `[0, 1]`.
    #[must_use]
    pub fn sample01(&self, x: f64, y: f64) -> f64 {
        let xi = fast_floor(x);
        let yi = fast_floor(y);
        let xf = x - f64::from(xi);
        let yf = y - f64::from(yi);

        let u = fade(xf);
        let v = fade(yf);

        let xi = (xi & 255) as usize;
        let yi = (yi & 255) as usize;

        let aa = self.perm_table.get(self.perm_table.get(xi) as usize + yi);
        let ab = self.perm_table.get(self.perm_table.get(xi) as usize + yi + 1);
        let ba = self.perm_table.get(self.perm_table.get(xi + 1) as usize + yi);
        let bb = self.perm_table.get(self.perm_table.get(xi + 1) as usize + yi + 1);

        let x1 = lerp(grad(aa, xf, yf), grad(ba, xf - 1.0, yf), u);
        let x2 = lerp(grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0), u);
        let raw = lerp(x1, x2, v);

        // Rescale from [-1/sqrt2, 1/sqrt2] into [0, 1]
        (raw * std::f64::consts::SQRT_2 * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

/// Quintic fade curve.
#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Linear interpolation.
#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Gradient dot product for one of eight corner gradients.
#[inline]
fn grad(hash: u8, x: f64, y: f64) -> f64 {
    match hash & 7 {
        0 => x + y,
        1 => x - y,
        2 => -x + y,
        3 => -x - y,
        4 => x,
        5 => -x,
        6 => y,
        _ => -y,
    }
}

/// Fast floor function.
///
/// Faster than `f64::floor()` for our use case.
#[inline]
fn fast_floor(x: f64) -> i32 {
    let xi = x as i32;
    if x < f64::from(xi) {
        xi - 1
    } else {
        xi
    }
}

/// The noise samplers used by terrain classification, bound to one seed.
pub struct NoiseField {
    perlin: Perlin2,
}

impl NoiseField {
    /// Creates a noise field for the given world seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            perlin: Perlin2::new(seed),
        }
    }

    /// Samples 2D Perlin noise for a world-space column.
    ///
    /// The sample point is `(c + 0.1) / CHUNK_WIDTH * scale + offset` per
    /// axis. The `0.1` bias keeps integer voxel columns off the lattice
    /// points, where the underlying sampler degenerates to a constant.
    ///
    /// # Returns
    ///
    /// A value in the range `[0, 1]`.
    #[must_use]
    pub fn perlin2d(&self, x: f64, z: f64, offset: f64, scale: f64) -> f64 {
        let w = CHUNK_WIDTH as f64;
        self.perlin.sample01(
            (x + 0.1) / w * scale + offset,
            (z + 0.1) / w * scale + offset,
        )
    }

    /// Accumulates `layers` Perlin samples with `scale / layers` per layer.
    ///
    /// The layers are summed without per-layer normalization, so the result
    /// is NOT guaranteed to stay in `[0, 1]`; height-scale callers compensate
    /// with a fixed offset. The per-layer offset resolves to `offset_max`;
    /// `offset_min` is accepted alongside it as the configured range's lower
    /// bound but does not influence the sample. The second axis carries an
    /// extra `+ scale` term.
    #[must_use]
    pub fn layered_perlin2d(
        &self,
        x: f64,
        z: f64,
        offset_min: f64,
        offset_max: f64,
        scale: f64,
        layers: u32,
    ) -> f64 {
        let _ = offset_min;
        let w = CHUNK_WIDTH as f64;
        let scale = scale / f64::from(layers.max(1));

        let mut accumulated = 0.0;
        for _ in 0..layers.max(1) {
            accumulated += self.perlin.sample01(
                (x + 0.1) / w * scale + offset_max,
                (z + 0.1) / w * scale + scale + offset_max,
            );
        }
        accumulated
    }

    /// Tests whether approximated 3D noise at `pos` exceeds `threshold`.
    ///
    /// Six pairwise 2D samples are taken over the axis pairs
    /// (xy, yz, xz, yx, zy, zx) - both orderings of each pair - and averaged.
    /// This is an approximation of 3D noise via combinatorial 2D sampling,
    /// not true 3D Perlin.
    #[must_use]
    pub fn perlin3d_above_threshold(
        &self,
        pos: [f64; 3],
        offset: f64,
        scale: f64,
        threshold: f64,
    ) -> bool {
        let x = (pos[0] + offset + 0.1) * scale;
        let y = (pos[1] + offset + 0.1) * scale;
        let z = (pos[2] + offset + 0.1) * scale;

        let ab = self.perlin.sample01(x, y);
        let bc = self.perlin.sample01(y, z);
        let ac = self.perlin.sample01(x, z);
        let ba = self.perlin.sample01(y, x);
        let cb = self.perlin.sample01(z, y);
        let ca = self.perlin.sample01(z, x);

        (ab + bc + ac + ba + cb + ca) / 6.0 > threshold
    }
}

/// A square heightfield produced by [`diamond_square`].
pub struct HeightField {
    /// Grid side length (`terrain_points + 1`).
    size: usize,
    /// Row-major cell data, indexed `[x][y]` via [`HeightField::get`].
    data: Vec<f64>,
}

impl HeightField {
    /// Grid side length.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the height at grid cell `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[x * self.size + y]
    }

    fn set(&mut self, x: usize, y: usize, value: f64) {
        self.data[x * self.size + y] = value;
    }

    /// Flattens the field with y as the outer axis, the layout the terrain
    /// generator's lookup table uses.
    #[must_use]
    pub fn flatten(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.size * self.size);
        for y in 0..self.size {
            for x in 0..self.size {
                flat.push(self.get(x, y));
            }
        }
        flat
    }
}

/// Generates a `(terrain_points + 1)²` fractal heightfield.
///
/// The four corners are seeded with the world seed; each pass computes
/// square centers (average of four corners plus a random offset in
/// `[-roughness, roughness]`) then diamond centers (average of four
/// neighbors, wrapping at the edges), halving both the side length and
/// `roughness` until the side drops below 2.
///
/// # Panics
///
/// Panics if `terrain_points` is not a power of two.
#[must_use]
pub fn diamond_square(terrain_points: usize, roughness: f64, seed: u64) -> HeightField {
    assert!(
        terrain_points.is_power_of_two(),
        "terrain_points must be a power of two, got {terrain_points}"
    );

    let data_size = terrain_points + 1;
    let mut field = HeightField {
        size: data_size,
        data: vec![0.0; data_size * data_size],
    };

    let corner = seed as f64;
    field.set(0, 0, corner);
    field.set(0, data_size - 1, corner);
    field.set(data_size - 1, 0, corner);
    field.set(data_size - 1, data_size - 1, corner);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut roughness = roughness;
    let mut side_length = data_size - 1;

    while side_length >= 2 {
        let half_side = side_length / 2;

        // Square pass: centers from the four surrounding corners
        for x in (0..data_size - 1).step_by(side_length) {
            for y in (0..data_size - 1).step_by(side_length) {
                let average = (field.get(x, y)
                    + field.get(x + side_length, y)
                    + field.get(x, y + side_length)
                    + field.get(x + side_length, y + side_length))
                    / 4.0;
                let offset = rng.gen::<f64>() * 2.0 * roughness - roughness;
                field.set(x + half_side, y + half_side, average + offset);
            }
        }

        // Diamond pass: staggered centers with edge wrapping
        for x in (0..data_size - 1).step_by(half_side) {
            let mut y = (x + half_side) % side_length;
            while y < data_size - 1 {
                let average = (field.get((x + data_size - half_side) % data_size, y)
                    + field.get((x + half_side) % data_size, y)
                    + field.get(x, (y + half_side) % data_size)
                    + field.get(x, (y + data_size - half_side) % data_size))
                    / 4.0;
                let offset = rng.gen::<f64>() * 2.0 * roughness - roughness;
                let value = average + offset;
                field.set(x, y, value);

                if x == 0 {
                    field.set(data_size - 1, y, value);
                }
                if y == 0 {
                    field.set(x, data_size - 1, value);
                }

                y += side_length;
            }
        }

        side_length /= 2;
        roughness /= 2.0;
    }

    field
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perlin_determinism() {
        let noise1 = NoiseField::new(12345);
        let noise2 = NoiseField::new(12345);

        for i in 0..100 {
            let x = f64::from(i) * 1.7;
            let z = f64::from(i) * 0.9;
            assert_eq!(
                noise1.perlin2d(x, z, 0.0, 50.0),
                noise2.perlin2d(x, z, 0.0, 50.0),
                "Noise should be deterministic"
            );
        }
    }

    #[test]
    fn test_perlin_different_seeds_different_results() {
        let noise1 = NoiseField::new(1);
        let noise2 = NoiseField::new(2);

        let mut differing = 0;
        for i in 0..32 {
            let x = f64::from(i) * 13.0;
            if (noise1.perlin2d(x, x, 0.0, 50.0) - noise2.perlin2d(x, x, 0.0, 50.0)).abs()
                > f64::EPSILON
            {
                differing += 1;
            }
        }
        assert!(differing > 0, "Different seeds should change the field");
    }

    #[test]
    fn test_perlin_range() {
        let noise = NoiseField::new(42);

        for i in 0..10_000 {
            let x = f64::from(i) * 0.37 - 500.0;
            let z = f64::from(i) * 0.53 - 650.0;
            let value = noise.perlin2d(x, z, 0.0, 50.0);

            assert!(
                (0.0..=1.0).contains(&value),
                "Value {value} out of range at ({x}, {z})"
            );
        }
    }

    #[test]
    fn test_layered_is_unnormalized_sum() {
        let noise = NoiseField::new(42);

        // Every layer takes the same sample, so the accumulation is exactly
        // layers times one sample at the composed coordinates.
        let layers = 3;
        let layered = noise.layered_perlin2d(100.0, 100.0, 0.01, 0.1, 50.0, layers);
        assert!(layered >= 0.0);
        assert!(
            layered <= f64::from(layers),
            "Accumulation {layered} exceeds the layer count bound"
        );

        let single = noise.layered_perlin2d(100.0, 100.0, 0.01, 0.1, 50.0, 1);
        // A 3-layer sum at scale/3 is not a normalized version of the
        // single-layer sample.
        assert_ne!(layered, single);
    }

    #[test]
    fn test_perlin3d_threshold_boundaries() {
        let noise = NoiseField::new(42);

        let pos = [10.0, 20.0, 30.0];
        // Any sample average lies in [0, 1], so extreme thresholds are fixed.
        assert!(noise.perlin3d_above_threshold(pos, 0.0, 0.1, -0.1));
        assert!(!noise.perlin3d_above_threshold(pos, 0.0, 0.1, 1.1));
    }

    #[test]
    fn test_perlin3d_determinism() {
        let noise1 = NoiseField::new(7);
        let noise2 = NoiseField::new(7);

        for i in 0..50 {
            let pos = [f64::from(i), f64::from(i * 2), f64::from(i * 3)];
            assert_eq!(
                noise1.perlin3d_above_threshold(pos, 0.5, 0.1, 0.5),
                noise2.perlin3d_above_threshold(pos, 0.5, 0.1, 0.5)
            );
        }
    }

    #[test]
    fn test_diamond_square_size() {
        let field = diamond_square(16, 1.5, 99);
        assert_eq!(field.size(), 17);
        assert_eq!(field.flatten().len(), 17 * 17);
    }

    #[test]
    fn test_diamond_square_corners_equal_seed_with_zero_roughness() {
        let seed = 42;
        let field = diamond_square(8, 0.0, seed);
        let n = field.size() - 1;

        assert_eq!(field.get(0, 0), seed as f64);
        assert_eq!(field.get(0, n), seed as f64);
        assert_eq!(field.get(n, 0), seed as f64);
        assert_eq!(field.get(n, n), seed as f64);
    }

    #[test]
    fn test_diamond_square_zero_roughness_is_flat() {
        // With no random offset every average of equal corners stays equal.
        let field = diamond_square(8, 0.0, 7);
        for x in 0..field.size() {
            for y in 0..field.size() {
                assert_eq!(field.get(x, y), 7.0);
            }
        }
    }

    #[test]
    fn test_diamond_square_determinism() {
        let a = diamond_square(32, 1.5, 1234).flatten();
        let b = diamond_square(32, 1.5, 1234).flatten();
        assert_eq!(a, b, "Heightfields should be reproducible");
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_diamond_square_rejects_non_power_of_two() {
        let _ = diamond_square(12, 1.0, 0);
    }
}
