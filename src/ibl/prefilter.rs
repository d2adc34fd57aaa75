//! Pre-filtered environment map generator for specular IBL.
//!
//! Generates mip levels of a cubemap where each level represents
//! increasing roughness, using importance-sampled GGX convolution over
//! linear floating-point radiance.

use std::f32::consts::PI;

/// Pre-filter generator for environment maps.
pub struct PrefilterGenerator {
    /// Number of samples for convolution.
    sample_count: u32,
}

impl Default for PrefilterGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefilterGenerator {
    /// Create a new prefilter generator with default settings.
    pub fn new() -> Self {
        Self { sample_count: 32 }
    }

    /// Set the number of samples for convolution.
    pub fn with_samples(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Generate a prefiltered environment mip chain from source faces.
    ///
    /// `source_faces` hold linear RGB f32 data at `source_size`. The
    /// output chain starts at `base_size`; mip `m` has roughness
    /// `m / (mip_levels - 1)`, so mip 0 is a mirror and the last mip an
    /// approximately uniform irradiance blur.
    pub fn generate(
        &self,
        source_faces: &[Vec<f32>; 6],
        source_size: u32,
        base_size: u32,
        mip_levels: u32,
    ) -> Vec<[Vec<f32>; 6]> {
        let mut result = Vec::with_capacity(mip_levels as usize);

        for mip in 0..mip_levels {
            let mip_size = (base_size >> mip).max(1);
            let roughness = mip as f32 / (mip_levels - 1).max(1) as f32;

            let mut mip_faces: [Vec<f32>; 6] = Default::default();
            for (face, out) in mip_faces.iter_mut().enumerate() {
                *out = self.convolve_face(source_faces, source_size, face, mip_size, roughness);
            }
            result.push(mip_faces);
        }

        result
    }

    /// Convolve a single face of the cubemap for a given roughness.
    fn convolve_face(
        &self,
        source_faces: &[Vec<f32>; 6],
        source_size: u32,
        face: usize,
        output_size: u32,
        roughness: f32,
    ) -> Vec<f32> {
        let mut output = vec![0.0f32; (output_size * output_size * 3) as usize];

        for y in 0..output_size {
            for x in 0..output_size {
                let dir = texel_to_direction(face, x, y, output_size);

                let color = if roughness < 0.01 {
                    // Roughness ~0: direct sample, mirror reflection.
                    sample_cubemap(source_faces, source_size, dir)
                } else {
                    self.convolve_ggx(source_faces, source_size, dir, roughness)
                };

                let idx = ((y * output_size + x) * 3) as usize;
                output[idx] = color[0];
                output[idx + 1] = color[1];
                output[idx + 2] = color[2];
            }
        }

        output
    }

    /// Importance-sample the GGX distribution around a normal direction.
    fn convolve_ggx(
        &self,
        source_faces: &[Vec<f32>; 6],
        source_size: u32,
        n: [f32; 3],
        roughness: f32,
    ) -> [f32; 3] {
        let n = normalize(n);
        // Split-sum approximation: view = reflection = normal.
        let v = n;

        let mut total_color = [0.0f32; 3];
        let mut total_weight = 0.0f32;
        let alpha = roughness * roughness;

        for i in 0..self.sample_count {
            let xi = hammersley(i, self.sample_count);
            let h = importance_sample_ggx_dir(xi, n, alpha);
            let l = normalize(reflect(v, h));

            let n_dot_l = dot(n, l).max(0.0);
            if n_dot_l > 0.0 {
                let sample = sample_cubemap(source_faces, source_size, l);
                total_color[0] += sample[0] * n_dot_l;
                total_color[1] += sample[1] * n_dot_l;
                total_color[2] += sample[2] * n_dot_l;
                total_weight += n_dot_l;
            }
        }

        if total_weight > 0.0 {
            [
                total_color[0] / total_weight,
                total_color[1] / total_weight,
                total_color[2] / total_weight,
            ]
        } else {
            sample_cubemap(source_faces, source_size, n)
        }
    }
}

// ============ Helper functions ============

/// Convert cubemap face texel to world direction.
pub(crate) fn texel_to_direction(face: usize, x: u32, y: u32, size: u32) -> [f32; 3] {
    // Map texel center to [-1, 1]
    let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
    let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;

    match face {
        0 => [1.0, -v, -u],  // +X
        1 => [-1.0, -v, u],  // -X
        2 => [u, 1.0, v],    // +Y
        3 => [u, -1.0, -v],  // -Y
        4 => [u, -v, 1.0],   // +Z
        5 => [-u, -v, -1.0], // -Z
        _ => [0.0, 0.0, 1.0],
    }
}

/// Sample cubemap at a given direction (nearest texel).
pub(crate) fn sample_cubemap(faces: &[Vec<f32>; 6], size: u32, dir: [f32; 3]) -> [f32; 3] {
    let dir = normalize(dir);
    let abs_dir = [dir[0].abs(), dir[1].abs(), dir[2].abs()];

    // Dominant axis selects the face.
    let (face, u, v) = if abs_dir[0] >= abs_dir[1] && abs_dir[0] >= abs_dir[2] {
        if dir[0] > 0.0 {
            (0, -dir[2] / abs_dir[0], -dir[1] / abs_dir[0])
        } else {
            (1, dir[2] / abs_dir[0], -dir[1] / abs_dir[0])
        }
    } else if abs_dir[1] >= abs_dir[0] && abs_dir[1] >= abs_dir[2] {
        if dir[1] > 0.0 {
            (2, dir[0] / abs_dir[1], dir[2] / abs_dir[1])
        } else {
            (3, dir[0] / abs_dir[1], -dir[2] / abs_dir[1])
        }
    } else if dir[2] > 0.0 {
        (4, dir[0] / abs_dir[2], -dir[1] / abs_dir[2])
    } else {
        (5, -dir[0] / abs_dir[2], -dir[1] / abs_dir[2])
    };

    let x = ((u * 0.5 + 0.5) * size as f32).clamp(0.0, size as f32 - 1.0) as u32;
    let y = ((v * 0.5 + 0.5) * size as f32).clamp(0.0, size as f32 - 1.0) as u32;

    let idx = ((y * size + x) * 3) as usize;
    let data = &faces[face];

    if idx + 2 < data.len() {
        [data[idx], data[idx + 1], data[idx + 2]]
    } else {
        [0.0, 0.0, 0.0]
    }
}

/// Hammersley sequence for quasi-random sampling.
pub(crate) fn hammersley(i: u32, n: u32) -> [f32; 2] {
    [i as f32 / n as f32, radical_inverse_vdc(i)]
}

/// Van der Corput radical inverse.
fn radical_inverse_vdc(mut bits: u32) -> f32 {
    bits = (bits << 16) | (bits >> 16);
    bits = ((bits & 0x55555555) << 1) | ((bits & 0xAAAAAAAA) >> 1);
    bits = ((bits & 0x33333333) << 2) | ((bits & 0xCCCCCCCC) >> 2);
    bits = ((bits & 0x0F0F0F0F) << 4) | ((bits & 0xF0F0F0F0) >> 4);
    bits = ((bits & 0x00FF00FF) << 8) | ((bits & 0xFF00FF00) >> 8);
    bits as f32 * 2.3283064365386963e-10
}

/// Importance sample GGX distribution to get a world-space half vector.
fn importance_sample_ggx_dir(xi: [f32; 2], n: [f32; 3], alpha: f32) -> [f32; 3] {
    let a2 = alpha * alpha;

    let phi = 2.0 * PI * xi[0];
    let cos_theta = ((1.0 - xi[1]) / (1.0 + (a2 - 1.0) * xi[1])).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

    let h_tangent = [phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta];

    let up = if n[1].abs() < 0.999 {
        [0.0, 1.0, 0.0]
    } else {
        [1.0, 0.0, 0.0]
    };
    let tangent = normalize(cross(up, n));
    let bitangent = cross(n, tangent);

    [
        tangent[0] * h_tangent[0] + bitangent[0] * h_tangent[1] + n[0] * h_tangent[2],
        tangent[1] * h_tangent[0] + bitangent[1] * h_tangent[1] + n[1] * h_tangent[2],
        tangent[2] * h_tangent[0] + bitangent[2] * h_tangent[1] + n[2] * h_tangent[2],
    ]
}

fn reflect(v: [f32; 3], n: [f32; 3]) -> [f32; 3] {
    let d = 2.0 * dot(v, n);
    [d * n[0] - v[0], d * n[1] - v[1], d * n[2] - v[2]]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 0.0001 {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Faces where +Y is bright and everything else dim.
    fn sky_faces(size: u32) -> [Vec<f32>; 6] {
        let mut faces: [Vec<f32>; 6] = Default::default();
        for (face, data) in faces.iter_mut().enumerate() {
            let value = if face == 2 { 4.0 } else { 0.1 };
            *data = vec![value; (size * size * 3) as usize];
        }
        faces
    }

    #[test]
    fn test_mip_zero_reproduces_source() {
        let size = 16;
        let faces = sky_faces(size);
        let mips = PrefilterGenerator::new().generate(&faces, size, size, 5);

        assert_eq!(mips.len(), 5);
        // Roughness 0: every +Y texel matches the source exactly.
        for (a, b) in mips[0][2].iter().zip(faces[2].iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_last_mip_approaches_uniform_blur() {
        let size = 16;
        let faces = sky_faces(size);
        let mips = PrefilterGenerator::new()
            .with_samples(128)
            .generate(&faces, size, size, 5);

        let last = &mips[4];
        // At roughness 1 the +Y face still integrates mostly bright sky,
        // but well below the unblurred peak; the -Y face picks up energy
        // from the bright hemisphere and rises above its source value.
        let top_avg = last[2].iter().sum::<f32>() / last[2].len() as f32;
        let bottom_avg = last[3].iter().sum::<f32>() / last[3].len() as f32;
        assert!(top_avg < 4.0);
        assert!(top_avg > 0.1);
        assert!(bottom_avg > 0.1);
    }

    #[test]
    fn test_texel_direction_roundtrip() {
        // The center texel of each face must map back onto that face.
        let size = 9;
        for face in 0..6usize {
            let dir = texel_to_direction(face, size / 2, size / 2, size);
            let faces = {
                let mut f: [Vec<f32>; 6] = Default::default();
                for (i, data) in f.iter_mut().enumerate() {
                    *data = vec![i as f32; (size * size * 3) as usize];
                }
                f
            };
            let sampled = sample_cubemap(&faces, size, dir);
            assert_eq!(sampled[0], face as f32);
        }
    }
}
