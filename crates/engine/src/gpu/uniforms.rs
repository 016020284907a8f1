use bytemuck::{Pod, Zeroable};

/// Byte size of the parameter block every shader binds at group 0, binding 0.
pub const UNIFORM_SIZE: u64 = 32;

/// Host-side mirror of the WGSL `Params` struct.
///
/// Field order and padding are a contract with every compiled shader:
/// `time@0, pad@4, resolution@8, pointer@16, delta_time@24, pad@28`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct UniformParams {
    pub time: f32,
    pub _pad0: f32,
    pub resolution: [f32; 2],
    pub pointer: [f32; 2],
    pub delta_time: f32,
    pub _pad1: f32,
}

const _: () = assert!(std::mem::size_of::<UniformParams>() as u64 == UNIFORM_SIZE);

impl UniformParams {
    pub fn new(time: f32, delta_time: f32, resolution: [f32; 2], pointer: [f32; 2]) -> Self {
        Self {
            time,
            resolution,
            pointer,
            delta_time,
            ..Self::default()
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::bytes_of(self));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[offset..offset + 4]);
        f32::from_le_bytes(raw)
    }

    #[test]
    fn layout_matches_shader_offsets() {
        let params = UniformParams::new(1.5, 0.25, [1600.0, 1200.0], [200.0, 100.0]);
        let bytes = bytemuck::bytes_of(&params);
        assert_eq!(bytes.len(), 32);
        if cfg!(target_endian = "little") {
            assert_eq!(f32_at(bytes, 0), 1.5);
            assert_eq!(f32_at(bytes, 4), 0.0);
            assert_eq!(f32_at(bytes, 8), 1600.0);
            assert_eq!(f32_at(bytes, 12), 1200.0);
            assert_eq!(f32_at(bytes, 16), 200.0);
            assert_eq!(f32_at(bytes, 20), 100.0);
            assert_eq!(f32_at(bytes, 24), 0.25);
            assert_eq!(f32_at(bytes, 28), 0.0);
        }
    }
}
