use std::sync::mpsc;

use crate::error::LaminaError;
use crate::target::RenderTarget;

/// Reads a single-sample texture back as tightly packed bytes (one
/// `block_copy_size` per pixel, rows in top-to-bottom order).
///
/// Blocks until the copy completes. Intended for screenshots, tests and
/// frame export, not per-frame streaming.
pub fn read_texture_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<Vec<u8>, LaminaError> {
    let Some(bytes_per_pixel) = texture.format().block_copy_size(None) else {
        return Err(LaminaError::InvalidArgument(format!(
            "texture format {:?} has no fixed copy size",
            texture.format()
        )));
    };
    if bytes_per_pixel != 4 {
        return Err(LaminaError::InvalidArgument(format!(
            "expected a 4-byte-per-pixel color format, got {:?}",
            texture.format()
        )));
    }

    let width = texture.width();
    let height = texture.height();
    let bytes_per_row = bytes_per_pixel * width;
    // wgpu requires copy rows aligned to 256 bytes.
    let padded_bytes_per_row = (bytes_per_row + 255) & !255;
    let buffer_size = u64::from(padded_bytes_per_row) * u64::from(height);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lamina readback buffer"),
        size: buffer_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("lamina readback encoder"),
    });

    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    queue.submit(Some(encoder.finish()));

    let buffer_slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::PollType::wait_indefinitely());

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            return Err(LaminaError::ResourceExhausted(format!(
                "readback map failed: {err}"
            )));
        }
        Err(_) => {
            return Err(LaminaError::ResourceExhausted(
                "readback map callback dropped".into(),
            ));
        }
    }

    let data = buffer_slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((bytes_per_row * height) as usize);
    for row in 0..height {
        let start = (row * padded_bytes_per_row) as usize;
        pixels.extend_from_slice(&data[start..start + bytes_per_row as usize]);
    }
    drop(data);
    buffer.unmap();

    Ok(pixels)
}

/// Reads the resolved color attachment of `target` back as tightly packed
/// RGBA bytes.
pub fn read_target_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    target: &RenderTarget,
) -> Result<Vec<u8>, LaminaError> {
    let Some(color) = target.color() else {
        return Err(LaminaError::UseAfterDestroy);
    };
    read_texture_rgba(device, queue, color.texture())
}
