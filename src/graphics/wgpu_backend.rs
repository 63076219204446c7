use wgpu::InstanceDescriptor;

use super::{validate_target_size, validate_upload, GraphicsBackend, TextureHandle};
use crate::effect::{EffectPass, ToolUniforms};
use crate::error::{DrawError, DrawResult};

const DRAW_SHADER: &str = include_str!("draw.wgsl");

/// Canvas textures are plain RGBA8: the shader works on straight alpha and
/// writes every channel itself, so no sRGB conversion or blending happens in
/// fixed function.
const CANVAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl WgpuTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

impl TextureHandle for WgpuTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// GPU backend: the tool pass is a fullscreen triangle running `draw.wgsl`.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    /// Bound in place of a missing tool or cursor image.
    placeholder: WgpuTexture,
}

impl WgpuBackend {
    /// Creates a backend on an adapter without a surface.
    ///
    /// Returns `None` if no suitable GPU adapter is available, so tests and
    /// CI machines can fall back to the software backend.
    pub async fn try_new_headless() -> Option<Self> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("drawsource_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .ok()?;

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            "created headless draw backend"
        );

        Some(Self::from_device(device, queue))
    }

    /// Builds the backend on a device the host already owns.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let bind_group_layout = create_draw_bind_group_layout(&device);
        let pipeline = create_draw_pipeline(&device, &bind_group_layout);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tool_uniforms"),
            size: std::mem::size_of::<ToolUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let placeholder = create_texture(&device, 1, 1, "placeholder_image");
        queue.write_texture(
            placeholder.texture.as_image_copy(),
            &[0, 0, 0, 0],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            placeholder,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn write_rgba(&self, texture: &WgpuTexture, rgba: &[u8]) {
        self.queue.write_texture(
            texture.texture.as_image_copy(),
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * texture.width),
                rows_per_image: Some(texture.height),
            },
            texture.texture.size(),
        );
    }

    fn map_readback_buffer_into(
        &self,
        buffer: &wgpu::Buffer,
        mapped_bytes: &mut Vec<u8>,
    ) -> DrawResult<()> {
        mapped_bytes.clear();

        let buffer_slice = buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            if sender.send(result).is_err() {
                tracing::warn!("readback receiver dropped before the buffer was mapped");
            }
        });

        self.device.poll(wgpu::PollType::Wait).map_err(|error| {
            tracing::warn!(%error, "device poll failed during readback");
            DrawError::Readback(error.to_string())
        })?;

        receiver
            .recv()
            .map_err(|error| DrawError::Readback(error.to_string()))?
            .map_err(|error| DrawError::Readback(error.to_string()))?;

        let mapped_range = buffer_slice.get_mapped_range();
        mapped_bytes.extend_from_slice(&mapped_range);
        drop(mapped_range);
        buffer.unmap();
        Ok(())
    }
}

impl GraphicsBackend for WgpuBackend {
    type Texture = WgpuTexture;

    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> DrawResult<WgpuTexture> {
        validate_target_size(width, height, self.max_texture_dimension())?;
        // New textures are zero-initialized by wgpu.
        Ok(create_texture(&self.device, width, height, "canvas_target"))
    }

    fn upload_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> DrawResult<WgpuTexture> {
        validate_target_size(width, height, self.max_texture_dimension())?;
        validate_upload(width, height, rgba)?;
        let texture = create_texture(&self.device, width, height, "uploaded_image");
        self.write_rgba(&texture, rgba);
        Ok(texture)
    }

    fn update_texture(&mut self, texture: &mut WgpuTexture, rgba: &[u8]) -> DrawResult<()> {
        validate_upload(texture.width, texture.height, rgba)?;
        self.write_rgba(texture, rgba);
        Ok(())
    }

    fn clear(&mut self, target: &mut WgpuTexture) -> DrawResult<()> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear_encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn copy_texture(&mut self, source: &WgpuTexture) -> DrawResult<WgpuTexture> {
        let copy = create_texture(&self.device, source.width, source.height, "history_entry");
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("snapshot_encoder"),
            });
        encoder.copy_texture_to_texture(
            source.texture.as_image_copy(),
            copy.texture.as_image_copy(),
            source.texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(copy)
    }

    fn draw_pass(
        &mut self,
        pass: &EffectPass<'_, WgpuTexture>,
        target: &mut WgpuTexture,
    ) -> DrawResult<()> {
        if pass.source.size() != target.size() {
            return Err(DrawError::Pass(format!(
                "source is {}x{} but target is {}x{}",
                pass.source.width, pass.source.height, target.width, target.height
            )));
        }

        let tool_image = pass.tool_image.unwrap_or(&self.placeholder);
        let cursor_image = pass.cursor_image.unwrap_or(&self.placeholder);
        let uniforms = pass.params.uniforms(
            pass.tool_image.map_or((0, 0), TextureHandle::size),
            pass.cursor_image.map_or((0, 0), TextureHandle::size),
        );
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&pass.source.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&tool_image.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&cursor_image.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("draw_encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("draw_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_pixels(&mut self, texture: &WgpuTexture) -> DrawResult<Vec<u8>> {
        let (width, height) = texture.size();
        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            texture.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture.texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let mut mapped = Vec::new();
        self.map_readback_buffer_into(&readback, &mut mapped)?;

        let mut output = Vec::new();
        copy_padded_readback_rows(
            &mapped,
            height,
            unpadded_bytes_per_row,
            padded_bytes_per_row,
            &mut output,
        );
        Ok(output)
    }
}

fn create_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> WgpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: CANVAS_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    WgpuTexture {
        texture,
        view,
        width,
        height,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    }
}

fn create_draw_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("draw_bgl"),
        entries: &[
            texture_entry(0),
            texture_entry(1),
            texture_entry(2),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ToolUniforms>() as u64
                    ),
                },
                count: None,
            },
        ],
    })
}

fn create_draw_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("draw_shader"),
        source: wgpu::ShaderSource::Wgsl(DRAW_SHADER.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("draw_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("draw_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_quad"),
            compilation_options: Default::default(),
            buffers: &[], // Fullscreen triangle, no vertex buffers
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_draw"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: CANVAS_FORMAT,
                // The shader blends against the source texture itself.
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn copy_padded_readback_rows(
    data: &[u8],
    height: u32,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
    output: &mut Vec<u8>,
) {
    let output_size = (unpadded_bytes_per_row * height) as usize;
    output.resize(output_size, 0);

    if padded_bytes_per_row == unpadded_bytes_per_row {
        output.copy_from_slice(&data[..output_size]);
        return;
    }

    for row in 0..height {
        let padded_offset = (row * padded_bytes_per_row) as usize;
        let unpadded_offset = (row * unpadded_bytes_per_row) as usize;
        let row_data = &data[padded_offset..padded_offset + unpadded_bytes_per_row as usize];
        output[unpadded_offset..unpadded_offset + unpadded_bytes_per_row as usize]
            .copy_from_slice(row_data);
    }
}
