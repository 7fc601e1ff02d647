/// Device handles shared by the GPU backends.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

/// A color view the backend can draw into, with its size in pixels.
#[derive(Debug, Clone)]
pub struct TargetView {
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl TargetView {
    pub fn new(view: wgpu::TextureView, width: u32, height: u32) -> Self {
        Self { view, width, height }
    }

    /// Creates an offscreen texture usable as a render target and a sampled texture.
    pub fn create_offscreen(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> (wgpu::Texture, Self) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, Self::new(view, width.max(1), height.max(1)))
    }
}
