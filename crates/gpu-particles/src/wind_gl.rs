//! Shader-driven wind particle simulator.
//!
//! Particle positions live in a pair of RGBA8 state textures (see
//! [`crate::encoding`]). Each [`WindGl::draw`] encodes, in order:
//!
//! 1. screen pass: the previous frame (background) faded by
//!    `fade_opacity` into the screen texture, then every particle as a
//!    1px point on top;
//! 2. output pass: the screen texture alpha-blended onto a cleared output
//!    texture;
//! 3. update pass: every state texel advected through the wind texture
//!    into the other state texture.
//!
//! Background/screen and the two state textures are swapped once the
//! frame is submitted.

use std::borrow::Cow;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use field_renderer::ramp::RAMP_SIDE;
use field_renderer::{ColorRamp, PaletteConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

use crate::context::GpuContext;
use crate::encoding::{particle_resolution, random_state};
use crate::error::{GpuError, GpuResult};
use crate::textures::{ScalarTexture, WindTexture};

const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Parameter code of the wind field itself.
pub const WIND_PARAMETER: &str = "WIND";

const QUAD_VERTICES: [f32; 12] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0];

/// Simulation tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindGlOptions {
    /// How fast trails fade each frame.
    pub fade_opacity: f32,
    /// How fast particles move.
    pub speed_factor: f32,
    /// Chance per frame that a particle restarts at a random position.
    pub drop_rate: f32,
    /// Extra drop chance scaled by relative speed.
    pub drop_rate_bump: f32,
}

impl Default for WindGlOptions {
    fn default() -> Self {
        Self {
            fade_opacity: 0.998,
            speed_factor: 0.2,
            drop_rate: 0.003,
            drop_rate_bump: 0.01,
        }
    }
}

/// What the draw pass colors particles by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Speed,
    Scalar,
}

impl ColorMode {
    /// Scalar coloring only for a non-wind parameter with a scalar field.
    pub fn for_parameter(parameter: &str, has_scalar: bool) -> Self {
        if parameter != WIND_PARAMETER && has_scalar {
            ColorMode::Scalar
        } else {
            ColorMode::Speed
        }
    }

    fn as_uniform(self) -> u32 {
        match self {
            ColorMode::Speed => 0,
            ColorMode::Scalar => 1,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct ScreenUniforms {
    opacity: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct DrawUniforms {
    wind_min: [f32; 2],
    wind_max: [f32; 2],
    particles_res: f32,
    color_mode: u32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct UpdateUniforms {
    wind_res: [f32; 2],
    wind_min: [f32; 2],
    wind_max: [f32; 2],
    rand_seed: f32,
    speed_factor: f32,
    drop_rate: f32,
    drop_rate_bump: f32,
    _pad: [f32; 2],
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

fn create_texture(
    ctx: &GpuContext,
    label: &str,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> GpuTexture {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: STATE_FORMAT,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        width,
        height,
    }
}

fn upload_rgba(ctx: &GpuContext, target: &GpuTexture, pixels: &[u8]) {
    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(target.width * 4),
            rows_per_image: Some(target.height),
        },
        wgpu::Extent3d {
            width: target.width,
            height: target.height,
            depth_or_array_layers: 1,
        },
    );
}

fn sampled_texture(
    ctx: &GpuContext,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> GpuTexture {
    let texture = create_texture(
        ctx,
        label,
        width,
        height,
        wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    );
    upload_rgba(ctx, &texture, pixels);
    texture
}

fn render_texture(ctx: &GpuContext, label: &str, width: u32, height: u32) -> GpuTexture {
    create_texture(
        ctx,
        label,
        width,
        height,
        wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
    )
}

fn align_to(value: u32, alignment: u32) -> u32 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Compile WGSL, turning validation errors into [`GpuError::ShaderCompile`].
fn compile(ctx: &GpuContext, program: &str, source: String) -> GpuResult<wgpu::ShaderModule> {
    ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
    });
    match pollster::block_on(ctx.device.pop_error_scope()) {
        Some(err) => Err(GpuError::ShaderCompile {
            program: program.to_string(),
            message: err.to_string(),
        }),
        None => Ok(module),
    }
}

/// Run a pipeline constructor, turning validation errors into
/// [`GpuError::ProgramLink`].
fn link<T>(ctx: &GpuContext, program: &str, create: impl FnOnce() -> T) -> GpuResult<T> {
    ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = create();
    match pollster::block_on(ctx.device.pop_error_scope()) {
        Some(err) => Err(GpuError::ProgramLink {
            program: program.to_string(),
            message: err.to_string(),
        }),
        None => Ok(pipeline),
    }
}

fn texture_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn quad_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
    wgpu::VertexBufferLayout {
        array_stride: 8,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

/// Source-over with straight alpha, applied to color and alpha alike.
const SRC_ALPHA_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

struct Programs {
    screen_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    update_layout: wgpu::BindGroupLayout,
    screen: wgpu::RenderPipeline,
    output: wgpu::RenderPipeline,
    draw: wgpu::RenderPipeline,
    update: wgpu::RenderPipeline,
}

impl Programs {
    fn new(ctx: &GpuContext) -> GpuResult<Self> {
        let quad = include_str!("shaders/quad.wgsl");
        let particle = include_str!("shaders/particle.wgsl");
        let draw_module = compile(
            ctx,
            "draw",
            format!("{particle}\n{}", include_str!("shaders/draw.wgsl")),
        )?;
        let screen_module = compile(
            ctx,
            "screen",
            format!("{quad}\n{}", include_str!("shaders/screen.wgsl")),
        )?;
        let update_module = compile(
            ctx,
            "update",
            format!("{quad}\n{particle}\n{}", include_str!("shaders/update.wgsl")),
        )?;

        let fragment = wgpu::ShaderStages::FRAGMENT;
        let both = wgpu::ShaderStages::VERTEX_FRAGMENT;

        let screen_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("screen-bgl"),
            entries: &[texture_entry(0, fragment), uniform_entry(1, fragment)],
        });
        let draw_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw-bgl"),
            entries: &[
                uniform_entry(0, both),
                texture_entry(1, both),
                texture_entry(2, fragment),
                texture_entry(3, fragment),
                texture_entry(4, fragment),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: fragment,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let update_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("update-bgl"),
            entries: &[
                uniform_entry(0, fragment),
                texture_entry(1, fragment),
                texture_entry(2, fragment),
            ],
        });

        let quad_pipeline = |program: &str,
                             module: &wgpu::ShaderModule,
                             entry_point: &str,
                             layout: &wgpu::BindGroupLayout,
                             blend: Option<wgpu::BlendState>| {
            let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(program),
                bind_group_layouts: &[layout],
                push_constant_ranges: &[],
            });
            link(ctx, program, || {
                ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(program),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module,
                        entry_point: Some("vs_quad"),
                        buffers: &[quad_layout()],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module,
                        entry_point: Some(entry_point),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: STATE_FORMAT,
                            blend,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
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
            })
        };

        let screen = quad_pipeline("screen", &screen_module, "fs_screen", &screen_layout, None)?;
        let output = quad_pipeline(
            "output",
            &screen_module,
            "fs_screen",
            &screen_layout,
            Some(SRC_ALPHA_BLEND),
        )?;
        let update = quad_pipeline("update", &update_module, "fs_update", &update_layout, None)?;

        let draw_pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("draw"),
            bind_group_layouts: &[&draw_layout],
            push_constant_ranges: &[],
        });
        const INDEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32];
        let draw = link(ctx, "draw", || {
            ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("draw"),
                layout: Some(&draw_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &draw_module,
                    entry_point: Some("vs_draw"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: 4,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &INDEX_ATTRIBUTES,
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &draw_module,
                    entry_point: Some("fs_draw"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: STATE_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::PointList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        Ok(Self {
            screen_layout,
            draw_layout,
            update_layout,
            screen,
            output,
            draw,
            update,
        })
    }
}

/// Ping-pong particle state.
struct ParticleState {
    textures: [GpuTexture; 2],
    current: usize,
    resolution: u32,
    count: u32,
    index_buffer: wgpu::Buffer,
}

struct WindField {
    texture: GpuTexture,
    u_min: f32,
    u_max: f32,
    v_min: f32,
    v_max: f32,
}

pub struct WindGl {
    ctx: Arc<GpuContext>,
    programs: Programs,
    options: WindGlOptions,
    quad_buffer: wgpu::Buffer,
    fade_uniform: wgpu::Buffer,
    opaque_uniform: wgpu::Buffer,
    draw_uniform: wgpu::Buffer,
    update_uniform: wgpu::Buffer,
    linear_sampler: wgpu::Sampler,
    width: u32,
    height: u32,
    background: GpuTexture,
    screen: GpuTexture,
    output: GpuTexture,
    state: Option<ParticleState>,
    wind: Option<WindField>,
    scalar: Option<GpuTexture>,
    /// Bound in place of a missing scalar field.
    empty_scalar: GpuTexture,
    color_ramp: GpuTexture,
    color_mode: ColorMode,
    rng: StdRng,
}

impl WindGl {
    /// Compile the programs and allocate `width × height` screen textures.
    pub fn new(ctx: Arc<GpuContext>, width: u32, height: u32) -> GpuResult<Self> {
        let programs = Programs::new(&ctx)?;

        let quad_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad-vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform = |label: &str, size: usize| {
            ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let fade_uniform = uniform("fade-uniforms", std::mem::size_of::<ScreenUniforms>());
        let opaque_uniform = uniform("opaque-uniforms", std::mem::size_of::<ScreenUniforms>());
        let draw_uniform = uniform("draw-uniforms", std::mem::size_of::<DrawUniforms>());
        let update_uniform = uniform("update-uniforms", std::mem::size_of::<UpdateUniforms>());

        let linear_sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("field-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let (width, height) = clamp_size(&ctx, width, height);
        let background = render_texture(&ctx, "background", width, height);
        let screen = render_texture(&ctx, "screen", width, height);
        let output = render_texture(&ctx, "output", width, height);
        let empty_scalar = sampled_texture(&ctx, "empty-scalar", 1, 1, &[0, 0, 0, 0]);
        let color_ramp = sampled_texture(
            &ctx,
            "color-ramp",
            RAMP_SIDE,
            RAMP_SIDE,
            ColorRamp::default_gradient().as_bytes(),
        );

        info!(width, height, "wind simulator ready");

        Ok(Self {
            ctx,
            programs,
            options: WindGlOptions::default(),
            quad_buffer,
            fade_uniform,
            opaque_uniform,
            draw_uniform,
            update_uniform,
            linear_sampler,
            width,
            height,
            background,
            screen,
            output,
            state: None,
            wind: None,
            scalar: None,
            empty_scalar,
            color_ramp,
            color_mode: ColorMode::Speed,
            rng: StdRng::from_entropy(),
        })
    }

    /// Reproducible particle seeding and drops.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Restart the random source and reseed the current particle count.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        if let Some(count) = self.state.as_ref().map(|s| s.count) {
            self.set_num_particles(count as usize);
        }
    }

    pub fn options(&self) -> &WindGlOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: WindGlOptions) {
        self.options = options;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reallocate the screen textures; accumulated trails are dropped.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = clamp_size(&self.ctx, width, height);
        self.width = width;
        self.height = height;
        self.background = render_texture(&self.ctx, "background", width, height);
        self.screen = render_texture(&self.ctx, "screen", width, height);
        self.output = render_texture(&self.ctx, "output", width, height);
        debug!(width, height, "resized wind simulator");
    }

    /// Particle count after rounding up to a square state texture.
    pub fn num_particles(&self) -> u32 {
        self.state.as_ref().map_or(0, |s| s.count)
    }

    pub fn particle_state_resolution(&self) -> u32 {
        self.state.as_ref().map_or(0, |s| s.resolution)
    }

    /// Reseed `n` particles (rounded up to a perfect square) at random
    /// positions.
    pub fn set_num_particles(&mut self, n: usize) {
        let resolution = particle_resolution(n);
        let count = resolution * resolution;
        let pixels = random_state(resolution, &mut self.rng);

        let textures = [
            render_texture(&self.ctx, "particle-state-0", resolution, resolution),
            render_texture(&self.ctx, "particle-state-1", resolution, resolution),
        ];
        for texture in &textures {
            upload_rgba(&self.ctx, texture, &pixels);
        }

        let indices: Vec<f32> = (0..count).map(|i| i as f32).collect();
        let index_buffer = self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle-indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        self.state = Some(ParticleState {
            textures,
            current: 0,
            resolution,
            count,
            index_buffer,
        });
        debug!(requested = n, count, resolution, "seeded particles");
    }

    pub fn set_wind(&mut self, wind: &WindTexture) {
        let texture = sampled_texture(&self.ctx, "wind", wind.width, wind.height, &wind.pixels);
        self.wind = Some(WindField {
            texture,
            u_min: wind.u_min,
            u_max: wind.u_max,
            v_min: wind.v_min,
            v_max: wind.v_max,
        });
    }

    /// Upload a co-registered scalar field and color by it when
    /// `parameter` calls for it.
    pub fn set_scalar(&mut self, scalar: &ScalarTexture, parameter: &str, palettes: &PaletteConfig) {
        self.scalar = Some(sampled_texture(
            &self.ctx,
            "scalar",
            scalar.width,
            scalar.height,
            &scalar.pixels,
        ));
        self.set_color_ramp_for(parameter, palettes);
        self.set_color_mode(parameter);
    }

    pub fn set_color_ramp(&mut self, ramp: &ColorRamp) {
        upload_rgba(&self.ctx, &self.color_ramp, ramp.as_bytes());
    }

    /// Stepped ramp of a configured parameter, the default gradient
    /// otherwise.
    pub fn set_color_ramp_for(&mut self, parameter: &str, palettes: &PaletteConfig) {
        let ramp = match palettes.ranges(parameter) {
            Some(ranges) => ColorRamp::from_ranges(ranges),
            None => {
                warn!(parameter, "no palette for parameter, using default ramp");
                ColorRamp::default_gradient()
            }
        };
        self.set_color_ramp(&ramp);
    }

    pub fn set_color_mode(&mut self, parameter: &str) {
        self.color_mode = ColorMode::for_parameter(parameter, self.scalar.is_some());
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Render one frame and advance the simulation. Does nothing until a
    /// wind field and particles are set.
    pub fn draw(&mut self) {
        let (Some(state), Some(wind)) = (self.state.as_mut(), self.wind.as_ref()) else {
            return;
        };
        let ctx = &self.ctx;
        let programs = &self.programs;

        let screen_uniforms = |opacity: f32| ScreenUniforms {
            opacity,
            _pad: [0.0; 3],
        };
        ctx.queue.write_buffer(
            &self.fade_uniform,
            0,
            bytemuck::bytes_of(&screen_uniforms(self.options.fade_opacity)),
        );
        ctx.queue.write_buffer(&self.opaque_uniform, 0, bytemuck::bytes_of(&screen_uniforms(1.0)));
        ctx.queue.write_buffer(
            &self.draw_uniform,
            0,
            bytemuck::bytes_of(&DrawUniforms {
                wind_min: [wind.u_min, wind.v_min],
                wind_max: [wind.u_max, wind.v_max],
                particles_res: state.resolution as f32,
                color_mode: self.color_mode.as_uniform(),
                _pad: [0.0; 2],
            }),
        );
        ctx.queue.write_buffer(
            &self.update_uniform,
            0,
            bytemuck::bytes_of(&UpdateUniforms {
                wind_res: [wind.texture.width as f32, wind.texture.height as f32],
                wind_min: [wind.u_min, wind.v_min],
                wind_max: [wind.u_max, wind.v_max],
                rand_seed: self.rng.gen::<f32>(),
                speed_factor: self.options.speed_factor,
                drop_rate: self.options.drop_rate,
                drop_rate_bump: self.options.drop_rate_bump,
                _pad: [0.0; 2],
            }),
        );

        let screen_group = |texture: &GpuTexture, uniform: &wgpu::Buffer| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("screen-bind-group"),
                layout: &programs.screen_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: uniform.as_entire_binding(),
                    },
                ],
            })
        };
        let fade_group = screen_group(&self.background, &self.fade_uniform);
        let output_group = screen_group(&self.screen, &self.opaque_uniform);

        let current = &state.textures[state.current];
        let next = &state.textures[1 - state.current];
        let scalar = self.scalar.as_ref().unwrap_or(&self.empty_scalar);
        let draw_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw-bind-group"),
            layout: &programs.draw_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.draw_uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&current.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&wind.texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&scalar.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&self.color_ramp.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&self.linear_sampler),
                },
            ],
        });
        let update_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("update-bind-group"),
            layout: &programs.update_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.update_uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&current.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&wind.texture.view),
                },
            ],
        });

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("wind-frame-encoder"),
        });

        {
            let mut pass = begin_pass(
                &mut encoder,
                "screen-pass",
                &self.screen,
                wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            );
            pass.set_pipeline(&programs.screen);
            pass.set_bind_group(0, &fade_group, &[]);
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            pass.draw(0..6, 0..1);

            pass.set_pipeline(&programs.draw);
            pass.set_bind_group(0, &draw_group, &[]);
            pass.set_vertex_buffer(0, state.index_buffer.slice(..));
            pass.draw(0..state.count, 0..1);
        }
        {
            let mut pass = begin_pass(
                &mut encoder,
                "output-pass",
                &self.output,
                wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            );
            pass.set_pipeline(&programs.output);
            pass.set_bind_group(0, &output_group, &[]);
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            pass.draw(0..6, 0..1);
        }
        {
            let mut pass = begin_pass(&mut encoder, "update-pass", next, wgpu::LoadOp::Load);
            pass.set_pipeline(&programs.update);
            pass.set_bind_group(0, &update_group, &[]);
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            pass.draw(0..6, 0..1);
        }

        ctx.queue.submit(Some(encoder.finish()));

        std::mem::swap(&mut self.background, &mut self.screen);
        state.current = 1 - state.current;
    }

    /// RGBA bytes of the last composited frame, row-major from the top.
    pub fn read_frame(&self) -> GpuResult<Vec<u8>> {
        read_texture(&self.ctx, &self.output)
    }

    /// RGBA bytes of the current particle state texture.
    pub fn read_particle_state(&self) -> GpuResult<Vec<u8>> {
        match &self.state {
            Some(state) => read_texture(&self.ctx, &state.textures[state.current]),
            None => Ok(Vec::new()),
        }
    }
}

/// Clamp a requested size to `1..=max_texture_side`.
fn clamp_size(ctx: &GpuContext, width: u32, height: u32) -> (u32, u32) {
    let max = ctx.max_texture_side();
    let clamped = (width.clamp(1, max), height.clamp(1, max));
    if clamped != (width, height) {
        warn!(width, height, max, "clamped simulator size to device limits");
    }
    clamped
}

fn begin_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    label: &str,
    target: &'a GpuTexture,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &target.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

fn read_texture(ctx: &GpuContext, source: &GpuTexture) -> GpuResult<Vec<u8>> {
    let row_bytes = source.width * 4;
    let padded_bpr = align_to(row_bytes, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

    let readback = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback-buffer"),
        size: (padded_bpr * source.height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback-encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &source.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(source.height),
            },
        },
        wgpu::Extent3d {
            width: source.width,
            height: source.height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(Some(encoder.finish()));

    let slice = readback.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |r| {
        let _ = tx.send(r);
    });
    ctx.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|e| GpuError::Readback(e.to_string()))?
        .map_err(|e| GpuError::Readback(e.to_string()))?;

    let mut pixels = Vec::with_capacity((row_bytes * source.height) as usize);
    {
        let data = slice.get_mapped_range();
        for row in data.chunks_exact(padded_bpr as usize) {
            pixels.extend_from_slice(&row[..row_bytes as usize]);
        }
    }
    readback.unmap();
    Ok(pixels)
}
