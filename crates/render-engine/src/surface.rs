//! Render targets.
//!
//! A render target receives one [`ComposedFrame`] per tick and keeps the
//! resulting pixels until the next draw, so capture can read the last frame
//! without drawing again.

use vjmix_common::{VjmixError, VjmixResult};
use vjmix_mixer_model::BlendMode;
use vjmix_playback::{Rgba, TextureId};

use crate::blend::BlendTable;
use crate::compositor::{ChannelPass, ComposedFrame, RenderItem};

/// Cleared background of every frame.
pub const CLEAR_COLOR: Rgba = [0.0, 0.0, 0.0, 1.0];

/// Reads texels from bound textures.
pub trait TextureSampler {
    fn sample(&self, texture: TextureId, u: f32, v: f32) -> Rgba;
}

/// A drawable surface.
pub trait RenderTarget {
    fn size(&self) -> (u32, u32);

    /// Draw a frame, replacing the previous contents.
    fn draw(&mut self, frame: &ComposedFrame, sampler: &dyn TextureSampler) -> VjmixResult<()>;

    /// Pixels of the last drawn frame, row-major.
    fn pixels(&self) -> &[Rgba];

    /// Frames drawn so far.
    fn frames_drawn(&self) -> u64;
}

/// CPU render target.
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
    scratch: Vec<Rgba>,
    table: BlendTable,
    frames_drawn: u64,
}

impl SoftwareSurface {
    pub fn new(width: u32, height: u32) -> VjmixResult<Self> {
        if width == 0 || height == 0 {
            return Err(VjmixError::render(format!(
                "surface size must be non-zero, got {width}x{height}"
            )));
        }
        let len = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            pixels: vec![CLEAR_COLOR; len],
            scratch: vec![[0.0; 4]; len],
            table: BlendTable::default(),
            frames_drawn: 0,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Mean color over the whole surface.
    pub fn average(&self) -> Rgba {
        let mut sum = [0.0f64; 4];
        for px in &self.pixels {
            for (acc, c) in sum.iter_mut().zip(px) {
                *acc += f64::from(*c);
            }
        }
        let n = self.pixels.len().max(1) as f64;
        sum.map(|c| (c / n) as f32)
    }

    /// Last frame as 8-bit RGBA bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|px| px.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }

    /// Use a blend table built with non-default tuning.
    pub fn with_blend_table(mut self, table: BlendTable) -> Self {
        self.table = table;
        self
    }

    fn draw_items(
        target: &mut [Rgba],
        table: &BlendTable,
        width: u32,
        height: u32,
        items: &[RenderItem],
        sampler: &dyn TextureSampler,
    ) {
        for item in items {
            if item.opacity() <= 0.0 {
                continue;
            }
            for (i, dst) in target.iter_mut().enumerate() {
                let x = (i % width as usize) as f32;
                let y = (i / width as usize) as f32;
                let u = (x + 0.5) / width as f32;
                let v = (y + 0.5) / height as f32;
                *dst = match item {
                    RenderItem::Directive(d) => {
                        let src = sampler.sample(d.material.texture, u, v);
                        d.material.operator.apply(src, *dst, d.material.opacity)
                    }
                    RenderItem::Placeholder(p) => {
                        table.get(BlendMode::Normal).apply(p.color, *dst, p.opacity)
                    }
                };
            }
        }
    }

    fn draw_pass(&mut self, pass: &ChannelPass, sampler: &dyn TextureSampler) {
        if pass.blend_mode == BlendMode::Normal {
            Self::draw_items(&mut self.pixels, &self.table, self.width, self.height, &pass.items, sampler);
            return;
        }

        // Non-normal channel modes composite the pass as an isolated group.
        self.scratch.fill([0.0; 4]);
        Self::draw_items(&mut self.scratch, &self.table, self.width, self.height, &pass.items, sampler);
        let operator = self.table.get(pass.blend_mode);
        for (dst, group) in self.pixels.iter_mut().zip(&self.scratch) {
            let alpha = group[3];
            if alpha <= 0.0 {
                continue;
            }
            let straight = [group[0] / alpha, group[1] / alpha, group[2] / alpha, alpha];
            *dst = operator.apply(straight, *dst, 1.0);
        }
    }
}

impl RenderTarget for SoftwareSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw(&mut self, frame: &ComposedFrame, sampler: &dyn TextureSampler) -> VjmixResult<()> {
        self.pixels.fill(CLEAR_COLOR);
        for pass in &frame.passes {
            self.draw_pass(pass, sampler);
        }
        self.frames_drawn += 1;
        Ok(())
    }

    fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}
