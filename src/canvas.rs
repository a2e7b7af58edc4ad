/// A single RGB sample as sent to the pixel controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// The composited output surface, RGBA8, row-major.
///
/// Clips draw into it every tick; the streamer and the preview read it back.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![0u8; width * height * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels_rgba(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self, color: Rgb) {
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
            px[3] = 255;
        }
    }

    /// Color at (x, y); out-of-bounds reads are black.
    pub fn get(&self, x: usize, y: usize) -> Rgb {
        if x >= self.width || y >= self.height {
            return Rgb::BLACK;
        }
        let i = (y * self.width + x) * 4;
        Rgb::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2])
    }

    pub fn set(&mut self, x: usize, y: usize, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) * 4;
        self.pixels[i] = color.r;
        self.pixels[i + 1] = color.g;
        self.pixels[i + 2] = color.b;
        self.pixels[i + 3] = 255;
    }

    /// Stretch an RGBA source over the whole canvas (nearest neighbour) and
    /// blend it in with `alpha` (0 = invisible, 255 = replace).
    pub fn blit_scaled(&mut self, src: &[u8], src_w: usize, src_h: usize, alpha: u8) {
        if alpha == 0 || src_w == 0 || src_h == 0 {
            return;
        }
        if src.len() < src_w.saturating_mul(src_h).saturating_mul(4) {
            return;
        }
        let a = alpha as u32;
        let inv = 255 - a;
        for y in 0..self.height {
            let sy = y * src_h / self.height;
            for x in 0..self.width {
                let sx = x * src_w / self.width;
                let si = (sy * src_w + sx) * 4;
                let di = (y * self.width + x) * 4;
                for c in 0..3 {
                    let s = src[si + c] as u32;
                    let d = self.pixels[di + c] as u32;
                    self.pixels[di + c] = ((s * a + d * inv + 127) / 255) as u8;
                }
                self.pixels[di + 3] = 255;
            }
        }
    }

    /// Filled axis-aligned ellipse centred at (cx, cy) with full size (w, h).
    pub fn fill_ellipse(&mut self, cx: f32, cy: f32, w: f32, h: f32, color: Rgb) {
        let rx = (w * 0.5).max(0.5);
        let ry = (h * 0.5).max(0.5);
        let x0 = (cx - rx).floor().max(0.0) as usize;
        let y0 = (cy - ry).floor().max(0.0) as usize;
        let x1 = ((cx + rx).ceil().max(0.0) as usize).min(self.width);
        let y1 = ((cy + ry).ceil().max(0.0) as usize).min(self.height);
        for y in y0..y1 {
            let dy = (y as f32 + 0.5 - cy) / ry;
            for x in x0..x1 {
                let dx = (x as f32 + 0.5 - cx) / rx;
                if dx * dx + dy * dy <= 1.0 {
                    self.set(x, y, color);
                }
            }
        }
    }

    /// Copy out a `w`x`h` region starting at (x, y), clipped to the canvas.
    pub fn grab(&self, x: usize, y: usize, w: usize, h: usize) -> Grab {
        let mut samples = Vec::with_capacity(w * h);
        for gy in 0..h {
            for gx in 0..w {
                samples.push(self.get(x + gx, y + gy));
            }
        }
        Grab {
            width: w,
            height: h,
            samples,
        }
    }
}

/// A captured screen region, row-major: sample `(x, y)` lives at `x + y * width`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grab {
    pub width: usize,
    pub height: usize,
    pub samples: Vec<Rgb>,
}

impl Grab {
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> Rgb) -> Self {
        let mut samples = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            samples,
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb {
        if x >= self.width || y >= self.height {
            return Rgb::BLACK;
        }
        self.samples[y * self.width + x]
    }
}
