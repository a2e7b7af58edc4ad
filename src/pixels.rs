use crate::canvas::{Grab, Rgb};

/// Physical LED wiring: `panels` side by side, each `columns_per_panel`
/// strands wide and `rows` tall. Strands are folded, so every other column
/// runs bottom-to-top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    pub panels: usize,
    pub columns_per_panel: usize,
    pub rows: usize,
    /// Pixels per OPC channel.
    pub channel_capacity: usize,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            panels: 8,
            columns_per_panel: 5,
            rows: 10,
            channel_capacity: Self::OPC_CHANNEL_PIXELS,
        }
    }
}

impl PanelLayout {
    pub const OPC_CHANNEL_PIXELS: usize = 64;

    /// Width of the screen region to sample.
    pub fn capture_width(&self) -> usize {
        self.panels * self.columns_per_panel
    }

    pub fn capture_height(&self) -> usize {
        self.rows
    }

    pub fn pixel_count(&self) -> usize {
        self.capture_width() * self.rows
    }

    /// Source row read for logical `row` of sub-column `sub`.
    pub fn serpentine_row(&self, sub: usize, row: usize) -> usize {
        if sub % 2 == 1 {
            self.rows - 1 - row
        } else {
            row
        }
    }

    /// Screen coordinate feeding logical pixel (panel, sub, row).
    pub fn source_coord(&self, panel: usize, sub: usize, row: usize) -> (usize, usize) {
        (
            panel * self.columns_per_panel + sub,
            self.serpentine_row(sub, row),
        )
    }

    /// Walk panels, then sub-columns, then rows, in strand order.
    pub fn map(&self, grab: &Grab) -> Vec<Rgb> {
        let mut out = Vec::with_capacity(self.pixel_count());
        for panel in 0..self.panels {
            for sub in 0..self.columns_per_panel {
                for row in 0..self.rows {
                    let (x, y) = self.source_coord(panel, sub, row);
                    out.push(grab.get(x, y));
                }
            }
        }
        out
    }
}

/// Split samples into channel buffers of `capacity` pixels. The last buffer
/// is shorter when the samples do not divide evenly; it is not padded.
pub fn pack_channels(samples: &[Rgb], capacity: usize) -> Vec<Vec<Rgb>> {
    if capacity == 0 {
        return Vec::new();
    }
    samples.chunks(capacity).map(<[Rgb]>::to_vec).collect()
}
