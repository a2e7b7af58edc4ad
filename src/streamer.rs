use crate::canvas::{Canvas, Rgb};
use crate::opc::PixelTransport;
use crate::pixels::{pack_channels, PanelLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Transport was down; a reconnect was attempted and nothing was sent.
    Reconnecting,
    Sent { channels: usize, pixels: usize },
}

/// Samples the composited canvas and ships it to the pixel controller.
pub struct Streamer<T: PixelTransport> {
    transport: T,
    layout: PanelLayout,
}

impl<T: PixelTransport> Streamer<T> {
    pub fn new(transport: T, layout: PanelLayout) -> Self {
        Self { transport, layout }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn push(&mut self, canvas: &Canvas) -> StreamOutcome {
        if !self.transport.is_connected() {
            self.transport.try_connect();
            return StreamOutcome::Reconnecting;
        }
        let grab = canvas.grab(
            0,
            0,
            self.layout.capture_width(),
            self.layout.capture_height(),
        );
        let samples = self.layout.map(&grab);
        let channels = self.send_samples(&samples);
        StreamOutcome::Sent {
            channels,
            pixels: samples.len(),
        }
    }

    /// Pack `samples` into channels numbered from 1 and write them in order.
    /// Returns how many channels were written.
    pub fn send_samples(&mut self, samples: &[Rgb]) -> usize {
        let buffers = pack_channels(samples, self.layout.channel_capacity);
        let mut sent = 0;
        for (i, buf) in buffers.iter().enumerate() {
            let Ok(channel) = u8::try_from(i + 1) else {
                tracing::warn!(dropped = buffers.len() - i, "out of OPC channel numbers");
                break;
            };
            self.transport.write_channel(channel, buf);
            sent += 1;
        }
        sent
    }
}
