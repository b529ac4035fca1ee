use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use rosc::{encoder, OscMessage, OscPacket, OscType};

use crate::config::LEDS_PER_UNIVERSE;
use crate::error::{Error, Result};
use crate::framerenderer::Frame;
use crate::tickloop::FrameSink;

const UNIVERSE_SIZE: usize = 512;

/// Sends frames to OLA's OSC plugin, one DMX universe per 170 LEDs.
pub struct OlaOutput {
    sock: UdpSocket,
    target_addr: SocketAddr,
    first_universe: u32,
    buffers: Vec<Vec<u8>>,
}

impl OlaOutput {
    pub fn new(target_addr: SocketAddr, first_universe: u32, pixel_count: usize) -> Result<Self> {
        let our_addr = if target_addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let universes = pixel_count.div_ceil(LEDS_PER_UNIVERSE).max(1);
        let last_universe = u32::try_from(universes - 1)
            .ok()
            .and_then(|extra| first_universe.checked_add(extra))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "{pixel_count} LEDs starting at universe {first_universe} run past the last OLA universe"
                ))
            })?;
        let sock = UdpSocket::bind(our_addr)?;
        let buffers = vec![vec![0; UNIVERSE_SIZE]; universes];

        log::info!(
            "Sending {} LEDs to OLA at {} on universes {}..={}",
            pixel_count,
            target_addr,
            first_universe,
            last_universe
        );

        Ok(OlaOutput {
            sock,
            target_addr,
            first_universe,
            buffers,
        })
    }

    #[cfg(test)]
    pub fn universe_count(&self) -> usize {
        self.buffers.len()
    }

    #[cfg(test)]
    pub fn buffer(&self, universe: usize) -> &[u8] {
        &self.buffers[universe]
    }

    pub fn set_rgb(&mut self, pixel: usize, values: [u8; 3]) {
        let universe = pixel / LEDS_PER_UNIVERSE;
        let start_channel = (pixel % LEDS_PER_UNIVERSE) * 3;
        if let Some(buffer) = self.buffers.get_mut(universe) {
            buffer[start_channel..start_channel + 3].copy_from_slice(&values);
        }
    }

    pub fn flush(&mut self) {
        // `new` checked that the last universe fits in a u32.
        for (universe, buffer) in (self.first_universe..=u32::MAX).zip(&self.buffers) {
            let msg_buf = match encoder::encode(&OscPacket::Message(OscMessage {
                addr: format!("/dmx/universe/{universe}"),
                args: vec![OscType::Blob(Vec::clone(buffer))],
            })) {
                Ok(msg_buf) => msg_buf,
                Err(err) => {
                    log::warn!("Cannot encode universe {universe}: {err:?}");
                    continue;
                }
            };

            if let Err(err) = self.sock.send_to(&msg_buf, self.target_addr) {
                log::warn!("Cannot send universe {universe} to OLA: {err}");
            }
        }
    }

    pub fn blackout(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0);
        }
    }
}

impl FrameSink for OlaOutput {
    fn show(&mut self, frame: &Frame) {
        self.blackout();
        for (pixel, color) in frame.iter().enumerate() {
            let (red, green, blue) = color.into_components();
            self.set_rgb(pixel, [red, green, blue]);
        }
        self.flush();
    }
}

impl Drop for OlaOutput {
    fn drop(&mut self) {
        self.blackout();
        self.flush();
    }
}
