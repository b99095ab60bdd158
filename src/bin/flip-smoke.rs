//! Alternates two solid-colour dumb buffers on the display.
//!
//! Usage: flip-smoke [FRAMES]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use drm::buffer::DrmFourcc;
use drm::control::Device as ControlDevice;
use kmsfb::core::handle::BufferTable;
use kmsfb::core::{DrmCard, FramebufferDevice};
use kmsfb::util::logging::init_tracing;
use kmsfb::{DisplayConfig, DisplayError};

const DEFAULT_FRAMES: u32 = 120;
const COLORS: [u32; 2] = [0x00d0_4040, 0x0040_40d0];

fn main() -> Result<()> {
    init_tracing();

    let frames = match std::env::args().nth(1) {
        Some(arg) => arg.parse().with_context(|| format!("Invalid frame count {:?}", arg))?,
        None => DEFAULT_FRAMES,
    };

    let config = DisplayConfig::from_env();
    let card = DrmCard::open(&config.device_path, config.force_probe)
        .with_context(|| format!("Failed to open {}", config.device_path.display()))?;
    // Same open file, so framebuffers added here are valid for the display
    let allocator = card.try_clone().context("Failed to clone display fd")?;

    let mut device = FramebufferDevice::open(card, BufferTable::new(), &config)
        .context("Failed to resolve display pipeline")?;
    let (width, height) = (device.info().width, device.info().height);

    let mut buffers = Vec::with_capacity(COLORS.len());
    for color in COLORS {
        let mut db = allocator
            .create_dumb_buffer((width, height), DrmFourcc::Xrgb8888, 32)
            .context("Failed to create dumb buffer")?;
        {
            let mut mapping = allocator.map_dumb_buffer(&mut db).context("Failed to map dumb buffer")?;
            for pixel in mapping.as_mut().chunks_exact_mut(4) {
                pixel.copy_from_slice(&color.to_le_bytes());
            }
        }
        let fb = allocator.add_framebuffer(&db, 24, 32).context("Failed to add framebuffer")?;
        let handle = device.resolver_mut().insert(fb.into());
        buffers.push((db, fb, handle));
    }

    let started = Instant::now();
    for frame in 0..frames {
        let (_, _, handle) = &buffers[frame as usize % buffers.len()];
        loop {
            match device.present(Some(handle)) {
                Ok(()) => break,
                Err(DisplayError::DeviceBusy) => std::thread::sleep(Duration::from_millis(1)),
                Err(e) => return Err(anyhow::Error::new(e).context(format!("Present failed at frame {}", frame))),
            }
        }
    }
    let elapsed = started.elapsed();

    device.enable_screen(false).context("Failed to turn the screen off")?;
    for (_, _, handle) in &buffers {
        device.resolver_mut().remove(*handle);
    }

    let stats = device.stats();
    tracing::info!(
        "{} frames in {:.2?} ({:.1} fps): {} mode-sets, {} flips, {} completed, {} lost ({} late), {} busy",
        frames,
        elapsed,
        f64::from(frames) / elapsed.as_secs_f64().max(f64::EPSILON),
        stats.mode_sets,
        stats.flips_scheduled,
        stats.flips_completed,
        stats.lost_events,
        stats.late_events,
        stats.busy_flips
    );

    device.close()?;

    for (db, fb, _) in buffers {
        allocator.destroy_framebuffer(fb)?;
        allocator.destroy_dumb_buffer(db)?;
    }

    Ok(())
}
