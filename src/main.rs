use anyhow::{Context, Result};
use kmsfb::core::handle::BufferTable;
use kmsfb::core::{DrmCard, FramebufferDevice};
use kmsfb::util::logging::init_tracing;
use kmsfb::DisplayConfig;

/// Resolves the display pipeline and prints what the device would report.
fn main() -> Result<()> {
    init_tracing();

    let mut config = DisplayConfig::from_env();
    if let Some(path) = std::env::args().nth(1) {
        config.device_path = path.into();
    }

    let card = DrmCard::open(&config.device_path, config.force_probe)
        .with_context(|| format!("Failed to open {}", config.device_path.display()))?;

    let device = FramebufferDevice::open(card, BufferTable::new(), &config)
        .context("Failed to resolve display pipeline")?;

    let info = device.info();
    println!("device:     {}", config.device_path.display());
    println!("connector:  {}", info.connector);
    println!("crtc:       {}", info.crtc);
    println!("mode:       {} ({}x{} @ {} Hz)", info.mode_name, info.width, info.height, info.fps);
    println!("dpi:        {:.1} x {:.1}", info.xdpi, info.ydpi);
    println!("format:     {:?}", info.format);
    println!("swap:       {}..={}", info.min_swap_interval, info.max_swap_interval);

    device.close()?;
    Ok(())
}
