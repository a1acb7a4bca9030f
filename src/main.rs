use anyhow::Result;
use tracing::info;

use komori_usi::UsiEngine;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    info!("komori starting");
    UsiEngine::new().run()?;
    Ok(())
}
