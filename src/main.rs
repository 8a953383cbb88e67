use tracing_subscriber::EnvFilter;

use chordscribe::audio::beats;
use chordscribe::config::AppConfig;
use chordscribe::server::{self, AppState};

#[tokio::main]
async fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Resolve the DSP capability once; request handlers check the flag
    // instead of probing per call.
    let dsp_available = beats::probe_capability();
    if dsp_available {
        tracing::info!("chord/tempo estimation available");
    } else {
        tracing::warn!("chord/tempo estimation unavailable, chords will use the fallback path");
    }

    tracing::info!("chordscribe starting on port {}", config.port);

    let state = AppState::new(config, dsp_available);
    if let Err(e) = server::start_server(state).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
