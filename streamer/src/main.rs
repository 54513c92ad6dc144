use std::{env, io};

use log::info;
use tokio::signal;

use streamer::{StreamerConfig, StreamerErr};

const DEFAULT_MODE: &str = "serve";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let mode = env::args().nth(1).unwrap_or_else(|| DEFAULT_MODE.to_string());
    let config = StreamerConfig::from_env()?;

    let run = async {
        match mode.as_str() {
            "serve" => streamer::serve(config).await,
            "send" => streamer::send(config).await,
            "relay" => streamer::relay(config).await,
            other => Err(StreamerErr::InvalidConfig(format!(
                "unknown mode {other:?}, expected serve, send or relay"
            ))),
        }
    };

    tokio::select! {
        ret = run => {
            ret?;
            info!("done, shutting down");
        }
        _ = signal::ctrl_c() => {
            info!("received SIGINT");
        }
    }

    Ok(())
}
