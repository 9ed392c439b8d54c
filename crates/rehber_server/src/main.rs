use std::process::ExitCode;

use log::error;
use rehber_server::config::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args().nth(1);
    let settings = match Settings::load(config_path.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("rehber-server: invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = rehber_core::init_logging(&settings.logging.level, settings.logging.dir.as_deref())
    {
        eprintln!("rehber-server: logging init failed: {err}");
        return ExitCode::FAILURE;
    }

    match rehber_server::serve(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_run module=server status=error error={err}");
            ExitCode::FAILURE
        }
    }
}
