use log::{error, info, warn, LevelFilter};
use rocket::{Error as RocketError, Ignite, Rocket};
use thiserror::Error;

use campus_ballot::Config;

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
enum LaunchError {
    #[error("Could not start the election server: {0}")]
    Rocket(#[from] RocketError),
}

/// Summarise the settings voters will notice.
fn describe(rocket: &Rocket<Ignite>) {
    let protocol = if rocket.config().tls_enabled() {
        "https"
    } else {
        "http"
    };
    let address = &rocket.config().address;
    let port = rocket.config().port;
    info!("Serving elections on {protocol}://{address}:{port}");

    if let Some(config) = rocket.state::<Config>() {
        info!(
            "Accepting voters from @{} (PINs valid for {}s)",
            config.email_domain(),
            config.otp_ttl().num_seconds()
        );
        match config.reconcile_interval() {
            Some(interval) => info!("Reconciling has-voted flags every {}s", interval.as_secs()),
            None => warn!("Has-voted reconciliation is disabled"),
        }
    }
}

async fn serve() -> Result<(), LaunchError> {
    info!("Configuring election server...");
    let rocket = campus_ballot::build().ignite().await?;
    describe(&rocket);
    // Request logging comes from LoggerFairing from here on.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    let _ = rocket.launch().await?;
    info!("Election server stopped");
    Ok(())
}

#[rocket::main]
async fn main() {
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging");
    if cfg!(debug_assertions) {
        log4rs_dynamic_filters::DynamicLevelFilter::set("pins", LevelFilter::Debug);
        warn!("Debug build: PINs will be printed to the console");
    }

    if let Err(err) = serve().await {
        error!("{err}");
        std::process::exit(1)
    }
}
