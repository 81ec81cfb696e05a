use chrono::Duration;
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::sync::Mutex,
    Build, Rocket,
};
use serde::Deserialize;

use crate::mailer::{LogMailer, PinMailer};
use crate::model::{
    db::admin::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    email_domain: String,
    otp_ttl: u32,
    auth_ttl: u32,
    #[serde(default = "default_reconcile_interval")]
    reconcile_interval: u64,
    // secrets
    jwt_secret: String,
}

fn default_reconcile_interval() -> u64 {
    300
}

impl Config {
    /// Institutional email domain voters must register with. Subdomains are accepted.
    pub fn email_domain(&self) -> &str {
        &self.email_domain
    }

    /// Valid lifetime of a PIN challenge.
    pub fn otp_ttl(&self) -> Duration {
        Duration::seconds(self.otp_ttl.into())
    }

    /// Valid lifetime of auth token cookies.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// How often the has-voted flags are reconciled, or `None` if they never are.
    pub fn reconcile_interval(&self) -> Option<std::time::Duration> {
        (self.reconcile_interval > 0)
            .then(|| std::time::Duration::from_secs(self.reconcile_interval))
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Voters must register with an @{} address", config.email_domain());
        Ok(rocket.manage(config))
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that connects to the database, performs any setup necessary, and
/// places both a `Client` and a `Database` into managed state.
pub struct DatabaseFairing {
    /// An existing connection and database name; otherwise both come from config.
    existing: Option<(MongoClient, String)>,
}

impl DatabaseFairing {
    /// Connect using the configured `db_uri`.
    pub fn connect() -> Self {
        Self { existing: None }
    }

    /// Use an already-connected client and the named database.
    pub fn with_client(client: MongoClient, db_name: &str) -> Self {
        Self {
            existing: Some((client, db_name.to_string())),
        }
    }
}

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (client, db_name) = match &self.existing {
            Some((client, db_name)) => (client.clone(), db_name.clone()),
            None => {
                let config = match rocket.figment().extract::<DbConfig>() {
                    Ok(config) => config,
                    Err(e) => {
                        error!("Failed to load database config");
                        rocket::config::pretty_print_error(e);
                        return Err(rocket);
                    }
                };
                info!("Loaded database config, connecting...");
                match MongoClient::with_uri_str(config.db_uri).await {
                    Ok(client) => (client, DATABASE.to_string()),
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };
        let db = client.database(&db_name);

        if let Err(e) = prepare(&db).await {
            error!("Failed to prepare database {db_name}: {e}");
            return Err(rocket);
        }
        info!("...database {db_name} online!");

        Ok(rocket.manage(client).manage(db))
    }
}

/// Name of the production database.
const DATABASE: &str = "campus_ballot";

/// Ensure indexes exist and there is at least one admin.
async fn prepare(db: &Database) -> crate::error::Result<()> {
    ensure_indexes_exist(db).await?;
    ensure_admin_exists(&Coll::from_db(db)).await
}

/// A fairing that places the PIN mailer into managed state.
pub struct MailerFairing(Mutex<Option<Box<dyn PinMailer>>>);

impl MailerFairing {
    /// No mail transport is configured yet; PINs go to the log.
    pub fn log() -> Self {
        Self::with(Box::new(LogMailer))
    }

    pub fn with(mailer: Box<dyn PinMailer>) -> Self {
        Self(Mutex::new(Some(mailer)))
    }
}

#[rocket::async_trait]
impl Fairing for MailerFairing {
    fn info(&self) -> Info {
        Info {
            name: "PIN mailer",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match self.0.lock().await.take() {
            Some(mailer) => Ok(rocket.manage(mailer)),
            None => {
                error!("PIN mailer was already handed to another server");
                Err(rocket)
            }
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        /// A config for unit tests that never touch a running server.
        pub fn example() -> Self {
            Self {
                email_domain: "campus.edu".to_string(),
                otp_ttl: 300,
                auth_ttl: 3600,
                reconcile_interval: default_reconcile_interval(),
                jwt_secret: "unit-test-secret".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::Figment;

    use super::*;

    fn extract(figment: Figment) -> Config {
        figment.extract().unwrap()
    }

    #[test]
    fn reconcile_interval_defaults_and_disables() {
        let base = Figment::new()
            .merge(("email_domain", "campus.edu"))
            .merge(("otp_ttl", 300))
            .merge(("auth_ttl", 3600))
            .merge(("jwt_secret", "secret"));

        let config = extract(base.clone());
        let example = Config::example();
        assert_eq!(config.otp_ttl(), example.otp_ttl());
        assert_eq!(config.reconcile_interval(), example.reconcile_interval());
        assert_eq!(
            config.reconcile_interval(),
            Some(std::time::Duration::from_secs(300))
        );
        assert_eq!(config.otp_ttl(), Duration::minutes(5));
        assert_eq!(config.auth_ttl(), Duration::hours(1));

        let config = extract(base.merge(("reconcile_interval", 0)));
        assert_eq!(config.reconcile_interval(), None);
    }
}
