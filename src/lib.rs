#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod model;
pub mod scheduled_task;

pub use config::Config;

use config::{ConfigFairing, DatabaseFairing, MailerFairing};
use logging::LoggerFairing;
use scheduled_task::ReconcilerFairing;

/// Assemble the server: routes, config, database, PIN delivery and background reconciliation.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", error::catchers())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing::connect())
        .attach(MailerFairing::log())
        .attach(ReconcilerFairing::default())
}

/// Connect to the database named by the configured `db_uri`.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri: String = rocket::Config::figment()
        .extract_inner("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

/// A random database name, so tests never collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// A server using the given connection and database, without background reconciliation.
/// PINs are kept in a managed [`mailer::Outbox`] instead of being logged.
#[cfg(test)]
pub(crate) fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let figment = rocket::Config::figment().merge(("reconcile_interval", 0));
    let outbox = mailer::Outbox::default();
    rocket::custom(figment)
        .manage(outbox.clone())
        .mount("/", api::routes())
        .register("/", error::catchers())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing::with_client(client, db_name))
        .attach(MailerFairing::with(Box::new(outbox)))
        .attach(ReconcilerFairing::default())
}
