use rocket::Route;

mod admin;
pub(crate) mod auth;
mod common;
mod posts;
mod public;
mod voter;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(posts::routes());
    routes.extend(public::routes());
    routes.extend(voter::routes());
    routes.extend(voting::routes());
    routes
}
