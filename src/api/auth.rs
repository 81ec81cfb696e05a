use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    mailer::PinMailer,
    model::{
        api::{
            admin::AdminCredentials,
            auth::{
                AuthToken, VoterChallengeRequest, VoterLoginRequest, VoterVerifyRequest,
                AUTH_TOKEN_COOKIE,
            },
            otp::{Challenge, ChallengeError, Code, CHALLENGE_COOKIE},
            voter::VoterProfile,
        },
        db::{
            admin::Admin,
            challenge::{NewPinChallenge, PinChallenge},
            voter::{NewVoter, Voter},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![admin_login, challenge, verify, voter_login, logout]
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn admin_login(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<()> {
    let with_username = doc! {
        "username": &credentials.username
    };

    let admin = admins
        .find_one(with_username, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No admin found with the provided username and password combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config)?);
    info!("Admin '{}' logged in", admin.username);

    Ok(())
}

/// Send a PIN to an institutional email address. Any earlier PIN for it stops working.
#[post("/auth/voter/challenge", data = "<request>", format = "json")]
pub async fn challenge(
    request: Json<VoterChallengeRequest>,
    cookies: &CookieJar<'_>,
    challenges: Coll<PinChallenge>,
    config: &State<Config>,
    mailer: &State<Box<dyn PinMailer>>,
) -> Result<()> {
    let email = request.into_inner().email;
    if !email.is_in_domain(config.email_domain()) {
        return Err(Error::bad_request(format!(
            "Voters must use an @{} email address",
            config.email_domain()
        )));
    }

    let code = Code::random();
    let stored = PinChallenge {
        id: Id::new(),
        challenge: NewPinChallenge::new(email, &code, config.otp_ttl())?,
    };
    challenges
        .delete_many(doc! { "email": stored.email.clone() }, None)
        .await?;
    challenges.insert_one(&stored, None).await?;

    mailer.send_pin(&stored.email, &code).await?;
    cookies.add_private(Challenge { id: stored.id }.into_cookie(config));

    Ok(())
}

/// Answer the PIN challenge, registering the voter on first login.
#[post("/auth/voter/verify", data = "<request>", format = "json")]
pub async fn verify(
    request: Json<VoterVerifyRequest>,
    challenge: Challenge,
    challenges: Coll<PinChallenge>,
    cookies: &CookieJar<'_>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<Json<VoterProfile>> {
    let email = match challenge.answer(&challenges, &request.code).await {
        Ok(email) => email,
        Err(err) => {
            if !matches!(err, ChallengeError::Incorrect) {
                cookies.remove_private(Cookie::named(CHALLENGE_COOKIE));
            }
            return Err(err.into());
        }
    };
    cookies.remove_private(Cookie::named(CHALLENGE_COOKIE));

    let with_email = doc! { "email": email.clone() };
    let voter = match voters.find_one(with_email.clone(), None).await? {
        Some(voter) => voter,
        None => {
            let voter = Voter {
                id: Id::new(),
                voter: NewVoter::new(email),
            };
            match voters.insert_one(&voter, None).await {
                Ok(_) => {
                    info!("Registered voter {} ({})", voter.id, voter.email);
                    voter
                }
                // Someone verified the same address at the same time.
                Err(err) if is_duplicate_key_error(&err) => voters
                    .find_one(with_email, None)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("Voter {}", voter.email)))?,
                Err(err) => return Err(err.into()),
            }
        }
    };

    cookies.add(AuthToken::new(&voter).into_cookie(config)?);

    Ok(Json(voter.into()))
}

/// Log in with a password set after an earlier PIN login.
#[post("/auth/voter", data = "<request>", format = "json")]
pub async fn voter_login(
    request: Json<VoterLoginRequest>,
    cookies: &CookieJar<'_>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<Json<VoterProfile>> {
    let voter = voters
        .find_one(doc! { "email": request.email.clone() }, None)
        .await?
        .filter(|voter| voter.verify_password(&request.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No voter found with the provided email and password combination.".to_string(),
            )
        })?;

    cookies.add(AuthToken::new(&voter).into_cookie(config)?);

    Ok(Json(voter.into()))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
