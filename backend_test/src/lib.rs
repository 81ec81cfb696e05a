use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Type,
};

/// Run an async election-server test against a fresh database.
///
/// The test may take a [`rocket::local::asynchronous::Client`], a
/// [`mongodb::Database`] and any number of `crate::model::mongodb::Coll<T>`
/// handles, in any order. `#[backend_test(admin)]` logs the client in as an
/// admin first; `#[backend_test(voter)]` registers and logs in a voter through
/// the PIN challenge. The database is dropped afterwards, even if the test
/// panics.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut test_fn = parse_macro_input!(input as ItemFn);
    let login = match Login::parse(parse_macro_input!(args as Option<Ident>)) {
        Ok(login) => login,
        Err(err) => return err.into_compile_error().into(),
    };
    let injections = match injections(&test_fn) {
        Ok(injections) => injections,
        Err(err) => return err.into_compile_error().into(),
    };

    // The body keeps its signature under a new name; the test takes the old one.
    let name = test_fn.sig.ident.clone();
    let body_name = format_ident!("{}_body", name);
    test_fn.sig.ident = body_name.clone();

    harness(&name, &body_name, &test_fn, login.steps(), &injections).into()
}

/// Who the injected client is logged in as before the test starts.
enum Login {
    Nobody,
    Admin,
    Voter,
}

impl Login {
    fn parse(arg: Option<Ident>) -> syn::Result<Self> {
        match arg {
            None => Ok(Self::Nobody),
            Some(ident) if ident == "admin" => Ok(Self::Admin),
            Some(ident) if ident == "voter" => Ok(Self::Voter),
            Some(ident) => Err(syn::Error::new(
                ident.span(),
                "Expected `admin`, `voter` or no argument",
            )),
        }
    }

    /// Statements run against `rocket_client` and `db` during setup.
    fn steps(&self) -> TokenStream2 {
        match self {
            Self::Nobody => quote! {},
            Self::Admin => quote! {
                crate::model::mongodb::Coll::<crate::model::db::admin::NewAdmin>::from_db(&db)
                    .insert_one(crate::model::db::admin::NewAdmin::example(), None)
                    .await
                    .unwrap();
                let credentials = crate::model::api::admin::AdminCredentials::example1();
                let response = rocket_client
                    .post(uri!(crate::api::auth::admin_login))
                    .header(rocket::http::ContentType::JSON)
                    .body(rocket::serde::json::json!(credentials).to_string())
                    .dispatch()
                    .await;
                assert_eq!(response.status(), rocket::http::Status::Ok, "admin login failed");
            },
            Self::Voter => quote! {
                let request = crate::model::api::auth::VoterChallengeRequest::example();
                rocket_client
                    .post(uri!(crate::api::auth::challenge))
                    .header(rocket::http::ContentType::JSON)
                    .body(rocket::serde::json::json!(request).to_string())
                    .dispatch()
                    .await;

                let code = rocket_client
                    .rocket()
                    .state::<crate::mailer::Outbox>()
                    .unwrap()
                    .latest(&request.email)
                    .expect("no PIN was sent");
                let answer = crate::model::api::auth::VoterVerifyRequest::example(code);

                let response = rocket_client
                    .post(uri!(crate::api::auth::verify))
                    .header(rocket::http::ContentType::JSON)
                    .body(rocket::serde::json::json!(answer).to_string())
                    .dispatch()
                    .await;
                assert_eq!(response.status(), rocket::http::Status::Ok, "voter login failed");
            },
        }
    }
}

/// A value handed to the test body, in parameter order.
enum Injection {
    Client,
    Database,
    Collection { ident: Ident, doc_type: Ident },
}

impl Injection {
    fn argument(&self) -> TokenStream2 {
        match self {
            Self::Client => quote! { rocket_client },
            Self::Database => quote! { db },
            Self::Collection { ident, .. } => quote! { #ident },
        }
    }
}

/// Work out what to inject for each parameter of the test body.
fn injections(test_fn: &ItemFn) -> syn::Result<Vec<Injection>> {
    let sig = &test_fn.sig;
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injections = Vec::with_capacity(sig.inputs.len());
    for input in &sig.inputs {
        let injection = classify(input).ok_or_else(|| {
            syn::Error::new(
                input.span(),
                "Expected one of `client: Client`, `db: Database` or `collection: Coll<T>`",
            )
        })?;
        let duplicate = injections.iter().any(|seen| {
            matches!(
                (seen, &injection),
                (Injection::Client, Injection::Client) | (Injection::Database, Injection::Database)
            )
        });
        if duplicate {
            return Err(syn::Error::new(
                input.span(),
                "Test cannot accept the same `Client` or `Database` twice",
            ));
        }
        injections.push(injection);
    }
    Ok(injections)
}

fn classify(input: &FnArg) -> Option<Injection> {
    let FnArg::Typed(pat_type) = input else {
        return None;
    };
    let Pat::Ident(pat_ident) = &*pat_type.pat else {
        return None;
    };
    let Type::Path(type_path) = &*pat_type.ty else {
        return None;
    };

    if let Some(type_ident) = type_path.path.get_ident() {
        return if type_ident == "Client" {
            Some(Injection::Client)
        } else if type_ident == "Database" {
            Some(Injection::Database)
        } else {
            None
        };
    }

    // `Coll<T>`, possibly written with a module path.
    let last = type_path.path.segments.last()?;
    if last.ident != "Coll" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &last.arguments else {
        return None;
    };
    match generics.args.first()? {
        GenericArgument::Type(Type::Path(doc_path)) => Some(Injection::Collection {
            ident: pat_ident.ident.clone(),
            doc_type: doc_path.path.get_ident()?.clone(),
        }),
        _ => None,
    }
}

/// The synchronous `#[test]` wrapping setup, the test body and cleanup.
fn harness(
    name: &Ident,
    body_name: &Ident,
    test_fn: &ItemFn,
    login: TokenStream2,
    injections: &[Injection],
) -> TokenStream2 {
    let arguments = injections.iter().map(Injection::argument);
    let collections = injections.iter().filter_map(|injection| match injection {
        Injection::Collection { ident, doc_type } => Some(quote! {
            let #ident = crate::model::mongodb::Coll::<#doc_type>::from_db(&db);
        }),
        _ => None,
    });

    quote! {
        #[test]
        fn #name() {
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                log4rs_test_utils::test_logging::init_logging_once_for(["campus_ballot"], None, None);

                let mongo = crate::db_client().await;
                let db_name = crate::database();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_db(mongo.clone(), &db_name),
                )
                .await
                .unwrap();
                let db = mongo.database(&db_name);

                // Scoped so login responses release the client before it moves.
                {
                    #login
                }

                (rocket_client, db)
            }

            #test_fn

            fn runtime(name: &str) -> rocket::tokio::runtime::Runtime {
                rocket::tokio::runtime::Builder::new_multi_thread()
                    .thread_name(name)
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .unwrap()
            }

            // The body gets its own runtime so a panic inside it cannot poison
            // the one used for cleanup.
            let harness_runtime = runtime("test-harness");
            let (rocket_client, db) = harness_runtime.block_on(setup());

            let db_for_body = db.clone();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                #[allow(unused_variables)]
                let (rocket_client, db) = (rocket_client, db_for_body);
                #(#collections)*
                runtime("rocket-worker-test-thread").block_on(#body_name(#(#arguments),*));
            }));

            harness_runtime.block_on(async move {
                if let Err(err) = db.drop(None).await {
                    eprintln!("failed to drop test database: {err}");
                }
            });

            if let Err(panic) = outcome {
                std::panic::resume_unwind(panic);
            }
        }
    }
}
