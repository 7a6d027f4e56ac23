use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::configuration::JwtSettings;
use crate::error::{AppError, ValidationError};
use crate::middleware::{RequestLogger, SessionMiddleware};
use crate::routes::{
    change_password, current_user, health_check, login, logout, refresh_access_token, register,
    toggle_subscription, update_account,
};
use crate::storage::AccountStore;

const JSON_BODY_LIMIT: usize = 20 * 1024;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            AppError::Validation(ValidationError::Rejected(format!("Invalid JSON body: {}", err)))
                .into()
        })
}

pub fn run(
    listener: TcpListener,
    store: web::Data<dyn AccountStore>,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let jwt_config_data = web::Data::new(jwt_config.clone());

    let server = HttpServer::new(move || {
        let session = || SessionMiddleware::new(jwt_config.clone(), store.clone());

        App::new()
            .wrap(RequestLogger)

            // Shared state
            .app_data(json_config())
            .app_data(store.clone())
            .app_data(jwt_config_data.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/users")
                            // Public routes
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/refresh-token", web::post().to(refresh_access_token))

                            // Protected routes (require a valid access token)
                            .service(web::resource("/logout").wrap(session()).route(web::post().to(logout)))
                            .service(
                                web::resource("/change-password")
                                    .wrap(session())
                                    .route(web::post().to(change_password)),
                            )
                            .service(
                                web::resource("/user-data")
                                    .wrap(session())
                                    .route(web::get().to(current_user)),
                            )
                            .service(
                                web::resource("/update-account")
                                    .wrap(session())
                                    .route(web::patch().to(update_account)),
                            ),
                    )
                    .service(
                        web::scope("/subscriptions").service(
                            web::resource("/channel/{channel_id}")
                                .wrap(session())
                                .route(web::post().to(toggle_subscription)),
                        ),
                    ),
            )

            // Static file serving (must be last to not override API routes)
            .service(fs::Files::new("/", "./public").index_file("index.html"))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
