use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, middleware, web};

use backadmin::auth::password;
use backadmin::auth::permissions::PermissionStore;
use backadmin::config::AppConfig;
use backadmin::db::{self, KeyValueStore, SqliteStore, Store};
use backadmin::handlers;
use backadmin::models::service::ServiceRepository;
use backadmin::notify::{LogNotifier, Notifier};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = AppConfig::from_env();

    let store: Store = Arc::new(
        SqliteStore::open(&config.database_path).expect("Failed to open database"),
    );

    // Seed system users and demo requests if empty
    let seed_hash = password::hash_password(&config.seed_password)
        .expect("Failed to hash default password");
    db::seed_users(store.as_ref(), &seed_hash).expect("Failed to seed users");
    if config.seed_demo {
        db::seed_demo_services(store.as_ref()).expect("Failed to seed demo services");
    }

    let permissions = web::Data::new(
        PermissionStore::load(store.clone()).expect("Failed to load role permissions"),
    );
    let services = web::Data::new(ServiceRepository::new(store.clone()));
    let store_data: web::Data<dyn KeyValueStore> = web::Data::from(store);
    let notifier: web::Data<dyn Notifier> = web::Data::from(Arc::new(LogNotifier) as Arc<dyn Notifier>);
    let secret_key = config.session_key.clone();

    log::info!("Starting server at http://{}", config.bind);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(false)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(store_data.clone())
            .app_data(services.clone())
            .app_data(permissions.clone())
            .app_data(notifier.clone())
            .configure(handlers::configure)
    })
    .bind(&config.bind)?
    .run()
    .await
}
