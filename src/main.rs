pub mod config;
pub mod err;
pub mod identity;
pub mod models;
pub mod pagination;
pub mod password;
pub mod routes;
pub mod storage;
pub mod sync;
pub mod token;

use axum::handler::Handler;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::err::{Error, Success};
use crate::routes::{auth, documents, meetings, professionals, schools, students, supports, users};

pub type Payload<T> = Result<Json<Success<T>>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(Success::of(value)))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Err(err)
}

/// Shared response body for soft deletes.
#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    pub id: i32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cfg = AppConfig::from_env()?;
    storage::prepare_storage(&cfg.storage_dir).await?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let app = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        .route("/users/list", get(users::list))
        .route("/users/get/:id", get(users::get))
        .route("/users/update/:id", put(users::update))
        .route("/users/delete/:id", delete(users::delete))
        .route("/schools/list", get(schools::list))
        .route("/schools/get/:id", get(schools::get))
        .route("/schools/store", post(schools::store))
        .route("/schools/update/:id", put(schools::update))
        .route("/schools/delete/:id", delete(schools::delete))
        .route("/schools/:id/courses/list", get(schools::list_courses))
        .route("/schools/:id/courses/store", post(schools::store_course))
        .route("/courses/get/:id", get(schools::get_course))
        .route("/courses/update/:id", put(schools::update_course))
        .route("/courses/delete/:id", delete(schools::delete_course))
        .route("/students/list", get(students::list))
        .route("/students/get/:id", get(students::get))
        .route("/students/store", post(students::store))
        .route("/students/update/:id", put(students::update))
        .route("/students/delete/:id", delete(students::delete))
        .route("/professionals/list", get(professionals::list))
        .route("/professionals/get/:id", get(professionals::get))
        .route("/professionals/store", post(professionals::store))
        .route("/professionals/update/:id", put(professionals::update))
        .route("/professionals/delete/:id", delete(professionals::delete))
        .route("/meetings/list", get(meetings::list))
        .route("/meetings/get/:id", get(meetings::get))
        .route("/meetings/store", post(meetings::store))
        .route("/meetings/update/:id", put(meetings::update))
        .route("/meetings/delete/:id", delete(meetings::delete))
        .route("/support-plans/list", get(supports::list_plans))
        .route("/support-plans/get/:id", get(supports::get_plan))
        .route("/support-plans/store", post(supports::store_plan))
        .route("/support-plans/update/:id", put(supports::update_plan))
        .route("/support-plans/delete/:id", delete(supports::delete_plan))
        .route("/adequacies/list", get(supports::list_adequacies))
        .route("/adequacies/get/:id", get(supports::get_adequacy))
        .route("/adequacies/store", post(supports::store_adequacy))
        .route("/adequacies/update/:id", put(supports::update_adequacy))
        .route("/adequacies/delete/:id", delete(supports::delete_adequacy))
        .route("/documents/list", get(documents::list))
        .route("/documents/get/:id", get(documents::get))
        .route("/documents/store", post(documents::store))
        .route("/documents/delete/:id", delete(documents::delete))
        .fallback(err::handler404.into_service())
        .layer(Extension(pool))
        .layer(Extension(cfg.clone()));

    log::info!("Starting PIE Office HTTP Server on http://{}", cfg.bind_addr);
    axum::Server::bind(&cfg.bind_addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
