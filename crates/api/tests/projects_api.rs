//! HTTP-level tests for the public gallery and project administration.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    body_json, build_test_app, create_admin, get, get_auth, post_json_auth, send, token_for,
};
use obra_db::models::project::CreateProject;
use obra_db::models::project_image::CreateProjectImage;
use obra_db::repositories::{ProjectImageRepo, ProjectRepo};
use sqlx::PgPool;
use uuid::Uuid;

fn new_project(title: &str, description: &str) -> CreateProject {
    CreateProject {
        title: title.to_string(),
        category: Some("Remodelação".to_string()),
        city: Some("Lisboa".to_string()),
        description: Some(description.to_string()),
        cover_image: None,
        start_date: None,
        end_date: None,
        delivery_date: None,
        completion_deadline: None,
        status: None,
        client_name: None,
    }
}

fn new_image(url: &str) -> CreateProjectImage {
    CreateProjectImage {
        url: url.to_string(),
        caption: None,
        image_date: None,
    }
}

// ---------------------------------------------------------------------------
// Public gallery
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn gallery_reports_loading_before_first_fetch(pool: PgPool) {
    let test = build_test_app(pool);

    let response = get(&test.router, "/api/v1/projects").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["loading"], true);
    assert_eq!(json["data"]["projects"], serde_json::json!([]));
    assert_eq!(json["data"]["error"], serde_json::Value::Null);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn gallery_lists_projects_with_images_after_refresh(pool: PgPool) {
    let shown = ProjectRepo::create(&pool, &new_project("Moradia", "Cliente: Ana Costa"))
        .await
        .unwrap();
    ProjectImageRepo::create(&pool, shown.id, &new_image("https://cdn.example/a.jpg"))
        .await
        .unwrap();
    ProjectImageRepo::create(&pool, shown.id, &new_image("https://cdn.example/b.jpg"))
        .await
        .unwrap();
    // No images: hidden from the gallery.
    ProjectRepo::create(&pool, &new_project("Escritório", "Sem fotos"))
        .await
        .unwrap();

    let token = token_for(create_admin(&pool).await);
    let test = build_test_app(pool);

    let response = post_json_auth(
        &test.router,
        "/api/v1/projects/refresh",
        serde_json::json!({}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(&test.router, "/api/v1/projects").await).await;
    let data = &json["data"];
    assert_eq!(data["loading"], false);
    assert_eq!(data["is_retrying"], false);

    let projects = data["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["title"], "Moradia");
    assert_eq!(projects[0]["client_name"], "Ana Costa");
    let urls: Vec<&str> = projects[0]["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls, ["https://cdn.example/a.jpg", "https://cdn.example/b.jpg"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn gallery_refresh_requires_admin(pool: PgPool) {
    let test = build_test_app(pool);
    let token = token_for(Uuid::new_v4());

    let response = post_json_auth(
        &test.router,
        "/api/v1/projects/refresh",
        serde_json::json!({}),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Project admin
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_creates_updates_and_deletes_project(pool: PgPool) {
    let token = token_for(create_admin(&pool).await);
    let test = build_test_app(pool);

    let response = post_json_auth(
        &test.router,
        "/api/v1/admin/projects",
        serde_json::json!({ "title": "Apartamento T2", "city": "Porto" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["data"]["status"], "active");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let response = send(
        &test.router,
        Method::PUT,
        &format!("/api/v1/admin/projects/{id}"),
        Some(serde_json::json!({ "status": "archived" })),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["data"]["status"], "archived");
    assert_eq!(updated["data"]["city"], "Porto");

    let response = send(
        &test.router,
        Method::DELETE,
        &format!("/api/v1/admin/projects/{id}"),
        None,
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(&test.router, &format!("/api/v1/admin/projects/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_project_requires_title(pool: PgPool) {
    let token = token_for(create_admin(&pool).await);
    let test = build_test_app(pool);

    let response = post_json_auth(
        &test.router,
        "/api/v1/admin/projects",
        serde_json::json!({ "title": "   " }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_manages_and_reorders_images(pool: PgPool) {
    let project = ProjectRepo::create(&pool, &new_project("Cozinha", "Obra rápida"))
        .await
        .unwrap();
    let token = token_for(create_admin(&pool).await);
    let test = build_test_app(pool);
    let base = format!("/api/v1/admin/projects/{}/images", project.id);

    let mut ids = Vec::new();
    for url in ["https://cdn.example/1.jpg", "https://cdn.example/2.jpg"] {
        let response =
            post_json_auth(&test.router, &base, serde_json::json!({ "url": url }), &token).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        ids.push(json["data"]["id"].as_str().unwrap().to_string());
    }

    let response = send(
        &test.router,
        Method::PUT,
        &format!("{base}/order"),
        Some(serde_json::json!({ "image_ids": [ids[1], ids[0]] })),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let reordered = body_json(response).await;
    assert_eq!(reordered["data"][0]["id"], ids[1].as_str());
    assert_eq!(reordered["data"][1]["id"], ids[0].as_str());

    // An incomplete order is rejected.
    let response = send(
        &test.router,
        Method::PUT,
        &format!("{base}/order"),
        Some(serde_json::json!({ "image_ids": [ids[0]] })),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &test.router,
        Method::PUT,
        &format!("{base}/{}", ids[0]),
        Some(serde_json::json!({ "caption": "Bancada" })),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["caption"], "Bancada");

    let response = send(
        &test.router,
        Method::DELETE,
        &format!("{base}/{}", ids[0]),
        None,
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let remaining = body_json(get_auth(&test.router, &base, &token).await).await;
    assert_eq!(remaining["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn images_of_unknown_project_return_404(pool: PgPool) {
    let token = token_for(create_admin(&pool).await);
    let test = build_test_app(pool);

    let response = get_auth(
        &test.router,
        &format!("/api/v1/admin/projects/{}/images", Uuid::new_v4()),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
