//! HTTP API tests over an in-memory database.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use ug_platform::shared::authorization_service::{AuthenticatedPolicy, RoleBasedPolicy};
use ug_platform::shared::middleware::{USER_ID_HEADER, USER_ROLES_HEADER};
use ug_platform::store::connect_in_memory;
use ug_platform::store::schema::init_schema;
use ug_platform::{api_router, AppState, AuthorizationPolicy, LoaderSettings, Stores};

async fn app_with(policy: Arc<dyn AuthorizationPolicy>) -> Router {
    let pool = connect_in_memory().await.unwrap();
    init_schema(&pool).await.unwrap();
    api_router(AppState::new(Stores::sqlite(pool), LoaderSettings::default(), policy))
}

async fn app() -> Router {
    app_with(Arc::new(AuthenticatedPolicy)).await
}

struct Call<'a> {
    method: &'a str,
    uri: &'a str,
    caller: Option<&'a str>,
    roles: Option<&'a str>,
    body: Option<Value>,
}

impl<'a> Call<'a> {
    fn get(uri: &'a str) -> Self {
        Self { method: "GET", uri, caller: None, roles: None, body: None }
    }

    fn post(uri: &'a str, body: Value) -> Self {
        Self { method: "POST", uri, caller: None, roles: None, body: Some(body) }
    }

    fn put(uri: &'a str, body: Value) -> Self {
        Self { method: "PUT", uri, caller: None, roles: None, body: Some(body) }
    }

    fn as_user(mut self, caller: &'a str) -> Self {
        self.caller = Some(caller);
        self
    }

    fn with_roles(mut self, roles: &'a str) -> Self {
        self.roles = Some(roles);
        self
    }

    async fn send(self, app: &Router) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(caller) = self.caller {
            builder = builder.header(USER_ID_HEADER, caller);
        }
        if let Some(roles) = self.roles {
            builder = builder.header(USER_ROLES_HEADER, roles);
        }

        let request = match self.body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

/// `name` of every record in a list response, in order.
fn names_of(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect()
}

/// Insert a user as `caller` and return the created record.
async fn create_user(app: &Router, caller: &str, name: &str, surname: &str) -> Value {
    let (status, body) = Call::post(
        "/api/users",
        json!({
            "name": name,
            "surname": surname,
            "email": format!("{}.{}@world.com", name.to_lowercase(), surname.to_lowercase()),
        }),
    )
    .as_user(caller)
    .send(app)
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "ok");
    body["entity"].clone()
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = Call::get("/health").send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
}

#[tokio::test]
async fn test_anonymous_and_invalid_callers_rejected() {
    let app = app().await;

    let (status, body) = Call::get("/api/users").send(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = Call::get("/api/users").as_user("not-a-uuid").send(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_insert_then_get() {
    let app = app().await;
    let caller = Uuid::new_v4().to_string();

    let user = create_user(&app, &caller, "John", "Newbie").await;
    assert_eq!(user["valid"], true);
    assert_eq!(user["createdby"], caller.as_str());
    assert_eq!(user["created"], user["lastchange"]);

    let uri = format!("/api/users/{}", user["id"].as_str().unwrap());
    let (status, body) = Call::get(&uri).as_user(&caller).send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, user);
}

#[tokio::test]
async fn test_insert_with_explicit_id() {
    let app = app().await;
    let caller = Uuid::new_v4().to_string();
    let id = Uuid::new_v4().to_string();

    let (status, body) = Call::post("/api/group-types", json!({"id": id, "name": "fakulta"}))
        .as_user(&caller)
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["entity"]["name"], "fakulta");
}

#[tokio::test]
async fn test_missing_entity_is_404() {
    let app = app().await;
    let caller = Uuid::new_v4().to_string();
    let uri = format!("/api/groups/{}", Uuid::new_v4());

    let (status, body) = Call::get(&uri).as_user(&caller).send(&app).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_page_with_filter() {
    let app = app().await;
    let caller = Uuid::new_v4().to_string();
    for (name, surname) in [("Ann", "Able"), ("Bob", "Baker"), ("Cid", "Cole")] {
        create_user(&app, &caller, name, surname).await;
    }

    let (status, body) = Call::get("/api/users?skip=1&limit=5").as_user(&caller).send(&app).await;
    assert_eq!(status, StatusCode::OK);
    let names = names_of(&body);
    assert_eq!(names, vec!["Bob", "Cid"]);

    // where={"surname":{"_ilike":"%a%"}}
    let url = "/api/users?where=%7B%22surname%22%3A%7B%22_ilike%22%3A%22%25A%25%22%7D%7D";
    let (status, body) = Call::get(url).as_user(&caller).send(&app).await;
    assert_eq!(status, StatusCode::OK);
    let names = names_of(&body);
    assert_eq!(names, vec!["Ann", "Bob"]);
}

#[tokio::test]
async fn test_bad_page_requests_rejected() {
    let app = app().await;
    let caller = Uuid::new_v4().to_string();

    // where={"password":{"_eq":"x"}}
    let url = "/api/users?where=%7B%22password%22%3A%7B%22_eq%22%3A%22x%22%7D%7D";
    let (status, body) = Call::get(url).as_user(&caller).send(&app).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = Call::get("/api/users?limit=0").as_user(&caller).send(&app).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = Call::get("/api/users?skip=-1").as_user(&caller).send(&app).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_stale_update() {
    let app = app().await;
    let caller = Uuid::new_v4().to_string();
    let editor = Uuid::new_v4().to_string();
    let user = create_user(&app, &caller, "John", "Newbie").await;

    let (status, body) = Call::put(
        "/api/users",
        json!({"id": user["id"], "lastchange": user["lastchange"], "surname": "Oldman"}),
    )
    .as_user(&editor)
    .send(&app)
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "ok");
    assert_eq!(body["entity"]["surname"], "Oldman");
    assert_eq!(body["entity"]["name"], "John");
    assert_eq!(body["entity"]["changedby"], editor.as_str());
    assert_eq!(body["entity"]["createdby"], caller.as_str());

    // Replaying the consumed token must not overwrite the newer state
    let (status, body) = Call::put(
        "/api/users",
        json!({"id": user["id"], "lastchange": "2000-01-01T00:00:00Z", "surname": "Stale"}),
    )
    .as_user(&editor)
    .send(&app)
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "fail");
    assert_eq!(body["reason"], "conflict");

    let uri = format!("/api/users/{}", user["id"].as_str().unwrap());
    let (_, body) = Call::get(&uri).as_user(&caller).send(&app).await;
    assert_eq!(body["surname"], "Oldman");

    let (_, body) = Call::put(
        "/api/users",
        json!({"id": Uuid::new_v4(), "lastchange": user["lastchange"], "surname": "Ghost"}),
    )
    .as_user(&editor)
    .send(&app)
    .await;
    assert_eq!(body["msg"], "fail");
    assert_eq!(body["reason"], "not_found");
}

#[tokio::test]
async fn test_me() {
    let app = app().await;
    let id = Uuid::new_v4().to_string();

    let (status, _) = Call::get("/api/users/me").as_user(&id).send(&app).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = Call::post(
        "/api/users",
        json!({"id": id, "name": "John", "surname": "Newbie"}),
    )
    .as_user(&id)
    .send(&app)
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::get("/api/users/me").as_user(&id).send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["name"], "John");
}

#[tokio::test]
async fn test_users_by_letters() {
    let app = app().await;
    let caller = Uuid::new_v4().to_string();
    create_user(&app, &caller, "John", "Newbie").await;
    create_user(&app, &caller, "Julia", "Newman").await;
    create_user(&app, &caller, "Peter", "Oldman").await;

    let (status, body) = Call::get("/api/users/by-letters?letters=NEW").as_user(&caller)
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = Call::get("/api/users/by-letters?letters=man").as_user(&caller)
        .send(&app)
        .await;
    let names = names_of(&body);
    assert_eq!(names, vec!["Julia", "Peter"]);

    let (status, body) = Call::get("/api/users/by-letters?letters=ne").as_user(&caller)
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_group_relations() {
    let app = app().await;
    let caller = Uuid::new_v4().to_string();
    let john = create_user(&app, &caller, "John", "Newbie").await;
    let julia = create_user(&app, &caller, "Julia", "Newbie").await;

    let (_, body) = Call::post("/api/group-types", json!({"name": "fakulta", "name_en": "faculty"}))
        .as_user(&caller)
        .send(&app)
        .await;
    let faculty_type = body["entity"]["id"].clone();

    let (_, body) = Call::post("/api/groups", json!({"name": "Demo University"}))
        .as_user(&caller)
        .send(&app)
        .await;
    let university = body["entity"]["id"].clone();

    let (_, body) = Call::post(
        "/api/groups",
        json!({
            "name": "Faculty of Informatics",
            "grouptype_id": faculty_type,
            "mastergroup_id": university,
        }),
    )
    .as_user(&caller)
    .send(&app)
    .await;
    let faculty = body["entity"]["id"].as_str().unwrap().to_string();

    for user in [&john, &julia] {
        let (status, body) = Call::post(
            "/api/memberships",
            json!({"user_id": user["id"], "group_id": faculty}),
        )
        .as_user(&caller)
        .send(&app)
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entity"]["valid"], true);
    }

    let (status, body) = Call::get(&format!("/api/groups/{}/members", faculty)).as_user(&caller)
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names = names_of(&body);
    assert_eq!(names, vec!["John", "Julia"]);

    let (_, body) = Call::get(&format!("/api/groups/{}/mastergroup", faculty)).as_user(&caller)
        .send(&app)
        .await;
    assert_eq!(body["id"], university);

    let (_, body) = Call::get(&format!("/api/groups/{}/grouptype", faculty)).as_user(&caller)
        .send(&app)
        .await;
    assert_eq!(body["name_en"], "faculty");

    let uri = format!("/api/groups/{}/subgroups", university.as_str().unwrap());
    let (_, body) = Call::get(&uri).as_user(&caller).send(&app).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], faculty.as_str());

    let uri = format!("/api/groups/{}/mastergroup", university.as_str().unwrap());
    let (status, body) = Call::get(&uri).as_user(&caller).send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let uri = format!("/api/users/{}/memberships", john["id"].as_str().unwrap());
    let (_, body) = Call::get(&uri).as_user(&caller).send(&app).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["group_id"], faculty.as_str());
}

#[tokio::test]
async fn test_roles_by_user_and_on_group() {
    let app = app().await;
    let caller = Uuid::new_v4().to_string();
    let john = create_user(&app, &caller, "John", "Newbie").await;

    let (_, body) = Call::post("/api/role-categories", json!({"name": "akademická"}))
        .as_user(&caller)
        .send(&app)
        .await;
    let category = body["entity"]["id"].clone();

    let (_, body) = Call::post(
        "/api/role-types",
        json!({"name": "děkan", "name_en": "dean", "category_id": category}),
    )
    .as_user(&caller)
    .send(&app)
    .await;
    let dean = body["entity"]["id"].clone();

    let (_, body) = Call::post("/api/groups", json!({"name": "Faculty"})).as_user(&caller)
        .send(&app)
        .await;
    let group = body["entity"]["id"].clone();

    let (status, body) = Call::post(
        "/api/roles",
        json!({"user_id": john["id"], "group_id": group, "roletype_id": dean}),
    )
    .as_user(&caller)
    .send(&app)
    .await;
    assert_eq!(status, StatusCode::OK);
    let role = body["entity"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/roles/by-user/{}", john["id"].as_str().unwrap());
    let (_, body) = Call::get(&uri).as_user(&caller).send(&app).await;
    assert_eq!(body[0]["id"], role.as_str());

    let uri = format!("/api/roles/on-group/{}", group.as_str().unwrap());
    let (_, body) = Call::get(&uri).as_user(&caller).send(&app).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = Call::get(&format!("/api/roles/{}/roletype", role)).as_user(&caller)
        .send(&app)
        .await;
    assert_eq!(body["name_en"], "dean");

    let uri = format!("/api/role-types/{}/category", dean.as_str().unwrap());
    let (_, body) = Call::get(&uri).as_user(&caller).send(&app).await;
    assert_eq!(body["id"], category);
}

#[tokio::test]
async fn test_role_based_policy() {
    let policy = Arc::new(RoleBasedPolicy::new(
        vec!["administrator".to_string()],
        Vec::<String>::new(),
    ));
    let app = app_with(policy).await;
    let caller = Uuid::new_v4().to_string();

    let (status, body) = Call::post("/api/users", json!({"name": "John"})).as_user(&caller)
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, _) = Call::post("/api/users", json!({"name": "John"}))
        .as_user(&caller)
        .with_roles("lecturer, administrator")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::get("/api/users").as_user(&caller).send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = Call::get("/api/users").send(&app).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
