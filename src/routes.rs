use crate::auth::{check_authorization, Credentials};
use crate::error::{AppError, AppResult};
use crate::matrix::{matrix_view, open_cell};
use crate::policy::{authorize, Action};
use crate::render::{render_management_report, render_payment_matrix};
use crate::reports::{summarize, ManagementReport, PaymentMatrixReport};
use crate::repository::Registry;
use crate::schemas::{Cell, MemberForm, PasswordConfirmation, PaymentDraft, User};
use crate::store::Store;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use chrono::{Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub struct AppState {
    pub registry: RwLock<Registry>,
    pub credentials: Credentials,
    pub store: Store,
    pub association_name: String,
}

impl AppState {
    pub fn new(
        registry: Registry,
        credentials: Credentials,
        store: Store,
        association_name: String,
    ) -> Self {
        AppState {
            registry: RwLock::new(registry),
            credentials,
            store,
            association_name,
        }
    }

    fn operator(&self, request: &HttpRequest) -> AppResult<User> {
        check_authorization(request, &self.credentials, Utc::now().timestamp())
    }
}

#[derive(Deserialize, Serialize)]
struct LoginJson {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct SessionJson {
    token: String,
    user: User,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Option<String>,
}

#[derive(Deserialize)]
struct YearQuery {
    year: Option<i32>,
}

#[derive(Deserialize, Serialize)]
struct ActiveJson {
    active: bool,
}

#[post("/login")]
async fn login(state: web::Data<AppState>, json: web::Json<LoginJson>) -> AppResult<HttpResponse> {
    let LoginJson { username, password } = json.into_inner();
    let (user, token) = state
        .credentials
        .login(&username, &password, Utc::now().timestamp())?;
    tracing::info!(user = %user.username, "operator logged in");
    Ok(HttpResponse::Ok().json(SessionJson { token, user }))
}

#[get("/members")]
async fn list_members(
    request: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::ViewMembers)?;
    let registry = state.registry.read().await;
    let members = registry.search_members(query.search.as_deref().unwrap_or(""));
    Ok(HttpResponse::Ok().json(members))
}

#[get("/members/form")]
async fn blank_member_form(
    request: HttpRequest,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::EditMembers)?;
    Ok(HttpResponse::Ok().json(MemberForm::default()))
}

#[get("/members/{id}/form")]
async fn member_form(
    request: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::EditMembers)?;
    let registry = state.registry.read().await;
    let member = registry
        .member(&id)
        .ok_or_else(|| AppError::not_found(format!("Member {id}")))?;
    Ok(HttpResponse::Ok().json(MemberForm::from(member)))
}

#[post("/members")]
async fn add_member(
    request: HttpRequest,
    state: web::Data<AppState>,
    form: web::Json<MemberForm>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::EditMembers)?;
    let mut registry = state.registry.write().await;
    let mut next = registry.clone();
    let member = next.create_member(form.into_inner(), &operator, Utc::now())?;
    state.store.save_member(&member).await?;
    *registry = next;
    Ok(HttpResponse::Created().json(member))
}

#[put("/members/{id}")]
async fn edit_member(
    request: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<String>,
    form: web::Json<MemberForm>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::EditMembers)?;
    let mut registry = state.registry.write().await;
    let mut next = registry.clone();
    let member = next.update_member(&id, form.into_inner(), &operator, Utc::now())?;
    state.store.save_member(&member).await?;
    *registry = next;
    Ok(HttpResponse::Ok().json(member))
}

#[put("/members/{id}/active")]
async fn set_member_active(
    request: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<String>,
    json: web::Json<ActiveJson>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::EditMembers)?;
    let mut registry = state.registry.write().await;
    let mut next = registry.clone();
    let member = next.set_member_active(&id, json.active, &operator, Utc::now())?;
    state.store.save_member(&member).await?;
    *registry = next;
    Ok(HttpResponse::Ok().json(member))
}

#[delete("/members/{id}")]
async fn delete_member(
    request: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<String>,
    confirmation: web::Json<PasswordConfirmation>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::DeleteMembers)?;
    let mut registry = state.registry.write().await;
    let mut next = registry.clone();
    let removed =
        next.delete_member(&id, &operator, &confirmation.password, &state.credentials)?;
    state.store.delete_member(&removed.id).await?;
    *registry = next;
    Ok(HttpResponse::Ok().json(removed))
}

#[get("/payments/{year}")]
async fn payment_matrix(
    request: HttpRequest,
    state: web::Data<AppState>,
    year: web::Path<i32>,
    query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::ViewPayments)?;
    let registry = state.registry.read().await;
    let view = matrix_view(
        &registry.members(),
        &registry.payments(),
        year.into_inner(),
        query.search.as_deref().unwrap_or(""),
    );
    Ok(HttpResponse::Ok().json(view))
}

#[get("/payments/{year}/report")]
async fn payment_report(
    request: HttpRequest,
    state: web::Data<AppState>,
    year: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::ViewPayments)?;
    let registry = state.registry.read().await;
    let report = PaymentMatrixReport::build(
        &state.association_name,
        &registry.members(),
        &registry.payments(),
        year.into_inner(),
        &operator.name,
        Local::now().naive_local(),
    );
    tracing::info!(year = report.year, operator = %operator.name, "payment report issued");
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_payment_matrix(&report)))
}

#[get("/payments/{year}/{member_id}/{month}")]
async fn open_payment_cell(
    request: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(i32, String, u8)>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    let (year, member_id, month) = path.into_inner();
    let registry = state.registry.read().await;
    let member_name = registry
        .member(&member_id)
        .map(|member| member.name.clone())
        .ok_or_else(|| AppError::not_found(format!("Member {member_id}")))?;
    let cell = Cell {
        member_id,
        month,
        year,
    };
    let opened = open_cell(
        &registry.payments(),
        cell,
        &member_name,
        &operator,
        Local::now().date_naive(),
    )?;
    Ok(HttpResponse::Ok().json(opened))
}

#[put("/payments/{year}/{member_id}/{month}")]
async fn save_payment_cell(
    request: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(i32, String, u8)>,
    draft: web::Json<PaymentDraft>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::EditPayments)?;
    let (year, member_id, month) = path.into_inner();
    let cell = Cell {
        member_id,
        month,
        year,
    };
    let mut registry = state.registry.write().await;
    let mut next = registry.clone();
    let payment = next.save_payment(&cell, &draft)?;
    state.store.save_payment(&payment).await?;
    *registry = next;
    Ok(HttpResponse::Ok().json(payment))
}

#[delete("/payments/entry/{id}")]
async fn delete_payment(
    request: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<String>,
    confirmation: web::Json<PasswordConfirmation>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::DeletePayments)?;
    let mut registry = state.registry.write().await;
    let mut next = registry.clone();
    let removed =
        next.delete_payment(&id, &operator, &confirmation.password, &state.credentials)?;
    state.store.delete_payment(&removed.id).await?;
    *registry = next;
    Ok(HttpResponse::Ok().json(removed))
}

#[get("/reports")]
async fn report_summary(
    request: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<YearQuery>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::ViewReports)?;
    let year = query.year.unwrap_or_else(|| Local::now().year());
    let registry = state.registry.read().await;
    let summary = summarize(&registry.members(), &registry.payments(), year);
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/reports/print")]
async fn print_report(
    request: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<YearQuery>,
) -> AppResult<HttpResponse> {
    let operator = state.operator(&request)?;
    authorize(&operator, Action::ViewReports)?;
    let year = query.year.unwrap_or_else(|| Local::now().year());
    let registry = state.registry.read().await;
    let report = ManagementReport::build(
        &state.association_name,
        &registry.members(),
        &registry.payments(),
        year,
        Local::now().naive_local(),
    );
    tracing::info!(year, operator = %operator.name, "management report issued");
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_management_report(&report)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(list_members)
        .service(blank_member_form)
        .service(member_form)
        .service(add_member)
        .service(edit_member)
        .service(set_member_active)
        .service(delete_member)
        .service(payment_report)
        .service(delete_payment)
        .service(payment_matrix)
        .service(open_payment_cell)
        .service(save_payment_cell)
        .service(print_report)
        .service(report_summary);
}
