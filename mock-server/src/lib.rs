//! In-memory stand-in for the Agenda UML backend.
//!
//! Implements the REST contract the client relies on: every response is a
//! `{success, message?, data?, pagination?}` envelope, creates answer 201,
//! unknown ids answer 404, and everything except login and the diagnostics
//! requires a `Bearer` session token issued by `POST /auth/login`.
//!
//! Login does not verify identity tokens: the `accessToken` is taken to be
//! the email of a registered user. [`Store::seeded`] registers
//! [`SEED_ADMIN_EMAIL`].

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const SEED_ADMIN_EMAIL: &str = "admin@uml.edu.ni";
pub const DEFAULT_LIMIT: u64 = 10;

const ROLES: [(&str, &str); 4] = [
    ("admin", "Administrador"),
    ("profesor", "Profesor"),
    ("estudiante", "Estudiante"),
    ("oficina", "Oficina"),
];
const ESTADOS: [&str; 3] = ["pendiente", "aceptada", "rechazada"];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Usuario {
    pub id: i64,
    pub nombres: String,
    pub apellidos: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nivel: Option<i32>,
    pub correo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub celular: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrera_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsuarioInput {
    pub nombres: Option<String>,
    pub apellidos: Option<String>,
    pub fecha: Option<String>,
    pub nivel: Option<i32>,
    pub correo: Option<String>,
    pub celular: Option<String>,
    pub telefono: Option<String>,
    pub rol: Option<String>,
    pub carnet: Option<String>,
    pub carrera_id: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Carrera {
    pub id: i64,
    pub nombre: String,
    pub codigo: i64,
}

#[derive(Debug, Deserialize)]
pub struct CarreraInput {
    pub nombre: String,
    pub codigo: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Grupo {
    pub id: i64,
    pub nombre: String,
    pub creador_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct NuevoGrupo {
    pub nombre: String,
    pub creador_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct GrupoCambios {
    pub nombre: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Miembro {
    pub id: i64,
    pub usuario_id: i64,
    pub grupo_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct NuevoMiembro {
    pub usuario_id: i64,
    pub grupo_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Invitacion {
    pub id: i64,
    pub fecha: String,
    pub sender_id: i64,
    pub receiver: String,
    pub estado: String,
    pub grupo_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct NuevaInvitacion {
    pub sender_id: i64,
    pub receiver: String,
    pub grupo_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct InvitacionCambios {
    pub estado: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

// ---------------------------------------------------------------------------
// Query filters
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct UsuarioQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub rol: Option<String>,
    pub carrera_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GrupoQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub creador_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MiembroQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub grupo_id: Option<i64>,
    pub usuario_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvitacionQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sender_id: Option<i64>,
    pub receiver: Option<String>,
    pub estado: Option<String>,
    pub grupo_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Store {
    last_id: i64,
    sessions: HashMap<String, i64>,
    usuarios: BTreeMap<i64, Usuario>,
    carreras: BTreeMap<i64, Carrera>,
    grupos: BTreeMap<i64, Grupo>,
    miembros: BTreeMap<i64, Miembro>,
    invitaciones: BTreeMap<i64, Invitacion>,
}

impl Store {
    /// Empty store with one admin account.
    pub fn seeded() -> Self {
        let mut store = Self::default();
        let id = store.next_id();
        store.usuarios.insert(
            id,
            Usuario {
                id,
                nombres: "Administrador".to_string(),
                apellidos: "UML".to_string(),
                fecha: None,
                nivel: None,
                correo: SEED_ADMIN_EMAIL.to_string(),
                celular: None,
                telefono: None,
                rol: Some("admin".to_string()),
                carnet: None,
                carrera_id: None,
            },
        );
        store
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone, Debug)]
struct SessionUser {
    id: i64,
    token: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Error response rendered as `{success: false, message}`.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: &'static str,
}

impl Failure {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    fn bad_request(message: &'static str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn conflict(message: &'static str) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor")
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            success: false,
            message: Some(self.message.to_string()),
            data: None,
            pagination: None,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for Failure {
    fn from(rejection: JsonRejection) -> Self {
        debug!(%rejection, "invalid body");
        Self::bad_request("Cuerpo de la petición inválido")
    }
}

impl From<PathRejection> for Failure {
    fn from(rejection: PathRejection) -> Self {
        debug!(%rejection, "invalid path parameter");
        Self::bad_request("Identificador inválido")
    }
}

impl From<QueryRejection> for Failure {
    fn from(rejection: QueryRejection) -> Self {
        debug!(%rejection, "invalid query string");
        Self::bad_request("Parámetros de consulta inválidos")
    }
}

type Reply = Result<Response, Failure>;

/// JSON body whose rejection is rendered as a `Failure`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(Failure))]
struct Payload<T>(T);

/// Path parameters whose rejection is rendered as a `Failure`.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(Failure))]
struct Id<T>(T);

/// Query string whose rejection is rendered as a `Failure`.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(Failure))]
struct Filters<T>(T);

fn envelope<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: None,
        data: Some(data),
        pagination: None,
    })
}

fn ok<T: Serialize>(data: T) -> Response {
    envelope(data).into_response()
}

fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, envelope(data)).into_response()
}

fn done(message: &'static str) -> Response {
    Json(Envelope::<()> {
        success: true,
        message: Some(message.to_string()),
        data: None,
        pagination: None,
    })
    .into_response()
}

fn paginate<T: Serialize>(items: Vec<T>, page: Option<u64>, limit: Option<u64>) -> Response {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);
    let total = items.len() as u64;
    let pages = total.div_ceil(limit);
    let skip = usize::try_from(page.saturating_sub(1).saturating_mul(limit)).unwrap_or(usize::MAX);
    let take = usize::try_from(limit).unwrap_or(usize::MAX);
    let data: Vec<T> = items.into_iter().skip(skip).take(take).collect();
    Json(Envelope {
        success: true,
        message: None,
        data: Some(data),
        pagination: Some(Pagination {
            page,
            limit,
            total,
            pages,
        }),
    })
    .into_response()
}

/// `base` serialized as an object with `extra` fields merged in.
fn with_fields<T: Serialize>(base: &T, extra: Vec<(&str, Value)>) -> Result<Value, Failure> {
    let mut value = serde_json::to_value(base).map_err(|_| Failure::internal())?;
    if let Value::Object(map) = &mut value {
        for (key, field) in extra {
            map.insert(key.to_string(), field);
        }
    }
    Ok(value)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, Failure> {
    serde_json::to_value(value).map_err(|_| Failure::internal())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));

    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(profile))
        .route("/usuarios", get(list_usuarios).post(create_usuario))
        .route("/usuarios/roles", get(list_roles))
        .route(
            "/usuarios/{id}",
            get(get_usuario).put(update_usuario).delete(delete_usuario),
        )
        .route("/carreras", get(list_carreras).post(create_carrera))
        .route(
            "/carreras/{id}",
            get(get_carrera).put(update_carrera).delete(delete_carrera),
        )
        .route("/carreras/{id}/usuarios", get(carrera_usuarios))
        .route("/grupos", get(list_grupos).post(create_grupo))
        .route(
            "/grupos/{id}",
            get(get_grupo).put(update_grupo).delete(delete_grupo),
        )
        .route("/grupos/usuario/{id}", get(grupos_de_usuario))
        .route("/miembros", get(list_miembros).post(add_miembro))
        .route("/miembros/{id}", get(get_miembro).delete(remove_miembro))
        .route("/miembros/grupo/{grupo_id}", get(miembros_de_grupo))
        .route("/miembros/usuario/{usuario_id}", get(miembros_de_usuario))
        .route(
            "/miembros/grupo/{grupo_id}/usuario/{usuario_id}",
            delete(remove_miembro_de_grupo),
        )
        .route(
            "/invitaciones",
            get(list_invitaciones).post(create_invitacion),
        )
        .route(
            "/invitaciones/{id}",
            get(get_invitacion)
                .put(update_invitacion)
                .delete(delete_invitacion),
        )
        .route_layer(middleware::from_fn_with_state(db.clone(), require_session));

    Router::new()
        .route("/auth/login", post(login))
        .route("/health", get(health))
        .route("/info", get(server_info))
        .merge(protected)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_session(State(db): State<Db>, mut req: Request, next: Next) -> Reply {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or(Failure::unauthorized("Token de sesión requerido"))?;
    let id = db
        .read()
        .await
        .sessions
        .get(&token)
        .copied()
        .ok_or(Failure::unauthorized("Sesión inválida o expirada"))?;
    req.extensions_mut().insert(SessionUser { id, token });
    Ok(next.run(req).await)
}

// ---------------------------------------------------------------------------
// Auth and diagnostics
// ---------------------------------------------------------------------------

async fn login(State(db): State<Db>, Payload(body): Payload<LoginBody>) -> Reply {
    let mut store = db.write().await;
    let email = body.access_token.trim();
    let usuario = store
        .usuarios
        .values()
        .find(|u| u.correo.eq_ignore_ascii_case(email))
        .cloned()
        .ok_or(Failure::unauthorized("Usuario no registrado"))?;

    let token = Uuid::new_v4().to_string();
    store.sessions.insert(token.clone(), usuario.id);
    info!(user_id = usuario.id, "session opened");
    Ok(ok(json!({ "usuario": to_value(&usuario)?, "sessionToken": token })))
}

async fn logout(State(db): State<Db>, Extension(session): Extension<SessionUser>) -> Response {
    db.write().await.sessions.remove(&session.token);
    info!(user_id = session.id, "session closed");
    done("Sesión cerrada exitosamente")
}

async fn profile(State(db): State<Db>, Extension(session): Extension<SessionUser>) -> Reply {
    let store = db.read().await;
    let usuario = store
        .usuarios
        .get(&session.id)
        .ok_or(Failure::not_found("Usuario no encontrado"))?;
    Ok(ok(json!({ "usuario": to_value(usuario)? })))
}

async fn health() -> Response {
    Json(json!({
        "success": true,
        "message": "API funcionando correctamente",
        "data": { "status": "ok" }
    }))
    .into_response()
}

async fn server_info() -> Response {
    ok(json!({
        "name": "Agenda UML API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Usuarios
// ---------------------------------------------------------------------------

fn check_rol(rol: Option<&str>) -> Result<(), Failure> {
    match rol {
        Some(r) if !ROLES.iter().any(|(value, _)| *value == r) => {
            Err(Failure::bad_request("Rol inválido"))
        }
        _ => Ok(()),
    }
}

fn check_carrera(store: &Store, carrera_id: Option<i64>) -> Result<(), Failure> {
    match carrera_id {
        Some(id) if !store.carreras.contains_key(&id) => {
            Err(Failure::not_found("Carrera no encontrada"))
        }
        _ => Ok(()),
    }
}

async fn list_usuarios(State(db): State<Db>, Filters(q): Filters<UsuarioQuery>) -> Response {
    let store = db.read().await;
    let needle = q.search.as_deref().map(str::to_lowercase);
    let items: Vec<Usuario> = store
        .usuarios
        .values()
        .filter(|u| match &needle {
            Some(n) => {
                contains_ci(&u.nombres, n) || contains_ci(&u.apellidos, n) || contains_ci(&u.correo, n)
            }
            None => true,
        })
        .filter(|u| q.rol.is_none() || u.rol == q.rol)
        .filter(|u| q.carrera_id.is_none() || u.carrera_id == q.carrera_id)
        .cloned()
        .collect();
    paginate(items, q.page, q.limit)
}

async fn list_roles() -> Response {
    let roles: Vec<Value> = ROLES
        .iter()
        .map(|(value, label)| json!({ "value": value, "label": label }))
        .collect();
    ok(roles)
}

async fn get_usuario(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let store = db.read().await;
    let usuario = store
        .usuarios
        .get(&id)
        .ok_or(Failure::not_found("Usuario no encontrado"))?;
    let carrera = match usuario.carrera_id.and_then(|c| store.carreras.get(&c)) {
        Some(c) => to_value(c)?,
        None => Value::Null,
    };
    let mut extra = Vec::new();
    if !carrera.is_null() {
        extra.push(("carrera", carrera));
    }
    Ok(ok(with_fields(usuario, extra)?))
}

async fn create_usuario(State(db): State<Db>, Payload(input): Payload<UsuarioInput>) -> Reply {
    let mut store = db.write().await;
    let (Some(nombres), Some(apellidos), Some(correo)) = (
        required(input.nombres),
        required(input.apellidos),
        required(input.correo),
    ) else {
        return Err(Failure::bad_request("Nombres, apellidos y correo son requeridos"));
    };
    check_rol(input.rol.as_deref())?;
    check_carrera(&store, input.carrera_id)?;
    if store
        .usuarios
        .values()
        .any(|u| u.correo.eq_ignore_ascii_case(&correo))
    {
        return Err(Failure::conflict("Ya existe un usuario con ese correo"));
    }

    let id = store.next_id();
    let usuario = Usuario {
        id,
        nombres,
        apellidos,
        fecha: input.fecha,
        nivel: input.nivel,
        correo,
        celular: input.celular,
        telefono: input.telefono,
        rol: input.rol,
        carnet: input.carnet,
        carrera_id: input.carrera_id,
    };
    store.usuarios.insert(id, usuario.clone());
    debug!(id, "usuario created");
    Ok(created(usuario))
}

async fn update_usuario(
    State(db): State<Db>,
    Id(id): Id<i64>,
    Payload(input): Payload<UsuarioInput>,
) -> Reply {
    let mut store = db.write().await;
    check_rol(input.rol.as_deref())?;
    check_carrera(&store, input.carrera_id)?;
    if !store.usuarios.contains_key(&id) {
        return Err(Failure::not_found("Usuario no encontrado"));
    }
    if let Some(correo) = input.correo.as_deref().map(str::trim) {
        if store
            .usuarios
            .values()
            .any(|u| u.id != id && u.correo.eq_ignore_ascii_case(correo))
        {
            return Err(Failure::conflict("Ya existe un usuario con ese correo"));
        }
    }
    let usuario = store
        .usuarios
        .get_mut(&id)
        .ok_or(Failure::not_found("Usuario no encontrado"))?;

    if let Some(v) = required(input.nombres) {
        usuario.nombres = v;
    }
    if let Some(v) = required(input.apellidos) {
        usuario.apellidos = v;
    }
    if let Some(v) = required(input.correo) {
        usuario.correo = v;
    }
    if input.fecha.is_some() {
        usuario.fecha = input.fecha;
    }
    if input.nivel.is_some() {
        usuario.nivel = input.nivel;
    }
    if input.celular.is_some() {
        usuario.celular = input.celular;
    }
    if input.telefono.is_some() {
        usuario.telefono = input.telefono;
    }
    if input.rol.is_some() {
        usuario.rol = input.rol;
    }
    if input.carnet.is_some() {
        usuario.carnet = input.carnet;
    }
    if input.carrera_id.is_some() {
        usuario.carrera_id = input.carrera_id;
    }
    Ok(ok(usuario.clone()))
}

async fn delete_usuario(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let mut store = db.write().await;
    store
        .usuarios
        .remove(&id)
        .ok_or(Failure::not_found("Usuario no encontrado"))?;
    let owned: Vec<i64> = store
        .grupos
        .values()
        .filter(|g| g.creador_id == id)
        .map(|g| g.id)
        .collect();
    store.grupos.retain(|_, g| g.creador_id != id);
    store
        .miembros
        .retain(|_, m| m.usuario_id != id && !owned.contains(&m.grupo_id));
    store
        .invitaciones
        .retain(|_, i| i.sender_id != id && !owned.contains(&i.grupo_id));
    store.sessions.retain(|_, user| *user != id);
    Ok(done("Usuario eliminado exitosamente"))
}

// ---------------------------------------------------------------------------
// Carreras
// ---------------------------------------------------------------------------

fn check_carrera_input(store: &Store, input: &CarreraInput, own_id: Option<i64>) -> Result<String, Failure> {
    let nombre = input.nombre.trim();
    if nombre.is_empty() {
        return Err(Failure::bad_request("El nombre es requerido"));
    }
    if store
        .carreras
        .values()
        .any(|c| c.codigo == input.codigo && Some(c.id) != own_id)
    {
        return Err(Failure::conflict("Ya existe una carrera con ese código"));
    }
    Ok(nombre.to_string())
}

async fn list_carreras(State(db): State<Db>) -> Response {
    let store = db.read().await;
    ok(store.carreras.values().cloned().collect::<Vec<_>>())
}

async fn get_carrera(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let store = db.read().await;
    let carrera = store
        .carreras
        .get(&id)
        .ok_or(Failure::not_found("Carrera no encontrada"))?;
    Ok(ok(carrera.clone()))
}

async fn create_carrera(State(db): State<Db>, Payload(input): Payload<CarreraInput>) -> Reply {
    let mut store = db.write().await;
    let nombre = check_carrera_input(&store, &input, None)?;
    let id = store.next_id();
    let carrera = Carrera {
        id,
        nombre,
        codigo: input.codigo,
    };
    store.carreras.insert(id, carrera.clone());
    debug!(id, "carrera created");
    Ok(created(carrera))
}

async fn update_carrera(
    State(db): State<Db>,
    Id(id): Id<i64>,
    Payload(input): Payload<CarreraInput>,
) -> Reply {
    let mut store = db.write().await;
    if !store.carreras.contains_key(&id) {
        return Err(Failure::not_found("Carrera no encontrada"));
    }
    let nombre = check_carrera_input(&store, &input, Some(id))?;
    let carrera = Carrera {
        id,
        nombre,
        codigo: input.codigo,
    };
    store.carreras.insert(id, carrera.clone());
    Ok(ok(carrera))
}

async fn delete_carrera(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let mut store = db.write().await;
    store
        .carreras
        .remove(&id)
        .ok_or(Failure::not_found("Carrera no encontrada"))?;
    for usuario in store.usuarios.values_mut() {
        if usuario.carrera_id == Some(id) {
            usuario.carrera_id = None;
        }
    }
    Ok(done("Carrera eliminada exitosamente"))
}

async fn carrera_usuarios(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let store = db.read().await;
    let carrera = store
        .carreras
        .get(&id)
        .ok_or(Failure::not_found("Carrera no encontrada"))?;
    let usuarios: Vec<&Usuario> = store
        .usuarios
        .values()
        .filter(|u| u.carrera_id == Some(id))
        .collect();
    Ok(ok(json!({ "carrera": to_value(carrera)?, "usuarios": to_value(&usuarios)? })))
}

// ---------------------------------------------------------------------------
// Grupos
// ---------------------------------------------------------------------------

async fn list_grupos(State(db): State<Db>, Filters(q): Filters<GrupoQuery>) -> Response {
    let store = db.read().await;
    let needle = q.search.as_deref().map(str::to_lowercase);
    let items: Vec<Grupo> = store
        .grupos
        .values()
        .filter(|g| needle.as_deref().map_or(true, |n| contains_ci(&g.nombre, n)))
        .filter(|g| q.creador_id.map_or(true, |c| g.creador_id == c))
        .cloned()
        .collect();
    paginate(items, q.page, q.limit)
}

async fn get_grupo(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let store = db.read().await;
    let grupo = store
        .grupos
        .get(&id)
        .ok_or(Failure::not_found("Grupo no encontrado"))?;
    let miembros: Vec<&Miembro> = store.miembros.values().filter(|m| m.grupo_id == id).collect();
    let invitaciones: Vec<&Invitacion> = store
        .invitaciones
        .values()
        .filter(|i| i.grupo_id == id)
        .collect();
    let mut extra = vec![
        ("miembros", to_value(&miembros)?),
        ("invitaciones", to_value(&invitaciones)?),
    ];
    if let Some(creador) = store.usuarios.get(&grupo.creador_id) {
        extra.push(("creador", to_value(creador)?));
    }
    Ok(ok(with_fields(grupo, extra)?))
}

async fn create_grupo(State(db): State<Db>, Payload(input): Payload<NuevoGrupo>) -> Reply {
    let mut store = db.write().await;
    let nombre = input.nombre.trim().to_string();
    if nombre.is_empty() {
        return Err(Failure::bad_request("El nombre es requerido"));
    }
    if !store.usuarios.contains_key(&input.creador_id) {
        return Err(Failure::not_found("Usuario no encontrado"));
    }
    let id = store.next_id();
    let grupo = Grupo {
        id,
        nombre,
        creador_id: input.creador_id,
    };
    store.grupos.insert(id, grupo.clone());
    Ok(created(grupo))
}

async fn update_grupo(
    State(db): State<Db>,
    Id(id): Id<i64>,
    Payload(input): Payload<GrupoCambios>,
) -> Reply {
    let mut store = db.write().await;
    let nombre = input.nombre.trim().to_string();
    if nombre.is_empty() {
        return Err(Failure::bad_request("El nombre es requerido"));
    }
    let grupo = store
        .grupos
        .get_mut(&id)
        .ok_or(Failure::not_found("Grupo no encontrado"))?;
    grupo.nombre = nombre;
    Ok(ok(grupo.clone()))
}

async fn delete_grupo(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let mut store = db.write().await;
    store
        .grupos
        .remove(&id)
        .ok_or(Failure::not_found("Grupo no encontrado"))?;
    store.miembros.retain(|_, m| m.grupo_id != id);
    store.invitaciones.retain(|_, i| i.grupo_id != id);
    Ok(done("Grupo eliminado exitosamente"))
}

async fn grupos_de_usuario(State(db): State<Db>, Id(id): Id<i64>) -> Response {
    let store = db.read().await;
    let grupos: Vec<Grupo> = store
        .grupos
        .values()
        .filter(|g| {
            g.creador_id == id
                || store
                    .miembros
                    .values()
                    .any(|m| m.grupo_id == g.id && m.usuario_id == id)
        })
        .cloned()
        .collect();
    ok(grupos)
}

// ---------------------------------------------------------------------------
// Miembros
// ---------------------------------------------------------------------------

async fn list_miembros(State(db): State<Db>, Filters(q): Filters<MiembroQuery>) -> Response {
    let store = db.read().await;
    let items: Vec<Miembro> = store
        .miembros
        .values()
        .filter(|m| q.grupo_id.map_or(true, |g| m.grupo_id == g))
        .filter(|m| q.usuario_id.map_or(true, |u| m.usuario_id == u))
        .cloned()
        .collect();
    paginate(items, q.page, q.limit)
}

async fn get_miembro(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let store = db.read().await;
    let miembro = store
        .miembros
        .get(&id)
        .ok_or(Failure::not_found("Miembro no encontrado"))?;
    Ok(ok(miembro.clone()))
}

async fn add_miembro(State(db): State<Db>, Payload(input): Payload<NuevoMiembro>) -> Reply {
    let mut store = db.write().await;
    if !store.usuarios.contains_key(&input.usuario_id) {
        return Err(Failure::not_found("Usuario no encontrado"));
    }
    if !store.grupos.contains_key(&input.grupo_id) {
        return Err(Failure::not_found("Grupo no encontrado"));
    }
    if store
        .miembros
        .values()
        .any(|m| m.grupo_id == input.grupo_id && m.usuario_id == input.usuario_id)
    {
        return Err(Failure::conflict("El usuario ya es miembro del grupo"));
    }
    let id = store.next_id();
    let miembro = Miembro {
        id,
        usuario_id: input.usuario_id,
        grupo_id: input.grupo_id,
    };
    store.miembros.insert(id, miembro.clone());
    Ok(created(miembro))
}

async fn remove_miembro(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let mut store = db.write().await;
    store
        .miembros
        .remove(&id)
        .ok_or(Failure::not_found("Miembro no encontrado"))?;
    Ok(done("Miembro eliminado exitosamente"))
}

async fn miembros_de_grupo(State(db): State<Db>, Id(grupo_id): Id<i64>) -> Response {
    let store = db.read().await;
    let miembros: Vec<Miembro> = store
        .miembros
        .values()
        .filter(|m| m.grupo_id == grupo_id)
        .cloned()
        .collect();
    ok(miembros)
}

async fn miembros_de_usuario(State(db): State<Db>, Id(usuario_id): Id<i64>) -> Response {
    let store = db.read().await;
    let miembros: Vec<Miembro> = store
        .miembros
        .values()
        .filter(|m| m.usuario_id == usuario_id)
        .cloned()
        .collect();
    ok(miembros)
}

async fn remove_miembro_de_grupo(
    State(db): State<Db>,
    Id((grupo_id, usuario_id)): Id<(i64, i64)>,
) -> Reply {
    let mut store = db.write().await;
    let id = store
        .miembros
        .values()
        .find(|m| m.grupo_id == grupo_id && m.usuario_id == usuario_id)
        .map(|m| m.id)
        .ok_or(Failure::not_found("El usuario no es miembro del grupo"))?;
    store.miembros.remove(&id);
    Ok(done("Miembro eliminado del grupo"))
}

// ---------------------------------------------------------------------------
// Invitaciones
// ---------------------------------------------------------------------------

async fn list_invitaciones(State(db): State<Db>, Filters(q): Filters<InvitacionQuery>) -> Response {
    let store = db.read().await;
    let items: Vec<Invitacion> = store
        .invitaciones
        .values()
        .filter(|i| q.sender_id.map_or(true, |s| i.sender_id == s))
        .filter(|i| q.receiver.as_deref().map_or(true, |r| i.receiver == r))
        .filter(|i| q.estado.as_deref().map_or(true, |e| i.estado == e))
        .filter(|i| q.grupo_id.map_or(true, |g| i.grupo_id == g))
        .cloned()
        .collect();
    paginate(items, q.page, q.limit)
}

async fn get_invitacion(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let store = db.read().await;
    let invitacion = store
        .invitaciones
        .get(&id)
        .ok_or(Failure::not_found("Invitación no encontrada"))?;
    Ok(ok(invitacion.clone()))
}

async fn create_invitacion(State(db): State<Db>, Payload(input): Payload<NuevaInvitacion>) -> Reply {
    let mut store = db.write().await;
    let receiver = input.receiver.trim().to_string();
    if receiver.is_empty() {
        return Err(Failure::bad_request("El destinatario es requerido"));
    }
    if !store.usuarios.contains_key(&input.sender_id) {
        return Err(Failure::not_found("Usuario no encontrado"));
    }
    if !store.grupos.contains_key(&input.grupo_id) {
        return Err(Failure::not_found("Grupo no encontrado"));
    }
    let id = store.next_id();
    let invitacion = Invitacion {
        id,
        fecha: chrono::Utc::now().to_rfc3339(),
        sender_id: input.sender_id,
        receiver,
        estado: "pendiente".to_string(),
        grupo_id: input.grupo_id,
    };
    store.invitaciones.insert(id, invitacion.clone());
    Ok(created(invitacion))
}

async fn update_invitacion(
    State(db): State<Db>,
    Id(id): Id<i64>,
    Payload(input): Payload<InvitacionCambios>,
) -> Reply {
    if !ESTADOS.contains(&input.estado.as_str()) {
        return Err(Failure::bad_request("Estado inválido"));
    }
    let mut store = db.write().await;
    let invitacion = store
        .invitaciones
        .get_mut(&id)
        .ok_or(Failure::not_found("Invitación no encontrada"))?;
    invitacion.estado = input.estado;
    Ok(ok(invitacion.clone()))
}

async fn delete_invitacion(State(db): State<Db>, Id(id): Id<i64>) -> Reply {
    let mut store = db.write().await;
    store
        .invitaciones
        .remove(&id)
        .ok_or(Failure::not_found("Invitación no encontrada"))?;
    Ok(done("Invitación eliminada exitosamente"))
}
