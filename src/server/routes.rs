use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::Path;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use futures::Stream;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::lobby::service::RoomService;
use crate::lobby::types::RoomId;
use crate::relay::watcher::RoomEvents;

use super::dto::{
    AcceptedResponse, CreateRoomRequest, GuessListResponse, GuessRequest, GuessResponse,
    JoinByCodeRequest, LeaveRoomRequest, QuickJoinRequest, RoomResponse, RoomViewResponse,
    StrokeRequest, UserResponse,
};
use super::error::ApiError;
use super::logging::log_requests;
use super::stream::room_event_stream;

#[derive(Clone)]
pub struct ServerContext {
    pub service: Arc<dyn RoomService>,
    pub events: Arc<RoomEvents>,
}

pub struct SketchPartyServer {
    router: Router,
}

impl SketchPartyServer {
    pub fn new(service: Arc<dyn RoomService>, events: Arc<RoomEvents>) -> Self {
        let context = Arc::new(ServerContext { service, events });

        let router = Router::new()
            .route("/users", post(create_user))
            .route("/users/:user_id", get(get_user))
            .route("/rooms", post(create_room))
            .route("/rooms/join", post(join_by_code))
            .route("/rooms/quick-join", post(quick_join))
            .route("/rooms/:room_id", get(get_room))
            .route("/rooms/:room_id/leave", post(leave_room))
            .route("/rooms/:room_id/start", post(start_game))
            .route("/rooms/:room_id/guesses", post(submit_guess).get(list_guesses))
            .route(
                "/rooms/:room_id/strokes",
                post(save_stroke).delete(clear_canvas),
            )
            .route("/rooms/:room_id/events", get(room_events))
            .layer(
                ServiceBuilder::new()
                    .layer(Extension(context))
                    .layer(middleware::from_fn(log_requests))
                    .layer(CorsLayer::permissive()),
            );

        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn create_user(
    Extension(ctx): Extension<Arc<ServerContext>>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = ctx.service.create_anonymous_user().await?;
    Ok(Json(UserResponse { user }))
}

async fn get_user(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(user_id): Path<uuid::Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = ctx.service.get_user(user_id).await?;
    Ok(Json(UserResponse { user }))
}

async fn create_room(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx
        .service
        .create_room(request.host_id, request.is_public)
        .await?;
    Ok(Json(RoomResponse { room }))
}

async fn join_by_code(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Json(request): Json<JoinByCodeRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx
        .service
        .join_room_by_code(&request.code, request.user_id)
        .await?;
    Ok(Json(RoomResponse { room }))
}

async fn quick_join(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Json(request): Json<QuickJoinRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx.service.join_random_room(request.user_id).await?;
    Ok(Json(RoomResponse { room }))
}

async fn get_room(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoomViewResponse>, ApiError> {
    let room = ctx.service.room_with_players(room_id).await?;
    Ok(Json(RoomViewResponse { room }))
}

async fn leave_room(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(room_id): Path<RoomId>,
    Json(request): Json<LeaveRoomRequest>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    ctx.service.leave_room(room_id, request.user_id).await?;
    Ok(Json(AcceptedResponse::ok()))
}

async fn start_game(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx.service.start_game(room_id).await?;
    Ok(Json(RoomResponse { room }))
}

async fn submit_guess(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(room_id): Path<RoomId>,
    Json(request): Json<GuessRequest>,
) -> Result<Json<GuessResponse>, ApiError> {
    let outcome = ctx
        .service
        .submit_guess(room_id, request.user_id, &request.guess)
        .await?;
    Ok(Json(GuessResponse { outcome }))
}

async fn list_guesses(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<GuessListResponse>, ApiError> {
    let guesses = ctx.service.guesses(room_id).await?;
    Ok(Json(GuessListResponse { guesses }))
}

async fn save_stroke(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(room_id): Path<RoomId>,
    Json(request): Json<StrokeRequest>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    ctx.service
        .save_stroke(room_id, request.user_id, request.stroke)
        .await?;
    Ok(Json(AcceptedResponse::ok()))
}

async fn clear_canvas(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    ctx.service.clear_canvas(room_id).await?;
    Ok(Json(AcceptedResponse::ok()))
}

async fn room_events(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(room_id): Path<RoomId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    ctx.service.room_with_players(room_id).await?;
    Ok(room_event_stream(&ctx.events, room_id))
}
