use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, warn};
use uuid::Uuid;

use nebo_core::errors::{ApplicationError, InterfaceError};
use nebo_slack::blocks;
use nebo_slack::commands::{
    normalize_command, CommandRouteError, CommandRouter, NeboCommandService, SlashCommandPayload,
};

pub struct SlashState<S> {
    router: Arc<CommandRouter<S>>,
    verification_token: SecretString,
}

impl<S> Clone for SlashState<S> {
    fn clone(&self) -> Self {
        Self { router: Arc::clone(&self.router), verification_token: self.verification_token.clone() }
    }
}

impl<S> SlashState<S> {
    pub fn new(router: Arc<CommandRouter<S>>, verification_token: SecretString) -> Self {
        Self { router, verification_token }
    }
}

pub fn router<S>(state: SlashState<S>) -> Router
where
    S: NeboCommandService + 'static,
{
    Router::new().route("/slack/commands", post(handle_command::<S>)).with_state(state)
}

async fn handle_command<S>(
    State(state): State<SlashState<S>>,
    Form(mut payload): Form<SlashCommandPayload>,
) -> Response
where
    S: NeboCommandService + 'static,
{
    let correlation_id = Uuid::new_v4().to_string();
    payload.request_id = correlation_id.clone();

    info!(
        event_name = "ingress.slack.command_received",
        correlation_id = %correlation_id,
        command = %payload.command,
        channel_id = %payload.channel_id,
        user_id = %payload.user_id,
        "slash command received"
    );

    if payload.token != state.verification_token.expose_secret() {
        warn!(
            event_name = "ingress.slack.verification_failed",
            correlation_id = %correlation_id,
            command = %payload.command,
            "slack verification failed"
        );
        return interface_response(ApplicationError::Unverified.into_interface(&correlation_id));
    }

    let envelope = match normalize_command(payload) {
        Ok(envelope) => envelope,
        Err(parse_error) => {
            return interface_response(
                ApplicationError::InvalidCommand(parse_error.to_string())
                    .into_interface(&correlation_id),
            );
        }
    };

    match state.router.route(envelope).await {
        Ok(message) => {
            info!(
                event_name = "ingress.slack.command_answered",
                correlation_id = %correlation_id,
                attachments = message.attachments.len(),
                "slash command answered"
            );
            (StatusCode::OK, Json(message)).into_response()
        }
        Err(CommandRouteError::Application(app_error)) => {
            interface_response(app_error.into_interface(&correlation_id))
        }
        Err(CommandRouteError::Service(message)) => interface_response(InterfaceError::Internal {
            message,
            correlation_id: correlation_id.clone(),
        }),
    }
}

fn interface_response(interface: InterfaceError) -> Response {
    let (status, summary) = match &interface {
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
        InterfaceError::Unauthorized { .. } => {
            (StatusCode::UNAUTHORIZED, interface.user_message().to_owned())
        }
        InterfaceError::ServiceUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, interface.user_message().to_owned())
        }
        InterfaceError::Internal { message, .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
        }
    };

    if status.is_server_error() {
        error!(
            event_name = "ingress.slack.command_failed",
            correlation_id = %interface.correlation_id(),
            status = status.as_u16(),
            error = %interface,
            "slash command failed"
        );
    }

    (status, Json(blocks::error_message(&summary, interface.correlation_id()))).into_response()
}
