use super::page::INDEX_HTML;
use crate::facade::{CommandFacade, FacadeResponse, ResponseBody};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
};

pub async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

pub async fn command_handler(
    State(facade): State<CommandFacade>,
    method: Method,
    Path(command): Path<String>,
) -> Response {
    into_response(facade.handle(&command, "", method.as_str()).await)
}

pub async fn command_value_handler(
    State(facade): State<CommandFacade>,
    method: Method,
    Path((command, value)): Path<(String, String)>,
) -> Response {
    into_response(facade.handle(&command, &value, method.as_str()).await)
}

fn into_response(response: FacadeResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response.body.content_type();

    let body = match response.body {
        ResponseBody::Png(png) => Body::from(png),
        ResponseBody::Json(text) | ResponseBody::Html(text) | ResponseBody::Text(text) => {
            Body::from(text)
        }
    };

    let mut reply = Response::new(body);
    *reply.status_mut() = status;
    let headers = reply.headers_mut();
    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
    reply
}
