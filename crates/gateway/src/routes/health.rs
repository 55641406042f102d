#[utoipa::path(
    get,
    path = "health",
    responses(
        (status = OK, description = "Gateway is up", body = String)
    ))]
pub async fn health() -> &'static str {
    "ok"
}
