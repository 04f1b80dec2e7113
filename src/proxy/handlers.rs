use crate::error::CompareError;
use crate::proxy::app_state::AppState;
use crate::types::location::LatLon;
use crate::types::series::Series;
use crate::types::traits::utils::parse_calendar_date;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{Local, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct NasaQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// One day as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NasaRecord {
    #[serde(rename = "Fecha")]
    pub fecha: String,
    #[serde(rename = "Radiacion")]
    pub radiacion: Option<f64>,
    #[serde(rename = "Humedad")]
    pub humedad: Option<f64>,
}

impl NasaRecord {
    pub fn from_series(series: &Series) -> Vec<NasaRecord> {
        series
            .observations()
            .iter()
            .map(|obs| NasaRecord {
                fecha: obs.date.format("%Y-%m-%d").to_string(),
                radiacion: obs.radiation,
                humedad: obs.humidity,
            })
            .collect()
    }
}

pub async fn health_check() -> &'static str {
    "ok"
}

/// `GET /nasa-datos`. Failures are reported in the body as `{"error": "..."}` with a
/// 200 status, which is what existing clients expect.
pub async fn nasa_datos(
    Query(query): Query<NasaQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<Value> {
    match fetch_records(&state, query).await {
        Ok(records) => Json(json!(records)),
        Err(e) => {
            warn!("nasa-datos request failed: {}", e);
            Json(json!({ "error": e.to_string() }))
        }
    }
}

async fn fetch_records(state: &AppState, query: NasaQuery) -> Result<Vec<NasaRecord>, CompareError> {
    let location = LatLon(
        query.lat.unwrap_or(state.defaults.location.latitude()),
        query.lon.unwrap_or(state.defaults.location.longitude()),
    );
    let start = parse_query_date(
        query
            .start_date
            .as_deref()
            .unwrap_or(&state.defaults.start_date),
    )?;
    let end = match query.end_date.as_deref() {
        Some(raw) => parse_query_date(raw)?,
        None => Local::now().date_naive(),
    };

    let series = state
        .client
        .fetch()
        .location(location)
        .start(start)
        .end(end)
        .call()
        .await?;
    Ok(NasaRecord::from_series(&series))
}

fn parse_query_date(raw: &str) -> Result<NaiveDate, CompareError> {
    parse_calendar_date(raw).ok_or(CompareError::DateParsingError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::app_state::QueryDefaults;
    use crate::proxy::router;
    use crate::remote::fetcher::tests::{mock_power, spawn_server, ONE_DAY};
    use crate::remote::fetcher::PowerClient;
    use axum::http::StatusCode;
    use std::error::Error;

    async fn proxy(upstream_status: StatusCode, upstream_body: &'static str) -> String {
        let base_url = mock_power(upstream_status, upstream_body).await;
        let state = Arc::new(AppState {
            client: PowerClient::builder().base_url(base_url).build().unwrap(),
            defaults: QueryDefaults::default(),
        });
        spawn_server(router(state)).await
    }

    #[tokio::test]
    async fn test_nasa_datos_returns_records() -> Result<(), Box<dyn Error>> {
        let addr = proxy(StatusCode::OK, ONE_DAY).await;
        let records: Vec<NasaRecord> = reqwest::get(format!(
            "{addr}/nasa-datos?lat=-0.22&lon=-78.36&start_date=20240101&end_date=20240101"
        ))
        .await?
        .json()
        .await?;

        assert_eq!(
            records,
            vec![NasaRecord {
                fecha: "2024-01-01".to_string(),
                radiacion: Some(610.0),
                humedad: Some(55.0),
            }]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_defaults_apply() -> Result<(), Box<dyn Error>> {
        let addr = proxy(StatusCode::OK, ONE_DAY).await;
        let response = reqwest::get(format!("{addr}/nasa-datos")).await?;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await?;
        assert!(body.is_array(), "{body}");
        Ok(())
    }

    #[tokio::test]
    async fn test_upstream_failure_is_reported_in_body() -> Result<(), Box<dyn Error>> {
        let addr = proxy(StatusCode::INTERNAL_SERVER_ERROR, "oops").await;
        let response = reqwest::get(format!("{addr}/nasa-datos?start_date=20240101")).await?;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await?;
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()), "{body}");
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_date_is_reported_in_body() -> Result<(), Box<dyn Error>> {
        let addr = proxy(StatusCode::OK, ONE_DAY).await;
        let body: Value = reqwest::get(format!("{addr}/nasa-datos?start_date=hoy"))
            .await?
            .json()
            .await?;
        assert!(body.get("error").is_some(), "{body}");
        Ok(())
    }

    #[tokio::test]
    async fn test_health_and_cors() -> Result<(), Box<dyn Error>> {
        let addr = proxy(StatusCode::OK, ONE_DAY).await;
        let response = reqwest::Client::new()
            .get(format!("{addr}/healthz"))
            .header("Origin", "http://localhost:8501")
            .send()
            .await?;
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
        assert_eq!(response.text().await?, "ok");
        Ok(())
    }
}
