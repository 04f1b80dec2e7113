//! Compares a station export against NASA POWER for the Mica Campamento station.
//!
//! cargo run --example compare_mica -- C09-Mica_Campamento_Radiacion_solar-Diario.csv

use chrono::NaiveDate;
use solar_compare::{CompareError, ComparisonRequest, LatLon, Session};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    configure_polars_display();
    let path = env::args()
        .nth(1)
        .ok_or("usage: compare_mica <historical export>")?;
    let radiation = tokio::fs::read(&path).await?;

    let mut session = Session::builder().build()?;
    let request = ComparisonRequest::builder()
        .radiation(radiation)
        .label("2008")
        .location(LatLon(-0.22, -78.36))
        .start(NaiveDate::from_ymd_opt(2024, 1, 1).ok_or(CompareError::DateParsingError)?)
        .end(NaiveDate::from_ymd_opt(2025, 6, 22).ok_or(CompareError::DateParsingError)?)
        .build();

    let comparison = session.run_action(&request).await?;
    println!("{}", comparison.summary.to_frame()?);
    println!("{}", comparison.dataset.sorted_by_date()?.tail(10));

    Ok(())
}

fn configure_polars_display() {
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
