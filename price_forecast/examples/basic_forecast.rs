use chrono::{Duration, TimeZone, Utc};
use price_forecast::data::{SeriesWindow, TimeSeries};
use price_forecast::metrics::backtest;
use price_forecast::models::{AdditiveConfig, ArimaConfig, FittedForecastModel, Strategy};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Price Forecast: Basic Forecasting Example");
    println!("=========================================\n");

    let series = create_sample_daily_data()?;
    println!("Sample data created: {} daily prices\n", series.len());

    let recent = SeriesWindow::last_days(&series, 90);
    println!("Fitting on the last 90 days ({} prices)\n", recent.len());

    let strategies = vec![
        Strategy::NaiveShift,
        Strategy::Arima(ArimaConfig::new(2, 1, 2)?),
        Strategy::Additive(AdditiveConfig::default()),
    ];

    for strategy in &strategies {
        let model = strategy.fit(&recent)?;
        let forecast = model.predict(7)?;

        println!("{}:", strategy.describe());
        for row in forecast.to_table() {
            match (row.lower, row.upper) {
                (Some(lower), Some(upper)) => println!(
                    "  {}  {:>8.2}  [{:.2}, {:.2}]",
                    row.timestamp.format("%Y-%m-%d"),
                    row.point,
                    lower,
                    upper
                ),
                _ => println!("  {}  {:>8.2}", row.timestamp.format("%Y-%m-%d"), row.point),
            }
        }

        let evaluation = backtest(strategy, &recent, 14)?;
        println!("  14-day holdout MAE: {:.3}\n", evaluation.accuracy.mae);
    }

    Ok(())
}

/// Drifting price with a weekly cycle and a slow oscillation
fn create_sample_daily_data() -> Result<TimeSeries, Box<dyn std::error::Error>> {
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let days = 365;

    let timestamps = (0..days).map(|d| start + Duration::days(d)).collect();
    let values = (0..days)
        .map(|d| {
            let t = d as f64;
            let weekly = 1.5 * (2.0 * std::f64::consts::PI * t / 7.0).sin();
            let cycle = 4.0 * (t / 23.0).sin();
            80.0 + 0.03 * t + weekly + cycle
        })
        .collect();

    Ok(TimeSeries::new(timestamps, values)?)
}
