use chrono::{Duration, TimeZone, Utc};
use price_forecast::cache::{CacheConfig, ModelCache, ModelKey, SourceKey};
use price_forecast::data::{LoadReport, LoadedSeries, TimeSeries};
use price_forecast::error::ForecastError;
use price_forecast::models::{FittedForecastModel, Strategy};
use price_forecast::pipeline::{ForecastPipeline, ForecastRequest};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::NamedTempFile;

fn loaded(values: Vec<f64>) -> LoadedSeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let timestamps = (0..values.len() as i64)
        .map(|d| start + Duration::days(d))
        .collect();

    LoadedSeries {
        report: LoadReport {
            rows_read: values.len(),
            ..LoadReport::default()
        },
        series: TimeSeries::new(timestamps, values).unwrap(),
    }
}

#[test]
fn test_concurrent_fits_run_once() {
    let cache = Arc::new(ModelCache::default());
    let fits = Arc::new(AtomicUsize::new(0));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let key = ModelKey::new(SourceKey::named("brent"), "naive");

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let fits = Arc::clone(&fits);
            let barrier = Arc::clone(&barrier);
            let key = key.clone();

            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_fit(&key, || {
                        fits.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(50));
                        Strategy::NaiveShift.fit(&loaded(vec![1.0, 2.0, 3.0]).series)
                    })
                    .unwrap()
            })
        })
        .collect();

    let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(fits.load(Ordering::SeqCst), 1);
    assert!(models.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(models[0].predict(1).unwrap().values(), &[3.0]);
}

#[test]
fn test_failure_reaches_every_waiter_and_is_retried() {
    let cache = Arc::new(ModelCache::default());
    let attempts = Arc::new(AtomicUsize::new(0));
    let threads = 4;
    let barrier = Arc::new(Barrier::new(threads));
    let key = SourceKey::named("broken");

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let attempts = Arc::clone(&attempts);
            let barrier = Arc::clone(&barrier);
            let key = key.clone();

            thread::spawn(move || {
                barrier.wait();
                cache.get_or_load(&key, || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(std::time::Duration::from_millis(50));
                    Err(ForecastError::DataUnavailable("feed down".to_string()))
                })
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.join().unwrap();
        assert!(matches!(outcome, Err(ForecastError::DataUnavailable(_))));
    }
    assert_eq!(cache.series_len(), 0);

    // Not cached: the next call loads again and succeeds
    let recovered = cache.get_or_load(&key, || Ok(loaded(vec![5.0]))).unwrap();
    assert_eq!(recovered.series.values(), &[5.0]);
    assert!(attempts.load(Ordering::SeqCst) >= 1);
    assert_eq!(cache.series_len(), 1);
}

#[test]
fn test_capacity_evicts_oldest_ready_entry() {
    let cache = ModelCache::new(CacheConfig::with_capacity(2).unwrap());
    let loads = AtomicUsize::new(0);

    for name in ["a", "b", "c"] {
        cache
            .get_or_load(&SourceKey::named(name), || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(loaded(vec![1.0]))
            })
            .unwrap();
    }
    assert_eq!(cache.series_len(), 2);

    // "a" was evicted and must load again; "c" is still cached
    cache
        .get_or_load(&SourceKey::named("c"), || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(loaded(vec![1.0]))
        })
        .unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 3);

    cache
        .get_or_load(&SourceKey::named("a"), || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(loaded(vec![1.0]))
        })
        .unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 4);
}

#[test]
fn test_invalidate_source_drops_its_models() {
    let cache = ModelCache::default();
    let wti = SourceKey::named("wti");
    let brent = SourceKey::named("brent");
    let series = loaded(vec![1.0, 2.0]).series;

    cache.get_or_load(&wti, || Ok(loaded(vec![1.0, 2.0]))).unwrap();
    for source in [&wti, &brent] {
        let key = ModelKey::new(source.clone(), "naive");
        cache
            .get_or_fit(&key, || Strategy::NaiveShift.fit(&series))
            .unwrap();
    }
    assert_eq!(cache.model_len(), 2);

    cache.invalidate_source(&wti);

    assert_eq!(cache.series_len(), 0);
    assert_eq!(cache.model_len(), 1);
}

#[test]
fn test_invalidate_model_and_clear() {
    let cache = ModelCache::default();
    let series = loaded(vec![1.0, 2.0]).series;
    let key = ModelKey::new(SourceKey::named("wti"), "naive");
    let fits = AtomicUsize::new(0);
    let fit = || {
        fits.fetch_add(1, Ordering::SeqCst);
        Strategy::NaiveShift.fit(&series)
    };

    cache.get_or_fit(&key, fit).unwrap();
    cache.get_or_fit(&key, fit).unwrap();
    assert_eq!(fits.load(Ordering::SeqCst), 1);

    cache.invalidate_model(&key);
    cache.get_or_fit(&key, fit).unwrap();
    assert_eq!(fits.load(Ordering::SeqCst), 2);

    cache.clear();
    assert_eq!(cache.model_len(), 0);
    assert_eq!(cache.series_len(), 0);
}

#[test]
fn test_file_key_changes_when_file_is_rewritten() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,price").unwrap();
    writeln!(file, "2024-01-01,1.0").unwrap();
    file.flush().unwrap();
    let before = SourceKey::from_path(file.path()).unwrap();

    writeln!(file, "2024-01-02,2.0").unwrap();
    file.flush().unwrap();
    let after = SourceKey::from_path(file.path()).unwrap();

    assert_ne!(before, after);
    assert_eq!(after, SourceKey::from_path(file.path()).unwrap());
}

#[test]
fn test_missing_file_key() {
    assert!(matches!(
        SourceKey::from_path("no/such/prices.csv"),
        Err(ForecastError::DataUnavailable(_))
    ));
}

#[test]
fn test_rewritten_file_replaces_its_cached_entries() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,price").unwrap();
    writeln!(file, "2024-01-01,80.0").unwrap();
    writeln!(file, "2024-01-02,81.0").unwrap();
    file.flush().unwrap();

    let pipeline = ForecastPipeline::with_cache(Arc::new(ModelCache::default()));
    let request = ForecastRequest::new(file.path(), Strategy::NaiveShift, 1);

    for day in 3..8 {
        writeln!(file, "2024-01-{:02},{}.0", day, 80 + day).unwrap();
        file.flush().unwrap();

        let forecast = pipeline.forecast(&request).unwrap();
        assert_eq!(forecast.values(), &[(80 + day) as f64]);
    }

    assert_eq!(pipeline.cache().series_len(), 1);
    assert_eq!(pipeline.cache().model_len(), 1);
}

#[test]
fn test_unchanged_file_keeps_other_sources() {
    let cache = Arc::new(ModelCache::default());
    cache
        .get_or_load(&SourceKey::named("brent"), || Ok(loaded(vec![1.0, 2.0])))
        .unwrap();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,price").unwrap();
    writeln!(file, "2024-01-01,80.0").unwrap();
    file.flush().unwrap();

    let pipeline = ForecastPipeline::with_cache(Arc::clone(&cache));
    pipeline.load(file.path()).unwrap();
    pipeline.load(file.path()).unwrap();

    assert_eq!(cache.series_len(), 2);
}
