//! Dataset source that downloads the census table once and caches it as CSV.
//!
//! The remote file carries raw per-district totals (`total_rooms`,
//! `households`, ...). They are turned into the per-household averages of
//! the feature schema, the target is rescaled to units of 100k USD, and the
//! result is written to the cache path in the layout [`CsvDatasetSource`]
//! reads. Later runs load the cache and never touch the network.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::config::AppCfg;
use crate::common::error::{PropvalError, PropvalResult};

use super::domain::{DatasetSource, FeatureRow, TrainingDataset, FEATURE_NAMES, N_FEATURES};
use super::repo_fs::CsvDatasetSource;

const TIMEOUT: Duration = Duration::from_secs(120);

/// Column written for the target in the cache file.
const CACHE_TARGET: &str = "MedHouseVal";

/// Raw census columns, in the order [`census_row`] reads them.
const CENSUS_COLUMNS: [&str; 9] = [
    "median_income",
    "housing_median_age",
    "total_rooms",
    "total_bedrooms",
    "population",
    "households",
    "latitude",
    "longitude",
    "median_house_value",
];

/// Cached remote copy of the housing table.
pub struct HttpDatasetSource {
    url: String,
    cache: PathBuf,
}

impl HttpDatasetSource {
    pub fn new(url: impl Into<String>, cache: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            cache: cache.into(),
        }
    }

    pub fn from_cfg(cfg: &AppCfg) -> Self {
        Self::new(&cfg.dataset_url, &cfg.dataset_path)
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache
    }

    fn download(&self) -> PropvalResult<String> {
        let fetch_err = |err: reqwest::Error| PropvalError::data(format!("fetching {}: {err}", self.url));

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("propval/", env!("CARGO_PKG_VERSION")))
            .timeout(TIMEOUT)
            .build()
            .map_err(fetch_err)?;

        client
            .get(&self.url)
            .send()
            .and_then(|res| res.error_for_status())
            .and_then(|res| res.text())
            .map_err(fetch_err)
    }
}

impl DatasetSource for HttpDatasetSource {
    fn load(&self) -> PropvalResult<TrainingDataset> {
        if self.cache.exists() {
            tracing::info!(cache = %self.cache.display(), "using cached dataset");
            return CsvDatasetSource::new(&self.cache).load();
        }
        if self.url.is_empty() {
            return Err(PropvalError::data(format!(
                "{} does not exist and downloads are disabled",
                self.cache.display()
            )));
        }

        tracing::info!(url = %self.url, "downloading dataset");
        let text = self.download()?;
        let (dataset, skipped) = parse_census(&text)?;
        if skipped > 0 {
            tracing::warn!(skipped, "dropped incomplete census rows");
        }
        write_cache(&dataset, &self.cache)?;
        tracing::info!(rows = dataset.len(), cache = %self.cache.display(), "dataset cached");
        Ok(dataset)
    }

    fn describe(&self) -> String {
        format!("{} (from {})", self.cache.display(), self.url)
    }
}

/// One census record as a feature row and target, or `None` when a cell is blank.
fn census_row(cells: &[&str; 9], line: u64) -> PropvalResult<Option<(FeatureRow, f64)>> {
    if cells.iter().any(|c| c.trim().is_empty()) {
        return Ok(None);
    }
    let mut v = [0.0; 9];
    for (slot, raw) in cells.iter().enumerate() {
        v[slot] = raw.trim().parse().map_err(|_| {
            PropvalError::data(format!("line {line}: {}={raw:?} is not a number", CENSUS_COLUMNS[slot]))
        })?;
    }
    let [income, age, rooms, bedrooms, population, households, latitude, longitude, value] = v;
    if households <= 0.0 {
        return Ok(None);
    }

    let row = [
        income,
        age,
        rooms / households,
        bedrooms / households,
        population,
        population / households,
        latitude,
        longitude,
    ];
    Ok(Some((row, value / 100_000.0)))
}

/// Convert the raw census CSV into a dataset; also returns how many rows had blanks.
///
/// Columns outside the census set (e.g. `ocean_proximity`) are ignored.
pub fn parse_census(text: &str) -> PropvalResult<(TrainingDataset, usize)> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|err| PropvalError::data(format!("census header: {err}")))?
        .clone();

    let mut index = [0usize; 9];
    for (slot, name) in CENSUS_COLUMNS.iter().enumerate() {
        index[slot] = headers
            .iter()
            .position(|h| h.trim() == *name)
            .ok_or_else(|| PropvalError::data(format!("census table has no {name:?} column")))?;
    }

    let mut rows = Vec::new();
    let mut targets = Vec::new();
    let mut skipped = 0;
    for result in reader.records() {
        let record = result.map_err(|err| PropvalError::data(err.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let cells = index.map(|idx| record.get(idx).unwrap_or(""));
        match census_row(&cells, line)? {
            Some((row, target)) => {
                rows.push(row);
                targets.push(target);
            }
            None => skipped += 1,
        }
    }

    Ok((TrainingDataset::new(rows, targets)?, skipped))
}

/// Atomically write `dataset` as a CSV that [`CsvDatasetSource`] can read back exactly.
pub fn write_cache(dataset: &TrainingDataset, path: &Path) -> PropvalResult<()> {
    let io_err = |err: std::io::Error| PropvalError::data(format!("caching to {}: {err}", path.display()));
    let csv_err = |err: csv::Error| PropvalError::data(format!("caching to {}: {err}", path.display()));

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
        header.push(CACHE_TARGET);
        writer.write_record(&header).map_err(csv_err)?;

        let mut record: Vec<String> = Vec::with_capacity(N_FEATURES + 1);
        for (row, target) in dataset.rows().iter().zip(dataset.targets()) {
            record.clear();
            record.extend(row.iter().map(f64::to_string));
            record.push(target.to_string());
            writer.write_record(&record).map_err(csv_err)?;
        }
        writer.flush().map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use crate::testing::synthetic_housing;

    const CENSUS: &str = "\
longitude,latitude,housing_median_age,total_rooms,total_bedrooms,population,households,median_income,median_house_value,ocean_proximity
-122.23,37.88,41.0,880.0,129.0,322.0,126.0,8.3252,452600.0,NEAR BAY
-122.22,37.86,21.0,7099.0,,2401.0,1138.0,8.3014,358500.0,NEAR BAY
-122.24,37.85,52.0,1467.0,190.0,496.0,177.0,7.2574,352100.0,NEAR BAY
";

    /// Answer exactly one HTTP request with `status` and `body`; returns the URL.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
        });
        format!("http://{addr}/housing.csv")
    }

    #[test]
    fn census_totals_become_household_averages() {
        let (ds, skipped) = parse_census(CENSUS).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(ds.len(), 2);

        let row = ds.rows()[0];
        assert_eq!(row[0], 8.3252);
        assert_eq!(row[1], 41.0);
        assert_eq!(row[2], 880.0 / 126.0);
        assert_eq!(row[3], 129.0 / 126.0);
        assert_eq!(row[4], 322.0);
        assert_eq!(row[5], 322.0 / 126.0);
        assert_eq!(row[6], 37.88);
        assert_eq!(row[7], -122.23);
        assert_eq!(ds.targets()[0], 4.526);
    }

    #[test]
    fn missing_census_column_is_named() {
        let err = parse_census("longitude,latitude\n1,2\n").unwrap_err();
        assert!(matches!(err, PropvalError::DataAcquisition(_)));
        assert!(err.to_string().contains("housing_median_age"), "{err}");
    }

    #[test]
    fn cache_round_trips_exactly() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("nested").join("housing.csv");
        let ds = synthetic_housing(40, 6);
        write_cache(&ds, &path).unwrap();
        assert_eq!(CsvDatasetSource::new(&path).load().unwrap(), ds);
    }

    #[test]
    fn existing_cache_is_used_without_network() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("housing.csv");
        let ds = synthetic_housing(25, 3);
        write_cache(&ds, &path).unwrap();

        let source = HttpDatasetSource::new("http://unreachable.invalid/housing.csv", &path);
        assert_eq!(source.load().unwrap(), ds);
    }

    #[test]
    fn first_load_downloads_and_fills_the_cache() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("data").join("housing.csv");
        let source = HttpDatasetSource::new(serve_once("200 OK", CENSUS), &path);

        let downloaded = source.load().unwrap();
        assert_eq!(downloaded.len(), 2);
        assert!(path.exists());
        assert_eq!(source.load().unwrap(), downloaded);
    }

    #[test]
    fn http_error_is_a_data_error_and_caches_nothing() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("housing.csv");
        let source = HttpDatasetSource::new(serve_once("404 Not Found", "gone"), &path);

        let err = source.load().unwrap_err();
        assert!(matches!(err, PropvalError::DataAcquisition(_)));
        assert!(!path.exists());
    }

    #[test]
    fn disabled_downloads_without_cache_fail() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let source = HttpDatasetSource::new("", tmp.path().join("absent.csv"));
        assert!(matches!(source.load(), Err(PropvalError::DataAcquisition(_))));
    }
}
