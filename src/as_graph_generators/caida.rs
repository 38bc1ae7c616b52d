use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use chrono::{Duration, Utc};

use crate::as_graph::{Edge, ASN};
use crate::shared::TopologyError;

const SERIAL_2_URL: &str = "https://publicdata.caida.org/datasets/as-relationships/serial-2/";

/// Parse CAIDA `as-rel` lines: `<provider>|<customer>|-1` or
/// `<peer>|<peer>|0`, optionally followed by a `|<source>` column.
pub fn read_caida<R: BufRead>(reader: R, filename: &Path) -> Result<Vec<Edge>, TopologyError> {
    let mut edges = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| TopologyError::Io {
            filename: filename.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let bad_line = |message: &str| TopologyError::InvalidASRelFile {
            filename: filename.to_path_buf(),
            line_number: index + 1,
            line: line.clone(),
            message: message.to_string(),
        };

        let fields: Vec<&str> = trimmed.split('|').collect();
        if fields.len() != 3 && fields.len() != 4 {
            return Err(bad_line("expected 3 or 4 '|'-separated fields"));
        }

        let as1: ASN = fields[0].parse().map_err(|_| bad_line("bad AS number"))?;
        let as2: ASN = fields[1].parse().map_err(|_| bad_line("bad AS number"))?;
        let rel: i32 = fields[2].parse().map_err(|_| bad_line("bad relationship code"))?;

        match rel {
            -1 => edges.push(Edge::customer(as1, as2)),
            0 => edges.push(Edge::peer(as1, as2)),
            _ => return Err(bad_line("unknown relationship code")),
        }
    }

    Ok(edges)
}

pub fn parse_caida_file(path: &Path) -> Result<Vec<Edge>, TopologyError> {
    let file = File::open(path).map_err(|source| TopologyError::Io {
        filename: path.to_path_buf(),
        source,
    })?;

    if path.extension().and_then(|ext| ext.to_str()) == Some("bz2") {
        read_caida(BufReader::new(BzDecoder::new(file)), path)
    } else {
        read_caida(BufReader::new(file), path)
    }
}

/// Downloads the serial-2 snapshot dated `days_ago` days back and keeps a
/// decompressed copy in the cache directory.
pub struct CAIDAASGraphCollector {
    days_ago: u32,
    cache_dir: PathBuf,
}

impl CAIDAASGraphCollector {
    pub fn new(days_ago: u32, cache_dir: &Path) -> Self {
        CAIDAASGraphCollector {
            days_ago,
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    pub fn run(&self) -> Result<PathBuf, TopologyError> {
        fs::create_dir_all(&self.cache_dir).map_err(|source| TopologyError::Io {
            filename: self.cache_dir.clone(),
            source,
        })?;

        let cached_path = self.cached_path();
        if cached_path.exists() {
            log::info!("Using cached CAIDA data from {}", cached_path.display());
            return Ok(cached_path);
        }

        let url = self.download_url();
        log::info!("Downloading CAIDA AS relationships from {}", url);
        let compressed = download(&url)?;

        let mut decompressed = Vec::new();
        std::io::copy(&mut BzDecoder::new(compressed.as_slice()), &mut decompressed).map_err(|err| {
            TopologyError::Download {
                url: url.clone(),
                message: format!("bad bzip2 payload: {}", err),
            }
        })?;

        fs::write(&cached_path, decompressed).map_err(|source| TopologyError::Io {
            filename: cached_path.clone(),
            source,
        })?;
        log::info!("CAIDA data saved to {}", cached_path.display());
        Ok(cached_path)
    }

    fn date_stamp(&self) -> String {
        let date = Utc::now() - Duration::days(i64::from(self.days_ago));
        date.format("%Y%m01").to_string()
    }

    pub fn cached_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.as-rel2.txt", self.date_stamp()))
    }

    pub fn download_url(&self) -> String {
        format!("{}{}.as-rel2.txt.bz2", SERIAL_2_URL, self.date_stamp())
    }
}

fn download(url: &str) -> Result<Vec<u8>, TopologyError> {
    let failed = |message: String| TopologyError::Download {
        url: url.to_string(),
        message,
    };

    let response = reqwest::blocking::get(url).map_err(|err| failed(err.to_string()))?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }
    let bytes = response.bytes().map_err(|err| failed(err.to_string()))?;
    Ok(bytes.to_vec())
}
