use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use resource_client::domain::NewReading;
use time::OffsetDateTime;

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// CSV import source for captured readings.
///
/// Expected header columns (by name):
/// - ts (RFC3339 timestamp)
/// - meter_id
/// - value
/// - manual (optional, true/false, defaults to true)
pub struct ReadingCsvFileSource {
    path: PathBuf,
}

impl ReadingCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn parse_manual(s: &str) -> Result<bool, PipelineError> {
    match s.trim() {
        "" => Ok(true),
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(PipelineError::Source(format!("invalid manual flag '{other}'"))),
    }
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> Result<NewReading, PipelineError> {
    let get = |name: &str| -> Result<&str, PipelineError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| PipelineError::Source(format!("missing column '{name}' in CSV record")))
    };

    let ts_str = get("ts")?;
    let ts = OffsetDateTime::parse(ts_str.trim(), &time::format_description::well_known::Rfc3339)
        .map_err(|e| PipelineError::Source(format!("invalid ts '{ts_str}': {e}")))?;

    let meter_id = get("meter_id")?.trim().to_string();

    let value_str = get("value")?;
    let value: f64 = value_str
        .trim()
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid value '{value_str}': {e}")))?;

    let manual = parse_manual(get("manual").unwrap_or(""))?;

    Ok(NewReading {
        meter_id,
        ts,
        value,
        manual,
    })
}

#[async_trait::async_trait]
impl Source<NewReading> for ReadingCsvFileSource {
    async fn stream(&self) -> EnvelopeStream<NewReading> {
        let path = self.path.clone();
        let s = async_stream::stream! {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open CSV file: {e}")));
                    return;
                }
            };
            let mut rdr = csv::Reader::from_reader(file);
            let headers = match rdr.headers() {
                Ok(h) => h.clone(),
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to read CSV headers: {e}")));
                    return;
                }
            };

            for result in rdr.records() {
                let parsed = result
                    .map_err(|e| PipelineError::Source(format!("failed to read CSV record: {e}")))
                    .and_then(|record| record_to_reading(&record, &headers));

                match parsed {
                    Ok(reading) => yield Ok(Envelope::new(reading)),
                    Err(e) => {
                        metrics::counter!("reading_csv_parse_errors_total").increment(1);
                        yield Err(e);
                    }
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Write;
    use time::macros::datetime;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn parses_rows_and_defaults_manual_flag() {
        let file = write_csv(
            "ts,meter_id,value,manual\n\
             2024-01-01T00:00:00Z,m-water,120.5,\n\
             2024-01-08T00:00:00Z,m-water,130,false\n",
        );
        let source = ReadingCsvFileSource::new(file.path());
        let items: Vec<_> = source.stream().await.collect().await;

        assert_eq!(items.len(), 2);
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.payload.meter_id, "m-water");
        assert_eq!(first.payload.value, 120.5);
        assert_eq!(first.payload.ts, datetime!(2024-01-01 00:00:00 UTC));
        assert!(first.payload.manual);
        assert!(!items[1].as_ref().unwrap().payload.manual);
    }

    #[tokio::test]
    async fn bad_rows_are_errors_and_the_stream_continues() {
        let file = write_csv(
            "ts,meter_id,value\n\
             yesterday,m-water,1\n\
             2024-01-08T00:00:00Z,m-water,abc\n\
             2024-01-15T00:00:00Z,m-water,3\n",
        );
        let source = ReadingCsvFileSource::new(file.path());
        let items: Vec<_> = source.stream().await.collect().await;

        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Err(PipelineError::Source(_))));
        assert!(matches!(items[1], Err(PipelineError::Source(_))));
        assert_eq!(items[2].as_ref().unwrap().payload.value, 3.0);
    }

    #[tokio::test]
    async fn missing_file_yields_single_error() {
        let source = ReadingCsvFileSource::new("/nonexistent/readings.csv");
        let items: Vec<_> = source.stream().await.collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(PipelineError::Source(_))));
    }
}
