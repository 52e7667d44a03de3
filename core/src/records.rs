//! Append-only log of winning times.
//!
//! The file has no header. Each entry is:
//!
//! ```text
//! u32 LE   length L of the mode descriptor
//! L bytes  UTF-8 mode descriptor, e.g. "13x13 - 10 Mines"
//! f32 LE   elapsed seconds
//! ```
//!
//! A partial entry at the end of the file (an interrupted write) is ignored on read while
//! every complete entry before it is kept. The next append cuts it off before writing.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Difficulty, RecordError};

/// Length prefixes above this are treated as garbage rather than a real descriptor.
pub const MAX_DESCRIPTOR_LEN: usize = 1024;

const LEN_BYTES: usize = 4;
const ELAPSED_BYTES: usize = 4;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub mode: String,
    pub elapsed_secs: f32,
}

impl Record {
    pub fn new(mode: impl Into<String>, elapsed_secs: f32) -> Self {
        Self {
            mode: mode.into(),
            elapsed_secs,
        }
    }

    fn is_valid_elapsed(elapsed_secs: f32) -> bool {
        elapsed_secs.is_finite() && elapsed_secs >= 0.0
    }
}

/// Everything recovered from a record file, plus how much of it had to be thrown away.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordLog {
    pub records: Vec<Record>,
    /// Complete entries dropped for a non-UTF-8 descriptor or an invalid time.
    pub skipped: usize,
    /// Trailing bytes that did not form a complete entry.
    pub truncated_bytes: usize,
}

impl RecordLog {
    pub fn is_damaged(&self) -> bool {
        self.skipped > 0 || self.truncated_bytes > 0
    }

    /// Best `limit` times recorded under exactly `mode`, fastest first.
    pub fn top_times(&self, mode: &str, limit: usize) -> Vec<f32> {
        let mut times: Vec<f32> = self
            .records
            .iter()
            .filter(|record| record.mode == mode)
            .map(|record| record.elapsed_secs)
            .collect();
        times.sort_by(f32::total_cmp);
        times.truncate(limit);
        times
    }

    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        Difficulty::ALL
            .into_iter()
            .map(|difficulty| {
                let mode = difficulty.config().mode_descriptor();
                let times = self.top_times(&mode, limit);
                LeaderboardEntry {
                    difficulty,
                    mode,
                    times,
                }
            })
            .collect()
    }
}

/// Top times for one preset.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardEntry {
    pub difficulty: Difficulty,
    pub mode: String,
    pub times: Vec<f32>,
}

pub fn write_record<W: Write>(writer: &mut W, record: &Record) -> Result<(), RecordError> {
    let mode = record.mode.as_bytes();
    if mode.len() > MAX_DESCRIPTOR_LEN {
        return Err(RecordError::DescriptorTooLong(mode.len()));
    }
    if !Record::is_valid_elapsed(record.elapsed_secs) {
        return Err(RecordError::InvalidElapsed(record.elapsed_secs));
    }

    // one write call per entry so concurrent appenders never interleave inside it
    let mut entry = Vec::with_capacity(LEN_BYTES + mode.len() + ELAPSED_BYTES);
    entry.extend_from_slice(&(mode.len() as u32).to_le_bytes());
    entry.extend_from_slice(mode);
    entry.extend_from_slice(&record.elapsed_secs.to_le_bytes());
    writer.write_all(&entry)?;
    Ok(())
}

pub fn read_records<R: Read>(mut reader: R) -> io::Result<RecordLog> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(parse_records(&bytes))
}

fn parse_records(bytes: &[u8]) -> RecordLog {
    let mut log = RecordLog::default();
    let mut rest = bytes;

    while let Some((len_bytes, after_len)) = rest.split_first_chunk::<LEN_BYTES>() {
        let len = u32::from_le_bytes(*len_bytes) as usize;
        if len > MAX_DESCRIPTOR_LEN || after_len.len() < len + ELAPSED_BYTES {
            break;
        }

        let (mode_bytes, after_mode) = after_len.split_at(len);
        let Some((elapsed_bytes, next)) = after_mode.split_first_chunk::<ELAPSED_BYTES>() else {
            break;
        };
        let elapsed_secs = f32::from_le_bytes(*elapsed_bytes);

        match core::str::from_utf8(mode_bytes) {
            Ok(mode) if Record::is_valid_elapsed(elapsed_secs) => {
                log.records.push(Record::new(mode, elapsed_secs));
            }
            _ => log.skipped += 1,
        }
        rest = next;
    }

    log.truncated_bytes = rest.len();
    log
}

/// File-backed record log. Each operation holds a lock on the file while it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub const DEFAULT_FILE_NAME: &'static str = "minegrid.wins";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry without touching the complete ones already stored.
    ///
    /// A partial entry left at the end by an interrupted write is cut off first, so the new
    /// entry starts on an entry boundary.
    pub fn append(&self, record: &Record) -> Result<(), RecordError> {
        let mut entry = Vec::new();
        write_record(&mut entry, record)?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock()?;

        let existing = read_records(&file)?;
        let end = file.seek(SeekFrom::End(0))?;
        if existing.truncated_bytes > 0 {
            let valid_len = end - existing.truncated_bytes as u64;
            log::warn!(
                "Dropping {} trailing bytes of a partial entry in {}",
                existing.truncated_bytes,
                self.path.display()
            );
            file.set_len(valid_len)?;
            file.seek(SeekFrom::Start(valid_len))?;
        }

        file.write_all(&entry)?;
        file.sync_data()?;
        file.unlock()?;

        log::debug!(
            "Stored record {:?} {:.2}s in {}",
            record.mode,
            record.elapsed_secs,
            self.path.display()
        );
        Ok(())
    }

    /// Reads the whole log. A missing file is an empty log.
    pub fn load(&self) -> Result<RecordLog, RecordError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No record file at {}", self.path.display());
                return Ok(RecordLog::default());
            }
            Err(err) => return Err(err.into()),
        };

        file.lock_shared()?;
        let log = read_records(&file)?;
        file.unlock()?;

        if log.is_damaged() {
            log::warn!(
                "Record file {} is damaged: kept {} records, skipped {}, dropped {} trailing bytes",
                self.path.display(),
                log.records.len(),
                log.skipped,
                log.truncated_bytes
            );
        }
        Ok(log)
    }

    pub fn records(&self) -> Result<Vec<Record>, RecordError> {
        Ok(self.load()?.records)
    }

    pub fn top_records(&self, mode: &str, limit: usize) -> Result<Vec<f32>, RecordError> {
        Ok(self.load()?.top_times(mode, limit))
    }

    /// Top times for each preset, matched by the descriptor the preset itself produces.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, RecordError> {
        Ok(self.load()?.leaderboard(limit))
    }
}

/// Formats seconds as `1h 2m 3.45s`, leaving out leading zero units.
pub fn format_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let whole = seconds as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let rest = seconds % 60.0;

    let mut formatted = String::new();
    if hours > 0 {
        formatted.push_str(&format!("{hours}h "));
    }
    if minutes > 0 || hours > 0 {
        formatted.push_str(&format!("{minutes}m "));
    }
    formatted.push_str(&format!("{rest:.2}s"));
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_store(name: &str) -> RecordStore {
        let path = std::env::temp_dir().join(format!(
            "minegrid-{}-{}.wins",
            std::process::id(),
            name
        ));
        let _ = fs::remove_file(&path);
        RecordStore::new(path)
    }

    fn encode(records: &[Record]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for record in records {
            write_record(&mut bytes, record).unwrap();
        }
        bytes
    }

    #[test]
    fn entry_layout_is_little_endian() {
        let bytes = encode(&[Record::new("ab", 1.5)]);

        assert_eq!(&bytes[..4], &[2, 0, 0, 0]);
        assert_eq!(&bytes[4..6], b"ab");
        assert_eq!(&bytes[6..], &1.5f32.to_le_bytes());
    }

    #[test]
    fn store_round_trip_keeps_file_order() {
        let store = temp_store("round-trip");
        store.append(&Record::new("13x13 - 10 Mines", 12.34)).unwrap();
        store.append(&Record::new("16x16 - 40 Mines", 5.0)).unwrap();

        let records = store.records().unwrap();

        assert_eq!(
            records,
            vec![
                Record::new("13x13 - 10 Mines", 12.34),
                Record::new("16x16 - 40 Mines", 5.0),
            ]
        );
        assert_eq!(
            store.top_records("13x13 - 10 Mines", 5).unwrap(),
            vec![12.34]
        );
        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn missing_file_is_empty() {
        let store = temp_store("missing");

        assert_eq!(store.load().unwrap(), RecordLog::default());
        assert!(store.top_records("9x9 - 10 Mines", 5).unwrap().is_empty());
    }

    #[test]
    fn truncated_tail_keeps_prior_records() {
        let store = temp_store("truncated");
        store.append(&Record::new("13x13 - 10 Mines", 40.0)).unwrap();
        store.append(&Record::new("13x13 - 10 Mines", 30.0)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
            // length prefix promises 16 bytes, only 3 arrive
            file.write_all(&16u32.to_le_bytes()).unwrap();
            file.write_all(b"16x").unwrap();
        }

        let log = store.load().unwrap();

        assert_eq!(log.records.len(), 2);
        assert_eq!(log.truncated_bytes, 7);
        assert!(log.is_damaged());
        assert_eq!(log.top_times("13x13 - 10 Mines", 5), vec![30.0, 40.0]);
        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn append_after_truncated_tail_keeps_new_records() {
        let store = temp_store("append-after-truncated");
        store.append(&Record::new("13x13 - 10 Mines", 40.0)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
            file.write_all(&16u32.to_le_bytes()).unwrap();
            file.write_all(b"16x").unwrap();
        }

        store.append(&Record::new("13x13 - 10 Mines", 5.0)).unwrap();
        store.append(&Record::new("13x13 - 10 Mines", 6.0)).unwrap();
        let log = store.load().unwrap();

        assert_eq!(
            log.records,
            vec![
                Record::new("13x13 - 10 Mines", 40.0),
                Record::new("13x13 - 10 Mines", 5.0),
                Record::new("13x13 - 10 Mines", 6.0),
            ]
        );
        assert!(!log.is_damaged());
        assert_eq!(log.top_times("13x13 - 10 Mines", 5), vec![5.0, 6.0, 40.0]);
        let expected_len = 3 * (4 + "13x13 - 10 Mines".len() + 4);
        assert_eq!(fs::metadata(store.path()).unwrap().len(), expected_len as u64);
        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn short_length_prefix_is_dropped() {
        let mut bytes = encode(&[Record::new("9x9 - 10 Mines", 8.0)]);
        bytes.extend_from_slice(&[3, 0]);

        let log = read_records(bytes.as_slice()).unwrap();

        assert_eq!(log.records, vec![Record::new("9x9 - 10 Mines", 8.0)]);
        assert_eq!(log.truncated_bytes, 2);
    }

    #[test]
    fn missing_elapsed_time_is_dropped() {
        let mut bytes = encode(&[Record::new("a", 1.0)]);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(b"b");
        bytes.extend_from_slice(&[0, 0]);

        let log = read_records(bytes.as_slice()).unwrap();

        assert_eq!(log.records, vec![Record::new("a", 1.0)]);
        assert_eq!(log.truncated_bytes, 7);
    }

    #[test]
    fn absurd_length_stops_reading() {
        let mut bytes = encode(&[Record::new("a", 1.0)]);
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0; 64]);

        let log = read_records(bytes.as_slice()).unwrap();

        assert_eq!(log.records.len(), 1);
        assert_eq!(log.truncated_bytes, 68);
    }

    #[test]
    fn invalid_entries_in_the_middle_are_skipped() {
        let mut bytes = encode(&[Record::new("a", 1.0)]);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(&2.0f32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(b"c");
        bytes.extend_from_slice(&f32::NAN.to_le_bytes());
        bytes.extend(encode(&[Record::new("d", 4.0)]));

        let log = read_records(bytes.as_slice()).unwrap();

        assert_eq!(
            log.records,
            vec![Record::new("a", 1.0), Record::new("d", 4.0)]
        );
        assert_eq!(log.skipped, 2);
        assert_eq!(log.truncated_bytes, 0);
    }

    #[test]
    fn write_rejects_bad_records() {
        let mut bytes = Vec::new();

        assert!(matches!(
            write_record(&mut bytes, &Record::new("x", -1.0)),
            Err(RecordError::InvalidElapsed(_))
        ));
        assert!(matches!(
            write_record(&mut bytes, &Record::new("x".repeat(2000), 1.0)),
            Err(RecordError::DescriptorTooLong(2000))
        ));
        assert!(bytes.is_empty());
    }

    #[test]
    fn top_times_filter_sort_and_truncate() {
        let log = RecordLog {
            records: [7.0, 3.0, 9.0, 1.0, 5.0, 2.0, 8.0]
                .into_iter()
                .map(|time| Record::new("16x16 - 40 Mines", time))
                .chain([Record::new("30x16 - 99 Mines", 0.5)])
                .collect(),
            ..RecordLog::default()
        };

        assert_eq!(
            log.top_times("16x16 - 40 Mines", 5),
            vec![1.0, 2.0, 3.0, 5.0, 7.0]
        );
        assert_eq!(log.top_times("30x16 - 99 Mines", 5), vec![0.5]);
        // exact match only, no substring grouping
        assert!(log.top_times("16x16", 5).is_empty());
    }

    #[test]
    fn leaderboard_groups_by_preset_descriptor() {
        let store = temp_store("leaderboard");
        store.append(&Record::new("13x13 - 10 Mines", 20.0)).unwrap();
        store.append(&Record::new("9x9 - 10 Mines", 1.0)).unwrap();
        store.append(&Record::new("30x16 - 99 Mines", 300.0)).unwrap();

        let board = store.leaderboard(5).unwrap();

        assert_eq!(board.len(), 3);
        assert_eq!(board[0].difficulty, Difficulty::Easy);
        assert_eq!(board[0].times, vec![20.0]);
        assert!(board[1].times.is_empty());
        assert_eq!(board[2].mode, "30x16 - 99 Mines");
        assert_eq!(board[2].times, vec![300.0]);
        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn formats_elapsed_like_the_score_table() {
        assert_eq!(format_elapsed(5.0), "5.00s");
        assert_eq!(format_elapsed(75.25), "1m 15.25s");
        assert_eq!(format_elapsed(3723.5), "1h 2m 3.50s");
        assert_eq!(format_elapsed(3600.0), "1h 0m 0.00s");
    }
}
