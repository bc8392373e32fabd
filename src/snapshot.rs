use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::item::Value;
use crate::Cache;

/// One snapshot record. The cache does not prescribe framing beyond this:
/// the codec length-delimits fields itself and records are laid end to end.
#[derive(Serialize)]
struct RecordRef<'a> {
    key: &'a [u8],
    value: &'a Value,
}

#[derive(Deserialize)]
struct Record {
    key: Vec<u8>,
    value: Value,
}

impl Cache {
    /// Write every item to `sink`, one record per item.
    ///
    /// The walk holds one bucket read lock at a time, only across the
    /// emission of that bucket's own items; an encoder failure releases the
    /// lock on the way out. Items moved by a concurrent grow or removed by
    /// a concurrent sweep may be missed, as with any online snapshot.
    pub fn save<W: Write>(&self, sink: W) -> Result<()> {
        let mut sink = BufWriter::new(sink);
        let table = self.shared.table.load();
        for bucket in table.buckets() {
            let items = bucket.read();
            for item in items.iter() {
                let record = RecordRef {
                    key: &item.key,
                    value: &item.value,
                };
                bincode::serialize_into(&mut sink, &record).map_err(Error::Encode)?;
            }
        }
        sink.flush()?;
        Ok(())
    }

    /// Read records from `source` and apply set semantics for each:
    /// existing keys are overwritten, the ceiling still applies.
    ///
    /// A clean end of input is not an error; a record that fails to decode
    /// is, and surfaces as [`Error::Decode`].
    pub fn load<R: Read>(&self, source: R) -> Result<()> {
        let mut source = BufReader::new(source);
        loop {
            if source.fill_buf()?.is_empty() {
                return Ok(());
            }
            let record: Record =
                bincode::deserialize_from(&mut source).map_err(Error::Decode)?;
            self.set(&record.key, record.value);
        }
    }

    /// Save to a file, creating it if needed and truncating it if not.
    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.save(file)
    }

    /// Load from a file written by [`Cache::save_file`].
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::open(path)?;
        self.load(file)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{hash, CacheBuilder, Error, Value};

    #[test]
    fn empty_input_is_a_clean_end() {
        let cache = CacheBuilder::new().hash(hash::ly).build();
        cache.load(Cursor::new(Vec::new())).unwrap();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn garbage_surfaces_as_decode_error() {
        let cache = CacheBuilder::new().hash(hash::ly).build();
        let result = cache.load(Cursor::new(vec![0xff; 3]));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn load_overwrites_existing_keys() {
        let source = CacheBuilder::new().hash(hash::ly).build();
        source.set(b"k", 1u32);
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();

        let target = CacheBuilder::new().hash(hash::ly).build();
        target.set(b"k", 99u32);
        target.load(Cursor::new(buf)).unwrap();
        assert_eq!(target.get(b"k"), Some(Value::U32(1)));
        assert_eq!(target.len(), 1);
    }
}
