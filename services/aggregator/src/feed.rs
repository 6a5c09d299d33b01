//! Update feeds
//!
//! An [`UpdateFeed`] hands the pipeline feed documents one at a time, in
//! the order they were recorded. Order matters: the order book is rebuilt
//! by applying diff batches sequentially, so a feed must never reorder.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::events::FeedDocument;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid document on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of ordered feed documents.
pub trait UpdateFeed {
    /// Next document, `None` once the feed is exhausted.
    fn next_document(&mut self) -> Option<Result<FeedDocument, FeedError>>;
}

/// Reads one JSON document per line. Blank lines are skipped.
pub struct JsonLinesFeed<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl JsonLinesFeed<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, FeedError> {
        let file = File::open(path)?;
        debug!(path = %path.display(), "Opened JSON lines feed");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// 1-based number of the last line read.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> UpdateFeed for JsonLinesFeed<R> {
    fn next_document(&mut self) -> Option<Result<FeedDocument, FeedError>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            let line_number = self.line_number;
            return Some(serde_json::from_str(&line).map_err(|source| FeedError::Decode {
                line: line_number,
                source,
            }));
        }
    }
}

/// In-memory feed, mostly for tests and replays of already-loaded data.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    documents: VecDeque<FeedDocument>,
}

impl MemoryFeed {
    pub fn new(documents: impl IntoIterator<Item = FeedDocument>) -> Self {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.documents.len()
    }
}

impl UpdateFeed for MemoryFeed {
    fn next_document(&mut self) -> Option<Result<FeedDocument, FeedError>> {
        self.documents.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FeedPayload;
    use std::io::{Cursor, Write};

    const DOCS: &str = r#"{"minute_utc": 1, "type": "BOOK_TICKER", "tickers": [{"bid": 1, "ask": 2}]}

{"minute_utc": 2, "type": "TRADE_TICKER", "tickers": []}
"#;

    #[test]
    fn test_reads_documents_in_order() {
        let mut feed = JsonLinesFeed::new(Cursor::new(DOCS));

        let first = feed.next_document().unwrap().unwrap();
        assert_eq!(first.minute_utc, 1);
        let second = feed.next_document().unwrap().unwrap();
        assert_eq!(second.minute_utc, 2);
        assert!(matches!(second.payload, FeedPayload::TradeTicker { .. }));
        // Blank line in between was skipped but counted
        assert_eq!(feed.line_number(), 3);

        assert!(feed.next_document().is_none());
    }

    #[test]
    fn test_decode_error_reports_line() {
        let input = "{\"minute_utc\": 1, \"type\": \"TRADE_TICKER\", \"tickers\": []}\nnot json\n";
        let mut feed = JsonLinesFeed::new(Cursor::new(input));

        assert!(feed.next_document().unwrap().is_ok());
        match feed.next_document().unwrap() {
            Err(FeedError::Decode { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCS.as_bytes()).unwrap();
        file.flush().unwrap();

        let mut feed = JsonLinesFeed::open(file.path()).unwrap();
        let mut count = 0;
        while let Some(doc) = feed.next_document() {
            doc.unwrap();
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_open_missing_file() {
        let result = JsonLinesFeed::open(Path::new("/nonexistent/feed.jsonl"));
        assert!(matches!(result, Err(FeedError::Io(_))));
    }

    #[test]
    fn test_memory_feed() {
        let doc = FeedDocument {
            minute_utc: 7,
            symbol: None,
            payload: FeedPayload::OrderBook { updates: vec![] },
        };
        let mut feed = MemoryFeed::new(vec![doc.clone(), doc]);
        assert_eq!(feed.remaining(), 2);
        assert!(feed.next_document().unwrap().is_ok());
        assert!(feed.next_document().unwrap().is_ok());
        assert!(feed.next_document().is_none());
    }
}
