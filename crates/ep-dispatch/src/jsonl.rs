//! Newline-delimited JSON scan records.

use std::io::BufRead;

use ep_manager::ScanEvent;

use crate::{DispatchError, DispatchResult};

/// Decode one scan per line.
///
/// Blank lines are skipped.  A malformed line yields a
/// [`DispatchError::Line`] (1-based line number) and decoding carries on with
/// the next line; a read error ends the iteration after it is reported.
pub fn read_jsonl<R: BufRead>(reader: R) -> impl Iterator<Item = DispatchResult<ScanEvent>> {
    let mut done = false;
    reader
        .lines()
        .enumerate()
        .map_while(move |(i, line)| {
            if done {
                return None;
            }
            done = line.is_err();
            Some((i + 1, line))
        })
        .filter_map(|(line_no, line)| match line {
            Err(e) => Some(Err(DispatchError::Io(e))),
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                ScanEvent::from_json(&line).map_err(|source| DispatchError::Line { line: line_no, source }),
            ),
        })
}
