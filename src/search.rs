//! The client-side search index: a JSON array of `{title, url}` objects, one
//! per record, in record list order.

use crate::record::PostRecord;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize, Debug, PartialEq)]
pub struct SearchEntry<'a> {
    pub title: &'a str,
    pub url: &'a str,
}

pub fn entries(records: &[PostRecord]) -> Vec<SearchEntry> {
    records
        .iter()
        .map(|record| SearchEntry {
            title: &record.title,
            url: &record.url,
        })
        .collect()
}

pub fn write_index<W: Write>(records: &[PostRecord], w: W) -> serde_json::Result<()> {
    serde_json::to_writer(w, &entries(records))
}
