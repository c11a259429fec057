// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Parsing for the `k=v;k=v` TXT record grammar used by both the host and
//! key records.

use std::collections::HashMap;

/// Parses a `;`-delimited list of `k=v` pairs, tolerating surrounding
/// whitespace around keys, values, and separators. Unparseable segments
/// (no `=`) are silently skipped, matching the TXT record format's
/// tolerant grammar.
pub fn parse_kv(txt: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for segment in txt.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        if let Some((key, value)) = segment.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}
