#![no_main]

use libfuzzer_sys::fuzz_target;
use statdesk::ingest::{read_csv_bytes, CsvOptions, Encoding};

fuzz_target!(|data: &[u8]| {
    // First byte picks delimiter and encoding, the rest is the file
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let delimiter = [b',', b';', b'\t'][usize::from(selector % 3)];
    let encodings = [Encoding::Utf8, Encoding::Latin1, Encoding::Cp1252];
    let encoding = encodings[usize::from(selector / 3 % 3)];

    // Must return an error, never panic
    if let Ok(dataset) = read_csv_bytes(body, CsvOptions { delimiter, encoding }) {
        let rows = dataset.row_count();
        assert!(dataset.columns().iter().all(|c| c.data.len() == rows));
    }
});
