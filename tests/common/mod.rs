#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const DIRECTORY: &str = "tests/fixtures/directory.json";
pub const REQUESTS: &str = "tests/fixtures/requests.csv";

pub const PAYER: &str = "00000000-0000-4000-8000-0000000000b1";
pub const FLAT_LOW_FRESH: &str = "00000000-0000-4000-8000-0000000000a1";
pub const FLAT_LOW_AFTER_ALLOTMENT: &str = "00000000-0000-4000-8000-0000000000a2";
pub const NO_CONTRACT: &str = "00000000-0000-4000-8000-0000000000a3";
pub const CAPPED: &str = "00000000-0000-4000-8000-0000000000a4";
pub const FREE_INTRO: &str = "00000000-0000-4000-8000-0000000000a5";

const HEADER: &str = "appointmentId,amount,practitionerId,clientId,description,successUrl,cancelUrl";

/// One request row with sensible redirect URLs.
pub fn row(appointment: u32, amount: &str, payee: &str, payer: &str) -> String {
    format!(
        "00000000-0000-4000-8000-{appointment:012x},{amount},{payee},{payer},Session,https://app.example.com/paid,https://app.example.com/cancelled"
    )
}

pub fn requests_file(rows: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}

pub fn lines_file(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

/// Parses the `sessionId` values out of `checkout` stdout.
pub fn session_ids(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter_map(|v| v["sessionId"].as_str().map(String::from))
        .collect()
}
