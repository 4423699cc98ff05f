//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Edge-tracked rows and beacon rows share one sparse table; each path leaves
/// the other's columns as empty strings and `source` tells them apart.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS visits (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp             TEXT NOT NULL,             -- YYYY-MM-DDTHH:MM:SS.sssZ; server-assigned
    source                TEXT NOT NULL,             -- 'edge' | 'beacon'

    ip                    TEXT NOT NULL DEFAULT '',
    user_agent            TEXT NOT NULL DEFAULT '',
    referrer              TEXT NOT NULL DEFAULT '',

    url                   TEXT NOT NULL DEFAULT '',
    uri                   TEXT NOT NULL DEFAULT '',
    path                  TEXT NOT NULL DEFAULT '',
    query                 TEXT NOT NULL DEFAULT '',
    protocol              TEXT NOT NULL DEFAULT '',

    original_host         TEXT NOT NULL DEFAULT '',
    response_code         TEXT NOT NULL DEFAULT '',

    country               TEXT NOT NULL DEFAULT '',
    city                  TEXT NOT NULL DEFAULT '',
    region                TEXT NOT NULL DEFAULT '',
    region_code           TEXT NOT NULL DEFAULT '',
    continent             TEXT NOT NULL DEFAULT '',
    postal_code           TEXT NOT NULL DEFAULT '',
    metro_code            TEXT NOT NULL DEFAULT '',
    timezone              TEXT NOT NULL DEFAULT '',
    latitude              TEXT NOT NULL DEFAULT '',
    longitude             TEXT NOT NULL DEFAULT '',
    is_eu_country         TEXT NOT NULL DEFAULT '',  -- 'true' | 'false' | ''
    asn                   TEXT NOT NULL DEFAULT '',
    colo                  TEXT NOT NULL DEFAULT '',
    http_version          TEXT NOT NULL DEFAULT '',
    tls_version           TEXT NOT NULL DEFAULT '',
    tls_cipher            TEXT NOT NULL DEFAULT '',

    language              TEXT NOT NULL DEFAULT '',
    accept_encoding       TEXT NOT NULL DEFAULT '',
    client_hints_ua       TEXT NOT NULL DEFAULT '',
    client_hints_platform TEXT NOT NULL DEFAULT '',
    client_hints_mobile   TEXT NOT NULL DEFAULT '',

    cookie                TEXT NOT NULL DEFAULT '',
    epoch_timestamp       TEXT NOT NULL DEFAULT '',
    hardware_concurrency  TEXT NOT NULL DEFAULT '',
    cookies_enabled       TEXT NOT NULL DEFAULT '',
    do_not_track          TEXT NOT NULL DEFAULT '',
    memory                TEXT NOT NULL DEFAULT '',
    connection_type       TEXT NOT NULL DEFAULT '',
    hash                  TEXT NOT NULL DEFAULT '',
    port                  TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS visits_timestamp_idx ON visits(timestamp);
CREATE INDEX IF NOT EXISTS visits_country_idx   ON visits(country);

PRAGMA user_version = 1;
";
