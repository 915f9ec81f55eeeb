//! SQL schema for the Rolodex SQLite store.
//!
//! Executed once at connection startup. The generic `dataN` columns carry
//! no declared type so values keep the storage class they were written
//! with.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS contacts (
    _id                            INTEGER PRIMARY KEY AUTOINCREMENT,
    lookup                         TEXT,
    display_name                   TEXT,
    display_name_alt               TEXT,
    display_name_source            INTEGER NOT NULL DEFAULT 0,
    name_raw_contact_id            INTEGER,
    starred                        INTEGER NOT NULL DEFAULT 0,
    contact_last_updated_timestamp INTEGER
);

-- contact_id is NULL until the RawContact is aggregated.
CREATE TABLE IF NOT EXISTS raw_contacts (
    _id          INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id   INTEGER,
    account_name TEXT,
    account_type TEXT,
    sourceid     TEXT
);

CREATE TABLE IF NOT EXISTS data (
    _id              INTEGER PRIMARY KEY AUTOINCREMENT,
    raw_contact_id   INTEGER NOT NULL
                     REFERENCES raw_contacts(_id) ON DELETE CASCADE,
    mimetype         TEXT NOT NULL,
    is_primary       INTEGER NOT NULL DEFAULT 0,
    is_super_primary INTEGER NOT NULL DEFAULT 0,
    data1, data2, data3, data4, data5, data6, data7, data8,
    data9, data10, data11, data12, data13, data14, data15
);

-- One directive per unordered pair, stored with the smaller id first.
CREATE TABLE IF NOT EXISTS aggregation_exceptions (
    type            INTEGER NOT NULL,
    raw_contact_id1 INTEGER NOT NULL
                    REFERENCES raw_contacts(_id) ON DELETE CASCADE,
    raw_contact_id2 INTEGER NOT NULL
                    REFERENCES raw_contacts(_id) ON DELETE CASCADE,
    PRIMARY KEY (raw_contact_id1, raw_contact_id2),
    CHECK (raw_contact_id1 < raw_contact_id2)
);

-- Data rows joined with their RawContact and Contact columns.
CREATE VIEW IF NOT EXISTS data_view AS
SELECT
    d._id, d.raw_contact_id, r.contact_id, d.mimetype,
    d.is_primary, d.is_super_primary,
    d.data1, d.data2, d.data3, d.data4, d.data5, d.data6, d.data7, d.data8,
    d.data9, d.data10, d.data11, d.data12, d.data13, d.data14, d.data15,
    r.account_name, r.account_type,
    c.lookup, c.display_name, c.display_name_alt, c.starred,
    c.contact_last_updated_timestamp
FROM data d
JOIN raw_contacts r ON r._id = d.raw_contact_id
LEFT JOIN contacts c ON c._id = r.contact_id;

CREATE INDEX IF NOT EXISTS raw_contacts_contact_idx ON raw_contacts(contact_id);
CREATE INDEX IF NOT EXISTS data_raw_contact_idx     ON data(raw_contact_id);
CREATE INDEX IF NOT EXISTS data_mimetype_idx        ON data(mimetype);

PRAGMA user_version = 1;
";
