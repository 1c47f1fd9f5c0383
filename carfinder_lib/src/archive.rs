//! Dedup and persistence: the SQLite store decides novelty, the CSV log
//! receives only the rows the store accepted.

use crate::db::{Db, InsertOutcome};
use crate::error::CarFinderError;
use crate::export::CsvExport;
use crate::listing::NormalizedListing;

pub struct Archive {
    db: Db,
    export: CsvExport,
}

impl Archive {
    /// Wraps an initialised store and an export target.
    pub fn new(db: Db, export: CsvExport) -> Self {
        Self { db, export }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn export(&self) -> &CsvExport {
        &self.export
    }

    /// Test-and-insert `listing`; a new row is appended to the CSV log before
    /// it commits, so a failed append leaves the listing unseen.
    pub fn record(&mut self, listing: &NormalizedListing) -> Result<InsertOutcome, CarFinderError> {
        let export = &self.export;
        self.db.insert_if_new_with(listing, || {
            export.append(listing).map_err(CarFinderError::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str) -> NormalizedListing {
        NormalizedListing {
            id: id.to_string(),
            title: "2021 Mazda CX-30".into(),
            price: Some(20000),
            location: None,
            posted_at: None,
            region: "sfbay".into(),
            url: format!("https://sfbay.craigslist.org/cto/d/x/{}.html", id),
            inserted_at: "2024-05-02T01:00:00Z".into(),
        }
    }

    #[test]
    fn repeated_record_is_ignored_and_logged_once() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("listings.db");
        let csv_path = dir.path().join("listings.csv");

        for expected in [InsertOutcome::Inserted, InsertOutcome::Ignored, InsertOutcome::Ignored] {
            let db = Db::open(&db_path).unwrap();
            db.init().unwrap();
            let mut archive = Archive::new(db, CsvExport::new(&csv_path));
            assert_eq!(archive.record(&listing("42")).unwrap(), expected);
        }

        let rows = CsvExport::new(&csv_path).read_all().unwrap();
        assert_eq!(rows, vec![listing("42")]);
    }

    #[test]
    fn export_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open_in_memory().unwrap();
        db.init().unwrap();
        // A directory where the CSV file should be makes the append fail.
        let mut archive = Archive::new(db, CsvExport::new(dir.path()));
        let err = archive.record(&listing("1")).unwrap_err();
        assert!(matches!(err, CarFinderError::Export(_)));
        assert!(err.is_fatal());
        assert!(!archive.db().contains("1").unwrap());
        assert_eq!(archive.db().listing_count().unwrap(), 0);
    }

    #[test]
    fn rolled_back_listing_is_exported_on_retry() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("listings.db");
        let csv_path = dir.path().join("listings.csv");

        let db = Db::open(&db_path).unwrap();
        db.init().unwrap();
        let mut broken = Archive::new(db, CsvExport::new(dir.path()));
        assert!(broken.record(&listing("7")).is_err());
        drop(broken);

        let db = Db::open(&db_path).unwrap();
        db.init().unwrap();
        let mut archive = Archive::new(db, CsvExport::new(&csv_path));
        assert_eq!(archive.record(&listing("7")).unwrap(), InsertOutcome::Inserted);
        assert_eq!(CsvExport::new(&csv_path).read_all().unwrap(), vec![listing("7")]);
    }
}
