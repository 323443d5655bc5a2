//! Contains the SQLite backed record store and helpers for opening its
//! database.

pub mod record;

pub use record::SQLiteRecordStore;

use std::{fs, io, path::Path};

use rusqlite::Connection;

use crate::{Error, config::StoreLocation};

/// Suffixes of the files SQLite may create next to a database file.
const SIDE_FILE_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Open a connection for `location`, creating missing parent directories.
///
/// # Errors
/// Returns an [Error::StorageUnavailable] if the directory or database file
/// cannot be created or opened.
pub fn open_connection(location: &StoreLocation) -> Result<Connection, Error> {
    match location {
        StoreLocation::Memory => Connection::open_in_memory().map_err(storage_unavailable),
        StoreLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|error| {
                    Error::StorageUnavailable(format!(
                        "could not create the directory {parent:?}: {error}"
                    ))
                })?;
            }

            Connection::open(path).map_err(storage_unavailable)
        }
    }
}

/// Delete the database file at `path` along with any journal files.
///
/// Files that do not exist are ignored.
pub fn remove_database_files(path: &Path) -> Result<(), Error> {
    let mut paths = vec![path.to_path_buf()];
    paths.extend(SIDE_FILE_SUFFIXES.iter().map(|suffix| {
        let mut side_path = path.as_os_str().to_owned();
        side_path.push(suffix);
        side_path.into()
    }));

    for path in paths {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!("removed {path:?}"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(Error::StorageUnavailable(format!(
                    "could not remove {path:?}: {error}"
                )));
            }
        }
    }

    Ok(())
}

fn storage_unavailable(error: rusqlite::Error) -> Error {
    tracing::error!("could not open the database: {error}");
    Error::StorageUnavailable(error.to_string())
}

#[cfg(test)]
mod open_connection_tests {
    use std::fs;

    use crate::{Error, config::StoreLocation};

    use super::{open_connection, remove_database_files};

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("valores.db");

        let connection = open_connection(&StoreLocation::File(path.clone()));

        assert!(connection.is_ok());
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let connection = open_connection(&StoreLocation::File(blocker.join("valores.db")));

        assert!(matches!(connection, Err(Error::StorageUnavailable(_))));
    }

    #[test]
    fn remove_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        assert_eq!(remove_database_files(&path), Ok(()));
    }

    #[test]
    fn remove_deletes_journal_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valores.db");
        let journal = dir.path().join("valores.db-journal");
        fs::write(&path, "").unwrap();
        fs::write(&journal, "").unwrap();

        remove_database_files(&path).unwrap();

        assert!(!path.exists());
        assert!(!journal.exists());
    }
}
