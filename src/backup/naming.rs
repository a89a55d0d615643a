// b2backup/src/backup/naming.rs
use chrono::NaiveDateTime;

/// Local archive name and remote object key of one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupName {
    pub file_name: String,
    pub object_key: String,
}

/// `<db>_<DD>_<MM>_<YYYY>_<HH>:<mm>:<SS>.tar`, stored under `<db>/<YYYY>/<MM>/<DD>/`.
pub fn backup_name(database: &str, taken_at: NaiveDateTime) -> BackupName {
    let file_name = format!("{}_{}.tar", database, taken_at.format("%d_%m_%Y_%H:%M:%S"));
    let object_key = format!("{}/{}/{}", database, taken_at.format("%Y/%m/%d"), file_name);
    BackupName {
        file_name,
        object_key,
    }
}
