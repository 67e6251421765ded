use lingocore::store::ConnectorOption;
use lingodb_sqlite::SqliteBackend;
use tempfile::TempDir;

/// A migrated sqlite store in a fresh temporary directory; the
/// directory must be kept alive for as long as the store is used.
pub async fn create_sqlite_store() -> anyhow::Result<(TempDir, SqliteBackend)> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}/lingo.db", dir.path().display());
    let backend = SqliteBackend::connect(
        ConnectorOption::from(url)
            .auto_create_db(true)
    )
        .await?
        .migrate()
        .await?;
    Ok((dir, backend))
}
