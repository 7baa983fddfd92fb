//! Certstore shell - interactive insert/check/get loop over the certificate store

use std::io::{self, Write};
use std::path::PathBuf;
use certstore::config::{self, SHELL_DATABASE};
use certstore::logging;
use certstore::shell::Shell;
use certstore::{CertificateStore, SchemaProfile};

fn main() -> anyhow::Result<()> {
    logging::init(false);

    let config = config::load_config(None)?.unwrap_or_default();
    let database: PathBuf = config.resolve_database(None, SHELL_DATABASE);
    let profile = config.resolve_profile(None, SchemaProfile::Dated);

    let mut stdout = io::stdout().lock();
    if database.exists() {
        writeln!(stdout, "Existing database found. Resuming operations...")?;
    } else {
        writeln!(stdout, "No existing database found. Creating a new database...")?;
    }

    config::ensure_db_dir(&database)?;
    let store = CertificateStore::open(&database, profile).map_err(|e| {
        tracing::error!("Failed to initialize database {}: {}", database.display(), e);
        anyhow::anyhow!("Failed to initialize database: {}", e)
    })?;
    writeln!(stdout, "Database setup complete. Waiting for instructions...")?;

    Shell::new(&store).run(io::stdin().lock(), &mut stdout)?;
    store.close()?;
    Ok(())
}
