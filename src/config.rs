use std::path::{Path, PathBuf};

use crate::utils::cli::Args;
use crate::utils::password::{MAX_COST, MIN_COST};

/// Default token lifetime: 48 hours.
pub const DEFAULT_JWT_LIFETIME_SECS: i64 = 48 * 60 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory holding one sub-directory per user.
    pub root_dir: PathBuf,
    pub db_url: String,
    pub jwt_secret: String,
    pub jwt_lifetime_secs: i64,
    pub bcrypt_cost: u32,
}

/// Checks the command line against the environment and produces a [`Config`].
///
/// All problems are collected and reported together.
pub async fn validate_config(args: &Args) -> anyhow::Result<Config> {
    let mut validation_errors = Vec::new();

    let root_dir = Path::new(&args.root);
    match tokio::fs::metadata(root_dir).await {
        Ok(meta) if !meta.is_dir() => validation_errors.push(format!(
            "USERFS_ROOTDIR `{}` exists but is not a directory",
            args.root,
        )),
        Ok(_) => {}
        Err(_) => validation_errors.push(format!("USERFS_ROOTDIR `{}` does not exist.", args.root)),
    }

    let db_dir = sqlite_file_path(&args.database_url)
        .and_then(|p| p.parent().map(Path::to_path_buf));
    if let Some(parent) = db_dir {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            validation_errors.push(format!(
                "The directory for the database `{}` does not exist",
                parent.display(),
            ));
        }
    }

    if args.jwt_lifetime_secs <= 0 {
        validation_errors.push(format!(
            "JWT_LIFETIME_SECONDS must be positive, got {}",
            args.jwt_lifetime_secs
        ));
    }

    if !(MIN_COST..=MAX_COST).contains(&args.bcrypt_cost) {
        validation_errors.push(format!(
            "BCRYPT_COST must be within {}..={}, got {}",
            MIN_COST,
            MAX_COST,
            args.bcrypt_cost
        ));
    }

    let jwt_secret = args.jwt_secret.clone().unwrap_or_else(|| {
        tracing::warn!("JWT_SECRET is not set. Use default value: `secret`");
        "secret".into()
    });

    if !validation_errors.is_empty() {
        anyhow::bail!(validation_errors.join("\n"));
    }

    Ok(Config {
        host: args.host.clone(),
        port: args.port,
        root_dir: root_dir.to_path_buf(),
        db_url: args.database_url.clone(),
        jwt_secret,
        jwt_lifetime_secs: args.jwt_lifetime_secs,
        bcrypt_cost: args.bcrypt_cost,
    })
}

/// Extracts the on-disk location from a `sqlite:` url, if it names a file.
fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let rest = rest.split('?').next().unwrap_or(rest);
    if rest.is_empty() || rest == ":memory:" {
        return None;
    }
    Some(PathBuf::from(rest))
}
