use clap::Parser;

use crate::config::DEFAULT_JWT_LIFETIME_SECS;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Listening host
    #[arg(long, env = "USERFS_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Listening port
    #[arg(short, long, env = "USERFS_PORT", default_value_t = 8970)]
    pub port: u16,

    /// Root directory holding every user's tree
    #[arg(long, env = "USERFS_ROOTDIR", default_value = "/var/lib/userfs")]
    pub root: String,

    /// Metadata database url
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:///var/lib/userfs/userfs.db"
    )]
    pub database_url: String,

    /// Secret used to sign bearer tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Lifetime of issued bearer tokens, in seconds
    #[arg(long, env = "JWT_LIFETIME_SECONDS", default_value_t = DEFAULT_JWT_LIFETIME_SECS)]
    pub jwt_lifetime_secs: i64,

    /// bcrypt work factor for new and checked passwords
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,
}
