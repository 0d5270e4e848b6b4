use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "vanguard-gateway")]
#[command(about = "Rate-limited chat gateway for the Vanguard-IA portal")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Cache TTL in seconds
    #[arg(short, long, default_value_t = 30)]
    pub cache_ttl: u64,

    // Rate limit max requests per window, per provider:user key
    #[arg(long, default_value_t = 20)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Stale bucket sweep interval in seconds
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,
}
