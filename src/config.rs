use std::time::Duration;

#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

/// what to do when the redirect chain is still going after `max_redirect_hops`
#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum HopLimitPolicy {
    /// hand back the last url we were pointed at and log a warning
    ReturnLast,
    /// treat it as a failed resolution
    Fail,
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum, default_value = "development")]
    pub cargo_env: CargoEnv,

    // port that the app will bind to, jellyfin .strm files point at this
    #[clap(long, env, default_value = "3000")]
    pub port: u16,

    // scanned for <site>/data/final_*_data.json, this is where the scrapers drop their output
    #[clap(long, env, default_value = "sites")]
    pub data_dir: String,

    // explicit list of catalog files, skips the directory scan if set
    #[clap(long, env, value_delimiter = ',')]
    pub data_files: Option<Vec<String>>,

    // language that gets picked first when a season is prefetched
    #[clap(long, env, default_value = "Deutsch")]
    pub preferred_language: String,

    // {site} is the source site of the episode and {id} the redirect id
    #[clap(long, env, default_value = "https://{site}.to/redirect/{id}")]
    pub redirect_url_template: String,

    // used when an id has no episode behind it (only the /test route does this)
    #[clap(long, env, default_value = "serienstream")]
    pub default_source_site: String,

    #[clap(long, env, default_value = "3600")]
    pub cache_ttl_seconds: u64,

    // sleep between prefetched episodes, voe starts blocking if this goes much lower
    #[clap(long, env, default_value = "2000")]
    pub prefetch_delay_ms: u64,

    #[clap(long, env, default_value = "4")]
    pub max_concurrent_prefetches: usize,

    #[clap(long, env, default_value = "10")]
    pub max_redirect_hops: usize,

    #[clap(long, env, value_enum, default_value = "return-last")]
    pub hop_limit_policy: HopLimitPolicy,

    #[clap(long, env, default_value = "10")]
    pub redirect_timeout_secs: u64,

    #[clap(long, env, default_value = "30")]
    pub page_timeout_secs: u64,

    #[clap(long, env, default_value = "30")]
    pub manifest_timeout_secs: u64,

    // anything that isn't a browser gets a cloudflare page back
    #[clap(
        long,
        env,
        default_value = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
    )]
    pub upstream_user_agent: String,

    // the voe cdn refuses manifests without a referer
    #[clap(long, env, default_value = "https://jilliandescribecompany.com/")]
    pub manifest_referer: Option<String>,

    // providers rotate through domains with broken certificates all the time
    #[clap(long, env, default_value = "false")]
    pub insecure_upstream_tls: bool,

    // this should be either * for allowing everything, or a comma seperated list of domains like
    // example.com,something.com
    #[clap(long, env, default_value = "*")]
    pub cors_origin: String,

    #[clap(long, env, default_value = "logs")]
    pub log_dir: String,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,
}

impl AppConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn prefetch_delay(&self) -> Duration {
        Duration::from_millis(self.prefetch_delay_ms)
    }

    /// builds the origin url the redirect chain starts from
    pub fn redirect_url(&self, source_site: &str, redirect_id: &str) -> String {
        self.redirect_url_template
            .replace("{site}", source_site)
            .replace("{id}", redirect_id)
    }
}

impl Default for AppConfig {
    // mirrors the clap defaults, tests build services from this
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 3000,
            data_dir: "sites".to_string(),
            data_files: None,
            preferred_language: "Deutsch".to_string(),
            redirect_url_template: "https://{site}.to/redirect/{id}".to_string(),
            default_source_site: "serienstream".to_string(),
            cache_ttl_seconds: 3600,
            prefetch_delay_ms: 2000,
            max_concurrent_prefetches: 4,
            max_redirect_hops: 10,
            hop_limit_policy: HopLimitPolicy::ReturnLast,
            redirect_timeout_secs: 10,
            page_timeout_secs: 30,
            manifest_timeout_secs: 30,
            upstream_user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            manifest_referer: Some("https://jilliandescribecompany.com/".to_string()),
            insecure_upstream_tls: false,
            cors_origin: "*".to_string(),
            log_dir: "logs".to_string(),
            sentry_dsn: None,
        }
    }
}
