//! config types.

/// Configuration for running a ProxySrv.
#[derive(Debug)]
pub struct Config {
    /// Worker thread count of the server's tokio runtime.
    ///
    /// Defaults:
    /// - `testing = 2`
    /// - `production = 4 * cpu_count`
    pub worker_thread_count: usize,

    /// The address(es) at which to listen.
    ///
    /// Defaults:
    /// - `testing = "[127.0.0.1:0]"`
    /// - `production = "[0.0.0.0:3000, [::]:3000]"`
    pub listen_address_list: Vec<std::net::SocketAddr>,

    /// Base url of an upstream server speaking the module download
    /// protocol. Without one, only modules already in storage are served.
    ///
    /// Default:
    /// - `None`
    pub upstream_url: Option<String>,

    /// Base url of the proxy that modules with a direct filter rule are
    /// redirected to. Without one, such modules are not found.
    ///
    /// Default:
    /// - `None`
    pub direct_proxy_url: Option<String>,

    /// Path to a filter file. See `modproxy_core::filter::Filter::parse`.
    ///
    /// Default:
    /// - `None` (include everything)
    pub filter_file: Option<std::path::PathBuf>,

    /// Component configuration, as loaded from a config file. Components
    /// missing from it get their defaults.
    ///
    /// Default:
    /// - empty
    pub proxy: modproxy_api::Config,
}

impl Config {
    /// Get a proxy server config suitable for testing.
    pub fn testing() -> Self {
        Self {
            worker_thread_count: 2,
            listen_address_list: vec![
                (std::net::Ipv4Addr::LOCALHOST, 0).into()
            ],
            upstream_url: None,
            direct_proxy_url: None,
            filter_file: None,
            proxy: modproxy_api::Config::default(),
        }
    }

    /// Get a proxy server config suitable for production.
    pub fn production() -> Self {
        Self {
            worker_thread_count: num_cpus::get() * 4,
            listen_address_list: vec![
                (std::net::Ipv4Addr::UNSPECIFIED, 3000).into(),
                (std::net::Ipv6Addr::UNSPECIFIED, 3000).into(),
            ],
            upstream_url: None,
            direct_proxy_url: None,
            filter_file: None,
            proxy: modproxy_api::Config::default(),
        }
    }
}
